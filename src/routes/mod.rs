//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! Two websocket endpoints, one for viewer apps and one for hardware links,
//! plus a liveness probe. Every request is traced by `tower-http`.

pub mod ws;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/ws/app", get(ws::handle_app_ws))
        .route("/ws/hardware", get(ws::handle_hardware_ws))
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
