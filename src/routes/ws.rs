//! WebSocket gateway: app and hardware connections.
//!
//! DESIGN
//! ======
//! On upgrade, the connection is registered in its principal's session with
//! a bounded outbound queue, then enters a `select!` loop:
//! - Incoming text frames → decode `ProtocolMessage` → dispatch
//! - Queued messages from the router → forward to the socket
//!
//! Direct replies go straight to the socket; everything fanned out by the
//! router arrives through the queue.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → validate query → register connection
//! 2. App frames → `process_inbound_text` → replies to sender
//! 3. Close → unregister (the session goes with its last connection)

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::message::{Command, ErrorCode, ProtocolMessage, Response as Status};
use crate::profiles::User;
use crate::services::sharing::{self, Viewer};
use crate::session::{AppConnection, Connection, HardwareConnection};
use crate::state::AppState;

/// Id used for gateway replies to frames that could not be decoded.
const UNPARSED_MESSAGE_ID: u16 = 0;

type Rejection = (StatusCode, &'static str);

// =============================================================================
// UPGRADE
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct AppParams {
    pub user: String,
    pub share_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HardwareParams {
    pub user: String,
    pub dash_id: i32,
    pub device_id: i32,
}

pub async fn handle_app_ws(
    State(state): State<AppState>,
    Query(params): Query<AppParams>,
    ws: WebSocketUpgrade,
) -> Response {
    let user = match authorize_app(&state, &params) {
        Ok(user) => user,
        Err(rejection) => return rejection.into_response(),
    };
    ws.on_upgrade(move |socket| run_app_ws(socket, state, user, params.share_token))
}

pub async fn handle_hardware_ws(
    State(state): State<AppState>,
    Query(params): Query<HardwareParams>,
    ws: WebSocketUpgrade,
) -> Response {
    let user = match authorize_hardware(&state, &params) {
        Ok(user) => user,
        Err(rejection) => return rejection.into_response(),
    };
    ws.on_upgrade(move |socket| run_hardware_ws(socket, state, user, params.dash_id, params.device_id))
}

/// The principal must exist and a share token must belong to one of its dashboards.
fn authorize_app(state: &AppState, params: &AppParams) -> Result<Arc<User>, Rejection> {
    let user = state
        .profiles
        .user(&params.user)
        .ok_or((StatusCode::UNAUTHORIZED, "unknown user"))?;
    if let Some(token) = params.share_token.as_deref() {
        if user.profile.dash_by_share_token(token).is_none() {
            return Err((StatusCode::FORBIDDEN, "invalid share token"));
        }
    }
    Ok(user)
}

fn authorize_hardware(state: &AppState, params: &HardwareParams) -> Result<Arc<User>, Rejection> {
    let user = state
        .profiles
        .user(&params.user)
        .ok_or((StatusCode::UNAUTHORIZED, "unknown user"))?;
    let dash = user
        .profile
        .dash_by_id(params.dash_id)
        .ok_or((StatusCode::NOT_FOUND, "unknown dashboard"))?;
    if !dash.devices.iter().any(|d| d.id == params.device_id) {
        return Err((StatusCode::NOT_FOUND, "unknown device"));
    }
    Ok(user)
}

// =============================================================================
// CONNECTIONS
// =============================================================================

async fn run_app_ws(mut socket: WebSocket, state: AppState, user: Arc<User>, share_token: Option<String>) {
    let (tx, mut rx) = mpsc::channel::<ProtocolMessage>(state.queue_depth);
    let conn = Connection::new(tx);
    let conn_id = conn.id;
    state
        .sessions
        .register_app(&user.email, AppConnection { conn, share_token: share_token.clone() });

    let viewer = Viewer { user, share_token, conn_id };
    info!(%conn_id, user = %viewer.user.email, shared = viewer.share_token.is_some(), "ws: app connected");

    'conn: loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(Ok(msg)) = msg else { break };
                match msg {
                    Message::Text(text) => {
                        for reply in process_inbound_text(&state, &viewer, &text) {
                            if send_message(&mut socket, &reply).await.is_err() {
                                break 'conn;
                            }
                        }
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            Some(out) = rx.recv() => {
                if send_message(&mut socket, &out).await.is_err() {
                    break;
                }
            }
        }
    }

    state.sessions.unregister(&viewer.user.email, conn_id);
    info!(%conn_id, "ws: app disconnected");
}

async fn run_hardware_ws(mut socket: WebSocket, state: AppState, user: Arc<User>, dash_id: i32, device_id: i32) {
    let (tx, mut rx) = mpsc::channel::<ProtocolMessage>(state.queue_depth);
    let conn = Connection::new(tx);
    let conn_id = conn.id;
    state
        .sessions
        .register_hardware(&user.email, HardwareConnection { conn, dash_id, device_id });
    info!(%conn_id, user = %user.email, dash_id, device_id, "ws: hardware connected");

    loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(Ok(msg)) = msg else { break };
                match msg {
                    // Device-originated writes are handled elsewhere.
                    Message::Text(text) => debug!(%conn_id, len = text.len(), "ws: dropping hardware frame"),
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            Some(out) = rx.recv() => {
                if send_message(&mut socket, &out).await.is_err() {
                    break;
                }
            }
        }
    }

    state.sessions.unregister(&user.email, conn_id);
    info!(%conn_id, "ws: hardware disconnected");
}

// =============================================================================
// DISPATCH
// =============================================================================

/// Decode and route one inbound app frame; returns the replies for the sender.
///
/// Kept apart from the socket so tests can drive the full path without a
/// websocket.
fn process_inbound_text(state: &AppState, viewer: &Viewer, text: &str) -> Vec<ProtocolMessage> {
    let msg: ProtocolMessage = match serde_json::from_str(text) {
        Ok(m) => m,
        Err(e) => {
            warn!(conn_id = %viewer.conn_id, error = %e, "ws: invalid inbound frame");
            return vec![ProtocolMessage::response(UNPARSED_MESSAGE_ID, Status::IllegalCommand)];
        }
    };

    match msg.command {
        // Owner apps (no share token) use this path too. The owner-only
        // command handler, which skips the sharing gate, is not implemented,
        // so owners get `NotAllowed` on their own unshared dashboards.
        Command::Hardware => match sharing::handle_hardware(state, viewer, &msg) {
            Ok(reply) => reply.into_iter().collect(),
            Err(e) => {
                warn!(conn_id = %viewer.conn_id, id = msg.id, code = e.error_code(), error = %e, "ws: hardware command failed");
                vec![ProtocolMessage::error_from(msg.id, &e)]
            }
        },
        Command::Ping => vec![ProtocolMessage::ok(msg.id)],
        Command::Response | Command::AppSync => {
            debug!(conn_id = %viewer.conn_id, id = msg.id, command = ?msg.command, "ws: unsupported app command");
            vec![ProtocolMessage::response(msg.id, Status::IllegalCommand)]
        }
    }
}

async fn send_message(socket: &mut WebSocket, msg: &ProtocolMessage) -> Result<(), ()> {
    let json = match serde_json::to_string(msg) {
        Ok(j) => j,
        Err(e) => {
            warn!(error = %e, "ws: failed to serialize message");
            return Err(());
        }
    };
    match msg.response_code() {
        Some(Status::Ok) | None => {}
        Some(status) => debug!(id = msg.id, ?status, "ws: send error response"),
    }
    socket.send(Message::Text(json.into())).await.map_err(|_| ())
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
