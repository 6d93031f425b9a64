mod codec;
mod config;
mod dashboard;
mod message;
mod profiles;
mod routes;
mod services;
mod session;
mod state;
mod target;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = config::HubConfig::from_env().expect("invalid configuration");

    let profiles = profiles::load_profiles(&config.profiles_path).expect("failed to load profiles");
    tracing::info!(path = %config.profiles_path.display(), users = profiles.len(), "profiles loaded");
    if profiles.is_empty() {
        tracing::warn!(path = %config.profiles_path.display(), "profile store has no users");
    }

    let state = state::AppState::new(profiles, config.queue_depth);

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .expect("failed to bind");

    tracing::info!(port = config.port, "sharehub listening");
    axum::serve(listener, app).await.expect("server failed");
}
