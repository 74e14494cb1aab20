use std::{net::SocketAddr, str::FromStr, sync::Arc};

use axum::{
    Extension, Router,
    routing::{get, post},
};
use tokio::sync::Mutex;

use crate::{
    api::{self, AppState},
    config, info,
    types::PkceToken,
};

/// Temporary server the CLI runs while waiting for the PKCE redirect.
pub async fn start_callback_server(state: Arc<Mutex<Option<PkceToken>>>) -> Result<(), String> {
    let app = Router::new()
        .route("/health", get(api::health))
        .route("/callback", get(api::callback).layer(Extension(state)));

    serve(app).await
}

/// Runs the web service until the process is stopped.
pub async fn start_web_server() -> Result<(), String> {
    let state = AppState::new(config::frontend_dir());
    info!(
        "Serving plexport on http://{} (frontend: {})",
        config::server_addr(),
        state.frontend_dir.display()
    );

    serve(web_router(state)).await
}

pub fn web_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(api::health))
        .route("/callback", get(api::callback_redirect))
        .route("/api/auth/login", get(api::login))
        .route("/api/auth/callback", get(api::auth_callback))
        .route("/api/auth/logout", post(api::logout))
        .route("/api/auth/status", get(api::status))
        .route("/api/export", get(api::export))
        .route("/api/export/progress", get(api::export_progress))
        .fallback(api::serve_frontend)
        .with_state(state)
}

async fn serve(app: Router) -> Result<(), String> {
    let addr = SocketAddr::from_str(&config::server_addr())
        .map_err(|e| format!("Failed to parse server address: {}", e))?;

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| format!("Failed to bind {}: {}", addr, e))?;

    axum::serve(listener, app).await.map_err(|e| e.to_string())
}
