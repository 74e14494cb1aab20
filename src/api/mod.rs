//! # API Module
//!
//! HTTP handlers for plexport's two servers.
//!
//! ## Web Service (`plexport serve`)
//!
//! - [`login`] - `GET /api/auth/login`, returns the Spotify authorization URL
//!   and stores the CSRF `state` in the session
//! - [`auth_callback`] - `GET /api/auth/callback`, exchanges the code with the
//!   client secret and stores the token in the session
//! - [`callback_redirect`] - `GET /callback`, forwards to `/api/auth/callback`
//! - [`logout`] - `POST /api/auth/logout`
//! - [`status`] - `GET /api/auth/status`
//! - [`export_progress`] - `GET /api/export/progress`, Server-Sent Events
//! - [`export`] - `GET /api/export`, one-shot JSON export
//! - [`serve_frontend`] - static files for everything else
//!
//! ## CLI Callback Server (`plexport auth|export`)
//!
//! - [`callback`] - `GET /callback`, completes the PKCE flow
//!
//! Both servers expose [`health`] on `GET /health`.
//!
//! ## Sessions
//!
//! Tokens are kept per browser in an in-memory [`SessionStore`] keyed by the
//! `plexport_session` cookie. Nothing is written to disk; restarting the
//! service logs everybody out.

mod auth;
mod callback;
mod error;
mod export;
mod frontend;
mod health;
pub mod session;

use std::path::PathBuf;

pub use auth::{auth_callback, callback_redirect, login, logout, status};
pub use callback::callback;
pub use error::WebError;
pub use export::{export, export_progress};
pub use frontend::{resolve_path, serve_frontend};
pub use health::health;
pub use session::SessionStore;

/// Shared state of the web service.
#[derive(Debug, Clone)]
pub struct AppState {
    pub sessions: SessionStore,
    pub frontend_dir: PathBuf,
}

impl AppState {
    pub fn new(frontend_dir: PathBuf) -> Self {
        Self {
            sessions: SessionStore::new(),
            frontend_dir,
        }
    }
}
