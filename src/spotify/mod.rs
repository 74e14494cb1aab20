//! # Spotify Integration Module
//!
//! This module is the boundary between plexport and the Spotify Web API. It
//! covers the OAuth 2.0 flows used to obtain an access token and the read-only
//! listing calls the exporter pages through.
//!
//! ## Architecture
//!
//! ```text
//! CLI / Web service
//!          ↓
//! Exporter (blocking, src/export)
//!          ↓
//! SpotifyApi trait  ←  SpotifyClient (reqwest::blocking)
//!          ↓
//! Spotify Web API
//! ```
//!
//! ## Submodules
//!
//! - [`auth`] - Authorization URL, code exchange (client secret or PKCE),
//!   token refresh and the interactive browser flow for the CLI.
//! - [`client`] - Blocking [`SpotifyClient`] implementing [`SpotifyApi`].
//! - [`error`] - [`ApiError`] and [`AuthError`].
//!
//! ## Rate Limiting
//!
//! The client never retries on its own. A `429 Too Many Requests` surfaces as
//! [`ApiError::RateLimited`] carrying the `Retry-After` value, and the
//! paginator decides how long to back off.
//!
//! ## Covered Endpoints
//!
//! - `GET /me` - Current user identity
//! - `GET /me/playlists` - Playlists owned or followed by the user
//! - `GET /me/tracks` - Saved ("liked") tracks
//! - `GET /playlists/{id}/tracks` - Items of one playlist
//! - `POST /api/token` - Token exchange and refresh

pub mod auth;
pub mod client;
mod error;

pub use client::SpotifyClient;
pub use error::{ApiError, AuthError};

use serde_json::Value;

/// The Spotify calls the exporter depends on.
///
/// Listing calls return the raw page object; items are read from its `items`
/// field and continuation from its `next` field.
pub trait SpotifyApi {
    /// `GET /me`, the object carries at least `id` and `display_name`.
    fn current_user(&self) -> Result<Value, ApiError>;

    fn current_user_playlists(&self, limit: u32, offset: u32) -> Result<Value, ApiError>;

    fn current_user_saved_tracks(&self, limit: u32, offset: u32) -> Result<Value, ApiError>;

    fn playlist_items(&self, playlist_id: &str, limit: u32, offset: u32)
    -> Result<Value, ApiError>;
}
