//! Configuration management for plexport.
//!
//! Values come from environment variables, optionally loaded from `.env`
//! files. Lookup order:
//! 1. Environment variables (highest priority)
//! 2. `.env` in the current working directory
//! 3. `.env` in the local data directory (`<data_local_dir>/plexport/.env`)
//! 4. Application defaults (where applicable)
//!
//! Only the Spotify client id (and the client secret for the web flow) have
//! no default.

use std::{env, path::PathBuf};

use crate::export::pacing::{DEFAULT_MAX_RATE_LIMIT_RETRIES, DEFAULT_PAGE_SIZE, Pacing};

pub const DEFAULT_SERVER_ADDRESS: &str = "127.0.0.1:8000";
pub const DEFAULT_API_URL: &str = "https://api.spotify.com/v1";
pub const DEFAULT_AUTH_URL: &str = "https://accounts.spotify.com/authorize";
pub const DEFAULT_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
pub const DEFAULT_REDIRECT_URI: &str = "http://127.0.0.1:8000/callback";
pub const DEFAULT_SCOPE: &str =
    "playlist-read-private playlist-read-collaborative user-library-read";
pub const DEFAULT_FRONTEND_DIR: &str = "frontend";

/// Loads `.env` files into the process environment.
///
/// Creates `<data_local_dir>/plexport/` if needed so users know where to put
/// their `.env`. Missing files are not an error; variables already set in
/// the environment are never overwritten.
///
/// # Directory Structure
///
/// - Linux: `~/.local/share/plexport/.env`
/// - macOS: `~/Library/Application Support/plexport/.env`
/// - Windows: `%LOCALAPPDATA%/plexport/.env`
///
/// # Errors
///
/// Returns an error if the data directory cannot be created.
pub async fn load_env() -> Result<(), String> {
    let path = data_dir().join(".env");
    if let Some(parent) = path.parent() {
        async_fs::create_dir_all(parent)
            .await
            .map_err(|e| e.to_string())?;
    }

    dotenv::dotenv().ok();
    dotenv::from_path(&path).ok();
    Ok(())
}

/// `<data_local_dir>/plexport`, falling back to the working directory.
pub fn data_dir() -> PathBuf {
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("plexport");
    path
}

/// Address the local server binds to (`SERVER_ADDRESS`).
pub fn server_addr() -> String {
    var_or("SERVER_ADDRESS", DEFAULT_SERVER_ADDRESS)
}

/// Spotify application client id (`SPOTIFY_API_AUTH_CLIENT_ID`).
pub fn spotify_client_id() -> Option<String> {
    var("SPOTIFY_API_AUTH_CLIENT_ID")
}

/// Spotify application client secret (`SPOTIFY_API_AUTH_CLIENT_SECRET`).
///
/// Only the web flow needs it; the CLI uses PKCE. Keep it out of logs.
pub fn spotify_client_secret() -> Option<String> {
    var("SPOTIFY_API_AUTH_CLIENT_SECRET")
}

/// OAuth redirect URI (`SPOTIFY_API_REDIRECT_URI`).
///
/// Must match the one registered with the Spotify application. The default
/// `/callback` route works for both the CLI and the web service.
pub fn spotify_redirect_uri() -> String {
    var_or("SPOTIFY_API_REDIRECT_URI", DEFAULT_REDIRECT_URI)
}

/// Space separated OAuth scopes (`SPOTIFY_API_AUTH_SCOPE`).
pub fn spotify_scope() -> String {
    var_or("SPOTIFY_API_AUTH_SCOPE", DEFAULT_SCOPE)
}

/// Authorization endpoint (`SPOTIFY_API_AUTH_URL`).
pub fn spotify_apiauth_url() -> String {
    var_or("SPOTIFY_API_AUTH_URL", DEFAULT_AUTH_URL)
}

/// Web API base URL (`SPOTIFY_API_URL`).
pub fn spotify_apiurl() -> String {
    var_or("SPOTIFY_API_URL", DEFAULT_API_URL)
}

/// Token endpoint (`SPOTIFY_API_TOKEN_URL`).
pub fn spotify_apitoken_url() -> String {
    var_or("SPOTIFY_API_TOKEN_URL", DEFAULT_TOKEN_URL)
}

/// A ready-made access token (`SPOTIFY_ACCESS_TOKEN`) that skips the browser flow.
pub fn spotify_access_token() -> Option<String> {
    var("SPOTIFY_ACCESS_TOKEN")
}

/// Directory with the static web frontend (`FRONTEND_DIR`).
pub fn frontend_dir() -> PathBuf {
    PathBuf::from(var_or("FRONTEND_DIR", DEFAULT_FRONTEND_DIR))
}

/// Export pacing, with `EXPORT_PAGE_SIZE` and `EXPORT_MAX_RATE_LIMIT_RETRIES`
/// applied on top of the defaults.
pub fn pacing() -> Pacing {
    pacing_from(
        var("EXPORT_PAGE_SIZE").as_deref(),
        var("EXPORT_MAX_RATE_LIMIT_RETRIES").as_deref(),
    )
}

/// Builds pacing from raw setting values.
///
/// Page sizes are clamped to Spotify's 1..=50 range. A retry limit of `0`
/// disables the cap. Unparsable values fall back to the defaults.
pub fn pacing_from(page_size: Option<&str>, max_retries: Option<&str>) -> Pacing {
    let page_size = page_size
        .and_then(|v| v.trim().parse::<u32>().ok())
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, DEFAULT_PAGE_SIZE);

    let max_rate_limit_retries = match max_retries.and_then(|v| v.trim().parse::<u32>().ok()) {
        Some(0) => None,
        Some(max) => Some(max),
        None => Some(DEFAULT_MAX_RATE_LIMIT_RETRIES),
    };

    Pacing {
        page_size,
        max_rate_limit_retries,
        ..Pacing::default()
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn var_or(key: &str, default: &str) -> String {
    var(key).unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pacing_defaults() {
        assert_eq!(pacing_from(None, None), Pacing::default());
        assert_eq!(pacing_from(Some("abc"), Some("")), Pacing::default());
    }

    #[test]
    fn test_pacing_clamps_page_size() {
        assert_eq!(pacing_from(Some("200"), None).page_size, 50);
        assert_eq!(pacing_from(Some("0"), None).page_size, 1);
        assert_eq!(pacing_from(Some(" 20 "), None).page_size, 20);
    }

    #[test]
    fn test_pacing_retry_limit() {
        assert_eq!(pacing_from(None, Some("0")).max_rate_limit_retries, None);
        assert_eq!(pacing_from(None, Some("3")).max_rate_limit_retries, Some(3));
    }
}
