//! # CLI Module
//!
//! User-facing commands of the `plexport` binary. Each command turns failures
//! into a printed error and a non-zero exit; the library modules below only
//! return `Result`s.
//!
//! ## Commands
//!
//! - [`auth`] - Browser login (OAuth 2.0 PKCE) and a check of who the token
//!   belongs to
//! - [`export`] - Exports playlists and saved tracks to CSV or JSON files,
//!   with a progress bar and a summary table
//! - [`serve`] - Runs the web service
//!
//! ## Usage
//!
//! ```bash
//! plexport auth
//! plexport export --format csv --out-dir ./exports
//! plexport export --token "$SPOTIFY_ACCESS_TOKEN" --format json
//! plexport serve
//! ```

mod auth;
mod export;
mod serve;

pub use auth::auth;
pub use export::export;
pub use serve::serve;
