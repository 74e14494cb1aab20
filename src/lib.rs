//! plexport Library
//!
//! This library exports a Spotify user's playlists and saved ("liked") tracks
//! into two flat tables. It includes the blocking export core, the Spotify
//! client and OAuth flows, file output, and the CLI and web service shells
//! built on top of them.
//!
//! # Modules
//!
//! - `api` - HTTP handlers for the web service and the CLI callback server
//! - `cli` - Command-line interface implementations
//! - `config` - Configuration management and environment variables
//! - `export` - Paginator, record mapping, export orchestration and progress
//! - `output` - CSV and JSON export files
//! - `server` - Axum routers for the callback server and the web service
//! - `spotify` - Spotify Web API client and OAuth flows
//! - `types` - Tokens, user identity and table rows
//! - `utils` - PKCE helpers and file name sanitizing
//!
//! # Example
//!
//! ```
//! use plexport::{config, export::{Exporter, ThreadSleeper}, spotify::SpotifyClient, types::AccessToken};
//!
//! let api = SpotifyClient::new(config::spotify_apiurl(), AccessToken::new("BQC..."));
//! let exporter = Exporter::new(&api, &ThreadSleeper, config::pacing());
//! let result = exporter.run()?;
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod export;
pub mod output;
pub mod server;
pub mod spotify;
pub mod types;
pub mod utils;

/// Prints an informational message with a blue bullet point.
///
/// # Example
///
/// ```
/// info!("Starting authentication process...");
/// info!("Found {} playlists", count);
/// ```
#[macro_export]
macro_rules! info {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "o".blue().bold(), std::format_args!($($arg)*));
  })
}

/// Prints a success message with a green checkmark.
///
/// # Example
///
/// ```
/// success!("Authentication completed successfully");
/// success!("Exported {} tracks", count);
/// ```
#[macro_export]
macro_rules! success {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "✓".green().bold(), std::format_args!($($arg)*));
  })
}

/// Prints an error message with a red exclamation mark and exits the program.
///
/// Only for fatal errors in the binary shells. The program terminates with
/// exit code 1 right after printing.
///
/// # Example
///
/// ```
/// error!("Failed to load configuration");
/// // Program exits here - code after this will not execute
/// ```
#[macro_export]
macro_rules! error {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".red().bold(), std::format_args!($($arg)*));
    std::process::exit(1);
  })
}

/// Prints a warning message with a yellow exclamation mark.
///
/// Used for recoverable issues, such as skipped malformed entries, that users
/// should notice.
///
/// # Example
///
/// ```
/// warning!("Skipping playlist entry without id");
/// ```
#[macro_export]
macro_rules! warning {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".yellow().bold(), std::format_args!($($arg)*));
  })
}
