//! # Export Module
//!
//! The blocking core of plexport: walks the user's playlists, saved tracks
//! and every playlist's items through the Spotify listing endpoints and
//! flattens them into two tables.
//!
//! ## Pipeline
//!
//! ```text
//! Exporter ──► Paginator (per collection) ──► SpotifyApi
//!    │              │
//!    │              └─ rate-limit backoff, fixed page delay
//!    ▼
//! records (PlaylistRecord / TrackRow) ──► ExportResult
//!    │
//!    └─► ProgressReporter ──► ProgressSink (optional)
//! ```
//!
//! ## Submodules
//!
//! - [`paginator`] - Lazy offset pagination with backoff
//! - [`fields`] - Degrade-to-`None` access into nested JSON
//! - [`records`] - Typed rows and fixed table schemas
//! - [`exporter`] - The export state machine
//! - [`progress`] - Progress events and percentage bands
//! - [`pacing`] - Page size, delays and the injectable sleeper
//!
//! Everything here blocks the calling thread. Async callers run it on
//! `tokio::task::spawn_blocking`.

mod error;
pub mod exporter;
pub mod fields;
pub mod pacing;
pub mod paginator;
pub mod progress;
pub mod records;

pub use error::ExportError;
pub use exporter::{Collection, Exporter, resolve_user};
pub use pacing::{Pacing, Sleeper, ThreadSleeper};
pub use paginator::Paginator;
pub use progress::{ProgressEvent, ProgressReporter, ProgressSink};
pub use records::{ExportResult, PlaylistRecord, TrackRow};
