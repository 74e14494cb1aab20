//! Writes export results to disk.
//!
//! Files land in `<base>/<user_id>_downloads/`:
//! - `playlists_<user_id>.csv|json`
//! - `tracks_<user_id>.csv|json`
//!
//! CSV files hold the tabular rendering (absent values as empty cells), JSON
//! files the typed records (absent values as `null`).

mod csv;
mod json;

use std::{
    fmt,
    path::{Path, PathBuf},
};

use clap::ValueEnum;
use thiserror::Error;

use crate::{export::ExportResult, utils};

pub use self::csv::render_table;
pub use self::json::render_records;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("cannot write export file: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot encode CSV: {0}")]
    Csv(#[from] ::csv::Error),

    #[error("cannot encode JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Directory an export for `user_id` is written to.
pub fn export_dir(base: &Path, user_id: &str) -> PathBuf {
    base.join(format!("{}_downloads", utils::file_safe(user_id)))
}

/// File names for the playlist and track tables.
pub fn file_names(user_id: &str, format: ExportFormat) -> (String, String) {
    let user = utils::file_safe(user_id);
    let ext = format.extension();
    (
        format!("playlists_{user}.{ext}"),
        format!("tracks_{user}.{ext}"),
    )
}

/// Writes both tables and returns the written paths (playlists first).
pub async fn write_export(
    result: &ExportResult,
    base: &Path,
    format: ExportFormat,
) -> Result<Vec<PathBuf>, OutputError> {
    let dir = export_dir(base, &result.user.id);
    async_fs::create_dir_all(&dir).await?;

    let (playlists, tracks) = match format {
        ExportFormat::Csv => (
            render_table(&result.playlist_table())?,
            render_table(&result.track_table())?,
        ),
        ExportFormat::Json => (
            render_records(&result.playlists)?,
            render_records(&result.tracks)?,
        ),
    };

    let (playlists_name, tracks_name) = file_names(&result.user.id, format);
    let playlists_path = dir.join(playlists_name);
    let tracks_path = dir.join(tracks_name);

    async_fs::write(&playlists_path, playlists).await?;
    async_fs::write(&tracks_path, tracks).await?;

    Ok(vec![playlists_path, tracks_path])
}
