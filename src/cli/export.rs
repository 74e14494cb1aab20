use std::{path::PathBuf, sync::Arc, time::Duration};

use indicatif::{ProgressBar, ProgressStyle};
use tabled::Table;
use tokio::sync::Mutex;

use crate::{
    config, error,
    export::{ExportResult, Exporter, ProgressEvent, ThreadSleeper, progress::COMPLETED},
    info,
    output::{self, ExportFormat},
    spotify::{self, SpotifyClient},
    success,
    types::{AccessToken, PlaylistTableRow},
};

pub async fn export(format: ExportFormat, out_dir: Option<PathBuf>, token: Option<String>) {
    let token = match access_token(token).await {
        Ok(token) => token,
        Err(e) => error!("Authentication failed. Err: {}", e),
    };

    let result = match run_export(token).await {
        Ok(result) => result,
        Err(e) => error!("Export failed. Err: {}", e),
    };

    let base = out_dir.unwrap_or_else(|| PathBuf::from("."));
    let paths = match output::write_export(&result, &base, format).await {
        Ok(paths) => paths,
        Err(e) => error!("Cannot write export files. Err: {}", e),
    };

    println!("{}", Table::new(summary_rows(&result)));
    for path in paths {
        info!("Wrote {}", path.display());
    }
    success!(
        "Exported {} playlists and {} tracks for {}",
        result.playlists.len(),
        result.tracks.len(),
        result.user.display_name
    );
}

/// Token from `--token`, then `SPOTIFY_ACCESS_TOKEN`, then the browser login.
async fn access_token(flag: Option<String>) -> Result<AccessToken, String> {
    if let Some(token) = flag.or_else(config::spotify_access_token) {
        return Ok(AccessToken::new(token));
    }

    info!("No access token given, starting browser login...");
    let shared_state = Arc::new(Mutex::new(None));
    let token = spotify::auth::auth(shared_state).await?;
    Ok(token.access())
}

async fn run_export(token: AccessToken) -> Result<ExportResult, String> {
    let pb = ProgressBar::new(100);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_style(
        ProgressStyle::with_template("{spinner:.blue} [{bar:30.blue}] {pos:>3}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ")
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
    );

    let bar = pb.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        let api = SpotifyClient::new(config::spotify_apiurl(), token);
        let exporter = Exporter::new(&api, &ThreadSleeper, config::pacing());

        let mut outcome = None;
        let mut sink = |event: ProgressEvent| match event {
            ProgressEvent::Step { status, progress } => {
                bar.set_position(u64::from(progress));
                bar.set_message(status);
            }
            ProgressEvent::Completed(result) => {
                bar.set_position(u64::from(COMPLETED));
                outcome = Some(Ok(result));
            }
            ProgressEvent::Failed { error } => outcome = Some(Err(error)),
        };
        exporter.run_streaming(&mut sink);

        outcome.unwrap_or_else(|| Err("export ended without a result".to_string()))
    })
    .await
    .map_err(|e| e.to_string());

    pb.finish_and_clear();
    outcome?
}

fn summary_rows(result: &ExportResult) -> Vec<PlaylistTableRow> {
    result
        .playlists
        .iter()
        .map(|playlist| PlaylistTableRow {
            name: playlist.name.clone(),
            owner: playlist
                .owner_name
                .clone()
                .or_else(|| playlist.owner_id.clone())
                .unwrap_or_default(),
            reported: playlist
                .tracks_total
                .map(|total| total.to_string())
                .unwrap_or_else(|| "-".to_string()),
            exported: result.exported_count(&playlist.playlist_id),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{export::PlaylistRecord, types::UserIdentity};

    #[test]
    fn test_summary_rows() {
        let result = ExportResult {
            user: UserIdentity {
                id: "alice".to_string(),
                display_name: "Alice".to_string(),
            },
            playlists: vec![PlaylistRecord::saved_tracks("alice", 3)],
            tracks: Vec::new(),
        };

        let rows = summary_rows(&result);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "Liked Songs");
        assert_eq!(rows[0].owner, "alice");
        assert_eq!(rows[0].reported, "3");
        assert_eq!(rows[0].exported, 0);
    }
}
