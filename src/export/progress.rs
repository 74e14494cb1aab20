use serde::{Serialize, Serializer, ser::SerializeMap};

use crate::export::records::{ExportResult, PLAYLIST_HEADERS};

pub const AUTHENTICATED: u8 = 5;
pub const PLAYLISTS_START: u8 = 15;
pub const PLAYLISTS_END: u8 = 30;
pub const SAVED_TRACKS: u8 = 35;
pub const PLAYLIST_TRACKS_START: u8 = 50;
pub const PLAYLIST_TRACKS_END: u8 = 85;
pub const FINALIZING: u8 = 95;
pub const COMPLETED: u8 = 100;

/// One milestone of a streaming export.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    Step { status: String, progress: u8 },
    Completed(ExportResult),
    /// Terminal; progress is reset to 0.
    Failed { error: String },
}

impl ProgressEvent {
    pub fn progress(&self) -> u8 {
        match self {
            ProgressEvent::Step { progress, .. } => *progress,
            ProgressEvent::Completed(_) => COMPLETED,
            ProgressEvent::Failed { .. } => 0,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ProgressEvent::Step { .. })
    }
}

/// Wire shape sent to the browser.
///
/// The completion event carries both tables as rows of string cells:
/// `playlists` without header (see `playlists_headers`), `tracks` with the
/// header as first row.
impl Serialize for ProgressEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ProgressEvent::Step { status, progress } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("status", status)?;
                map.serialize_entry("progress", progress)?;
                map.end()
            }
            ProgressEvent::Completed(result) => {
                let playlists: Vec<Vec<String>> =
                    result.playlists.iter().map(|p| p.to_cells()).collect();

                let mut map = serializer.serialize_map(Some(5))?;
                map.serialize_entry("status", "Completed")?;
                map.serialize_entry("progress", &COMPLETED)?;
                map.serialize_entry("playlists_headers", &PLAYLIST_HEADERS)?;
                map.serialize_entry("playlists", &playlists)?;
                map.serialize_entry("tracks", &result.track_table())?;
                map.end()
            }
            ProgressEvent::Failed { error } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("error", error)?;
                map.serialize_entry("progress", &0u8)?;
                map.end()
            }
        }
    }
}

/// Receiver of progress events.
pub trait ProgressSink {
    fn emit(&mut self, event: ProgressEvent);
}

impl<F: FnMut(ProgressEvent)> ProgressSink for F {
    fn emit(&mut self, event: ProgressEvent) {
        self(event)
    }
}

/// Turns exporter milestones into events with fixed percentage bands.
///
/// Without a sink every call is a no-op, which is how the synchronous export
/// runs. Step percentages never go below the last emitted one.
pub struct ProgressReporter<'a> {
    sink: Option<&'a mut dyn ProgressSink>,
    last: u8,
}

impl<'a> ProgressReporter<'a> {
    pub fn new(sink: &'a mut dyn ProgressSink) -> Self {
        Self {
            sink: Some(sink),
            last: 0,
        }
    }

    pub fn silent() -> Self {
        Self { sink: None, last: 0 }
    }

    pub fn authenticated(&mut self, display_name: &str, user_id: &str) {
        self.step(
            format!("Authenticated as {display_name} ({user_id})"),
            AUTHENTICATED,
        );
    }

    pub fn fetching_playlists(&mut self) {
        self.step("Downloading playlists...".to_string(), PLAYLISTS_START);
    }

    /// `index` is zero-based.
    pub fn playlist_collected(&mut self, index: usize, total: usize) {
        self.step(
            format!("Downloading playlist {}/{}...", index + 1, total),
            interpolate(PLAYLISTS_START, PLAYLISTS_END, index + 1, total),
        );
    }

    pub fn fetching_saved_tracks(&mut self) {
        self.step("Downloading liked songs...".to_string(), SAVED_TRACKS);
    }

    pub fn fetching_playlist_tracks(&mut self) {
        self.step(
            "Downloading tracks per playlist...".to_string(),
            PLAYLIST_TRACKS_START,
        );
    }

    pub fn playlist_processed(&mut self, name: &str, processed: usize, total: usize) {
        self.step(
            format!("Processing: {name} ({processed}/{total})"),
            interpolate(PLAYLIST_TRACKS_START, PLAYLIST_TRACKS_END, processed, total),
        );
    }

    pub fn adding_saved_tracks(&mut self) {
        self.step(
            "Adding liked songs...".to_string(),
            PLAYLIST_TRACKS_END,
        );
    }

    pub fn finalizing(&mut self) {
        self.step("Finalizing...".to_string(), FINALIZING);
    }

    pub fn completed(&mut self, result: ExportResult) {
        self.last = COMPLETED;
        self.emit(ProgressEvent::Completed(result));
    }

    pub fn failed(&mut self, error: String) {
        self.last = 0;
        self.emit(ProgressEvent::Failed { error });
    }

    fn step(&mut self, status: String, progress: u8) {
        if self.sink.is_none() {
            return;
        }
        let progress = progress.max(self.last);
        self.last = progress;
        self.emit(ProgressEvent::Step { status, progress });
    }

    fn emit(&mut self, event: ProgressEvent) {
        if let Some(sink) = self.sink.as_mut() {
            sink.emit(event);
        }
    }
}

fn interpolate(start: u8, end: u8, done: usize, total: usize) -> u8 {
    let span = (end - start) as usize;
    let done = done.min(total.max(1));
    start + (span * done / total.max(1)) as u8
}
