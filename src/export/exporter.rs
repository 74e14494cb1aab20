use serde_json::Value;

use crate::{
    export::{
        ExportError,
        fields::is_track_item,
        pacing::{Pacing, Sleeper},
        paginator::Paginator,
        progress::{ProgressReporter, ProgressSink},
        records::{ExportResult, PlaylistRecord, TrackRow},
    },
    spotify::{ApiError, SpotifyApi},
    types::UserIdentity,
    warning,
};

/// A paginated collection the exporter walks.
///
/// The playlist id is part of the value and handed to the API on every page
/// request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection<'a> {
    Playlists,
    SavedTracks,
    PlaylistItems(&'a str),
}

impl Collection<'_> {
    pub fn fetch(
        &self,
        api: &dyn SpotifyApi,
        limit: u32,
        offset: u32,
    ) -> Result<Value, ApiError> {
        match self {
            Collection::Playlists => api.current_user_playlists(limit, offset),
            Collection::SavedTracks => api.current_user_saved_tracks(limit, offset),
            Collection::PlaylistItems(playlist_id) => {
                api.playlist_items(playlist_id, limit, offset)
            }
        }
    }
}

/// Runs one export of a user's playlists and saved tracks.
///
/// The run is sequential: playlists, then saved tracks, then each playlist's
/// items in playlist order. Identical remote state yields identical results.
pub struct Exporter<'a> {
    api: &'a dyn SpotifyApi,
    sleeper: &'a dyn Sleeper,
    pacing: Pacing,
}

impl<'a> Exporter<'a> {
    /// # Arguments
    ///
    /// * `api` - Spotify Web API used for every request of the run
    /// * `sleeper` - Performs page delays, playlist delays and backoffs
    /// * `pacing` - Page size, delays and the rate-limit retry cap
    pub fn new(api: &'a dyn SpotifyApi, sleeper: &'a dyn Sleeper, pacing: Pacing) -> Self {
        Self {
            api,
            sleeper,
            pacing,
        }
    }

    /// Runs the export without progress reporting.
    ///
    /// # Errors
    ///
    /// Fails on the first error of the run, see [`Exporter::run_streaming`]
    /// for the steps. Nothing partial is returned.
    pub fn run(&self) -> Result<ExportResult, ExportError> {
        self.run_with(&mut ProgressReporter::silent())
    }

    /// Runs the export, emitting progress to `sink`.
    ///
    /// The last event is always either [`ProgressEvent::Completed`] carrying
    /// the result or [`ProgressEvent::Failed`] carrying the error message.
    ///
    /// [`ProgressEvent::Completed`]: crate::export::ProgressEvent::Completed
    /// [`ProgressEvent::Failed`]: crate::export::ProgressEvent::Failed
    pub fn run_streaming(&self, sink: &mut dyn ProgressSink) {
        let mut reporter = ProgressReporter::new(sink);
        match self.run_with(&mut reporter) {
            Ok(result) => reporter.completed(result),
            Err(e) => reporter.failed(e.to_string()),
        }
    }

    /// The export itself, steps 1 to 6.
    ///
    /// 1. Resolve the user through `/me`.
    /// 2. Collect the playlists.
    /// 3. Collect the saved tracks, keeping only track items.
    /// 4. Append the saved-tracks pseudo-playlist.
    /// 5. Flatten each real playlist's items, with the playlist delay after
    ///    each one.
    /// 6. Append the saved-track rows.
    ///
    /// # Arguments
    ///
    /// * `reporter` - Receives a progress event at every step
    ///
    /// # Returns
    ///
    /// The playlists and track rows in collection order, the pseudo-playlist
    /// and its rows last.
    ///
    /// # Errors
    ///
    /// * `ExportError::Identity` - `/me` has no usable `id`
    /// * `ExportError::Remote` - A request failed with anything but a 429
    /// * `ExportError::RateLimitExhausted` - One page stayed rate limited
    ///   past the retry cap
    fn run_with(&self, reporter: &mut ProgressReporter) -> Result<ExportResult, ExportError> {
        let user = resolve_user(self.api)?;
        reporter.authenticated(&user.display_name, &user.id);

        reporter.fetching_playlists();
        let raw_playlists = self
            .paginate(Collection::Playlists)
            .collect::<Result<Vec<Value>, ExportError>>()?;

        let mut playlists: Vec<PlaylistRecord> = Vec::with_capacity(raw_playlists.len() + 1);
        for (index, raw) in raw_playlists.iter().enumerate() {
            match PlaylistRecord::from_value(raw) {
                Some(playlist) => playlists.push(playlist),
                None => warning!("Skipping playlist entry without id"),
            }
            reporter.playlist_collected(index, raw_playlists.len());
        }

        reporter.fetching_saved_tracks();
        let mut saved_items = Vec::new();
        for item in self.paginate(Collection::SavedTracks) {
            let item = item?;
            if is_track_item(&item) {
                saved_items.push(item);
            }
        }

        let saved = PlaylistRecord::saved_tracks(&user.id, saved_items.len());
        let real_playlists = playlists.len();
        playlists.push(saved);

        reporter.fetching_playlist_tracks();
        let mut tracks: Vec<TrackRow> = Vec::new();
        for (index, playlist) in playlists[..real_playlists].iter().enumerate() {
            let context = playlist.context();
            for item in self.paginate(Collection::PlaylistItems(&playlist.playlist_id)) {
                if let Some(row) = TrackRow::from_playlist_item(&item?, &context) {
                    tracks.push(row);
                }
            }
            self.sleeper.sleep(self.pacing.playlist_delay);
            reporter.playlist_processed(&playlist.name, index + 1, real_playlists);
        }

        reporter.adding_saved_tracks();
        let saved_context = playlists[real_playlists].context();
        tracks.extend(
            saved_items
                .iter()
                .filter_map(|item| TrackRow::from_saved_item(item, &saved_context)),
        );

        reporter.finalizing();
        Ok(ExportResult {
            user,
            playlists,
            tracks,
        })
    }

    /// Paginator over `collection` using this run's pacing and sleeper.
    fn paginate<'s>(
        &'s self,
        collection: Collection<'s>,
    ) -> Paginator<'s, impl FnMut(u32, u32) -> Result<Value, ApiError> + 's> {
        let api = self.api;
        Paginator::new(
            move |limit, offset| collection.fetch(api, limit, offset),
            "items",
            &self.pacing,
            self.sleeper,
        )
    }
}

/// Resolves the authenticated user through `GET /me`.
///
/// A missing or empty `id` is an identity failure; the display name falls
/// back to the id.
pub fn resolve_user(api: &dyn SpotifyApi) -> Result<UserIdentity, ExportError> {
    let me = api.current_user()?;
    let id = me
        .get("id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .ok_or(ExportError::Identity)?;

    let display_name = me
        .get("display_name")
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())
        .unwrap_or(id);

    Ok(UserIdentity {
        id: id.to_string(),
        display_name: display_name.to_string(),
    })
}
