//! Typed rows built from raw Spotify objects, and their fixed table schemas.
//!
//! Records keep absent values as `None`. Tabular renderings (`to_cells`)
//! turn every cell into a string: `None` becomes `""`, booleans
//! `true`/`false`, numbers their decimal form.

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    export::fields::{
        bool_field, is_track_item, join_artist_names, safe_nested_get, string_field, u64_field,
    },
    types::UserIdentity,
};

pub const PLAYLIST_HEADERS: [&str; 10] = [
    "playlist_id",
    "name",
    "public",
    "collaborative",
    "owner_id",
    "owner_name",
    "tracks_total",
    "href",
    "external_url",
    "snapshot_id",
];

pub const TRACK_HEADERS: [&str; 18] = [
    "playlist_id",
    "playlist_name",
    "playlist_owner_id",
    "added_at",
    "added_by_id",
    "track_id",
    "track_isrc",
    "track_uri",
    "track_url",
    "track_name",
    "track_popularity",
    "artists",
    "album_name",
    "album_upc",
    "album_release_date",
    "duration_ms",
    "explicit",
    "is_local",
];

/// Display name of the saved-tracks pseudo-playlist.
pub const SAVED_TRACKS_NAME: &str = "Liked Songs";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistRecord {
    pub playlist_id: String,
    pub name: String,
    pub public: Option<bool>,
    pub collaborative: Option<bool>,
    pub owner_id: Option<String>,
    pub owner_name: Option<String>,
    /// As reported by Spotify, never checked against the exported rows.
    pub tracks_total: Option<u64>,
    pub href: Option<String>,
    pub external_url: Option<String>,
    pub snapshot_id: Option<String>,
}

impl PlaylistRecord {
    /// Maps a playlist object from `GET /me/playlists`.
    ///
    /// # Arguments
    ///
    /// * `playlist` - One entry of the page's `items` array
    ///
    /// # Returns
    ///
    /// `None` when the entry has no string `id`. Every other field is
    /// optional; a missing `name` becomes the empty string.
    pub fn from_value(playlist: &Value) -> Option<Self> {
        let playlist_id = string_field(playlist, "id")?;

        Some(Self {
            playlist_id,
            name: string_field(playlist, "name").unwrap_or_default(),
            public: bool_field(playlist, "public"),
            collaborative: bool_field(playlist, "collaborative"),
            owner_id: safe_nested_get(playlist, &["owner", "id"]).map(str::to_string),
            owner_name: safe_nested_get(playlist, &["owner", "display_name"])
                .map(str::to_string),
            tracks_total: playlist.get("tracks").and_then(|t| u64_field(t, "total")),
            href: string_field(playlist, "href"),
            external_url: safe_nested_get(playlist, &["external_urls", "spotify"])
                .map(str::to_string),
            snapshot_id: string_field(playlist, "snapshot_id"),
        })
    }

    /// The pseudo-playlist standing for the user's saved tracks.
    ///
    /// # Arguments
    ///
    /// * `user_id` - Spotify id of the exporting user, used for the
    ///   `liked_<user_id>` playlist id and as owner
    /// * `total` - Number of saved track items that were kept
    pub fn saved_tracks(user_id: &str, total: usize) -> Self {
        Self {
            playlist_id: saved_tracks_id(user_id),
            name: SAVED_TRACKS_NAME.to_string(),
            public: Some(false),
            collaborative: Some(false),
            owner_id: Some(user_id.to_string()),
            owner_name: Some(user_id.to_string()),
            tracks_total: Some(total as u64),
            href: None,
            external_url: None,
            snapshot_id: None,
        }
    }

    pub fn context(&self) -> PlaylistContext {
        PlaylistContext {
            id: self.playlist_id.clone(),
            name: self.name.clone(),
            owner_id: self.owner_id.clone(),
        }
    }

    pub fn to_cells(&self) -> Vec<String> {
        vec![
            self.playlist_id.clone(),
            self.name.clone(),
            cell(self.public),
            cell(self.collaborative),
            text(&self.owner_id),
            text(&self.owner_name),
            cell(self.tracks_total),
            text(&self.href),
            text(&self.external_url),
            text(&self.snapshot_id),
        ]
    }
}

pub fn saved_tracks_id(user_id: &str) -> String {
    format!("liked_{user_id}")
}

/// Playlist identity stamped on each of its track rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistContext {
    pub id: String,
    pub name: String,
    pub owner_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackRow {
    pub playlist_id: String,
    pub playlist_name: String,
    pub playlist_owner_id: Option<String>,
    pub added_at: Option<String>,
    pub added_by_id: Option<String>,
    pub track_id: Option<String>,
    pub track_isrc: Option<String>,
    pub track_uri: Option<String>,
    pub track_url: Option<String>,
    pub track_name: Option<String>,
    pub track_popularity: Option<u64>,
    pub artists: String,
    pub album_name: Option<String>,
    pub album_upc: Option<String>,
    pub album_release_date: Option<String>,
    pub duration_ms: Option<u64>,
    pub explicit: Option<bool>,
    pub is_local: bool,
}

impl TrackRow {
    /// Flattens a playlist item into one row stamped with `playlist`.
    ///
    /// # Returns
    ///
    /// `None` for non-track items (episodes, null tracks). `is_local`
    /// defaults to `false` when the item does not carry it.
    pub fn from_playlist_item(item: &Value, playlist: &PlaylistContext) -> Option<Self> {
        if !is_track_item(item) {
            return None;
        }

        Some(Self::from_track(
            &item["track"],
            playlist,
            string_field(item, "added_at"),
            safe_nested_get(item, &["added_by", "id"]).map(str::to_string),
            bool_field(item, "is_local").unwrap_or(false),
        ))
    }

    /// Flattens a saved-track item. Saved tracks have no "added by" actor.
    pub fn from_saved_item(item: &Value, playlist: &PlaylistContext) -> Option<Self> {
        if !is_track_item(item) {
            return None;
        }

        Some(Self::from_track(
            &item["track"],
            playlist,
            string_field(item, "added_at"),
            None,
            false,
        ))
    }

    fn from_track(
        track: &Value,
        playlist: &PlaylistContext,
        added_at: Option<String>,
        added_by_id: Option<String>,
        is_local: bool,
    ) -> Self {
        let nested = |keys: &[&str]| safe_nested_get(track, keys).map(str::to_string);

        Self {
            playlist_id: playlist.id.clone(),
            playlist_name: playlist.name.clone(),
            playlist_owner_id: playlist.owner_id.clone(),
            added_at,
            added_by_id,
            track_id: string_field(track, "id"),
            track_isrc: nested(&["external_ids", "isrc"]),
            track_uri: string_field(track, "uri"),
            track_url: nested(&["external_urls", "spotify"]),
            track_name: string_field(track, "name"),
            track_popularity: u64_field(track, "popularity"),
            artists: join_artist_names(track),
            album_name: nested(&["album", "name"]),
            album_upc: nested(&["album", "external_ids", "upc"]),
            album_release_date: nested(&["album", "release_date"]),
            duration_ms: u64_field(track, "duration_ms"),
            explicit: bool_field(track, "explicit"),
            is_local,
        }
    }

    pub fn to_cells(&self) -> Vec<String> {
        vec![
            self.playlist_id.clone(),
            self.playlist_name.clone(),
            text(&self.playlist_owner_id),
            text(&self.added_at),
            text(&self.added_by_id),
            text(&self.track_id),
            text(&self.track_isrc),
            text(&self.track_uri),
            text(&self.track_url),
            text(&self.track_name),
            cell(self.track_popularity),
            self.artists.clone(),
            text(&self.album_name),
            text(&self.album_upc),
            text(&self.album_release_date),
            cell(self.duration_ms),
            cell(self.explicit),
            self.is_local.to_string(),
        ]
    }
}

/// Outcome of one export run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportResult {
    pub user: UserIdentity,
    /// Real playlists in API order, then the saved-tracks pseudo-playlist.
    pub playlists: Vec<PlaylistRecord>,
    /// Real playlists' rows in playlist order, then saved-track rows.
    pub tracks: Vec<TrackRow>,
}

impl ExportResult {
    /// Header row followed by one row per playlist.
    pub fn playlist_table(&self) -> Vec<Vec<String>> {
        table(&PLAYLIST_HEADERS, self.playlists.iter().map(PlaylistRecord::to_cells))
    }

    /// Header row followed by one row per track.
    pub fn track_table(&self) -> Vec<Vec<String>> {
        table(&TRACK_HEADERS, self.tracks.iter().map(TrackRow::to_cells))
    }

    pub fn exported_count(&self, playlist_id: &str) -> usize {
        self.tracks
            .iter()
            .filter(|row| row.playlist_id == playlist_id)
            .count()
    }
}

fn table(headers: &[&str], rows: impl Iterator<Item = Vec<String>>) -> Vec<Vec<String>> {
    std::iter::once(headers.iter().map(|h| h.to_string()).collect())
        .chain(rows)
        .collect()
}

fn text(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn cell<T: Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}
