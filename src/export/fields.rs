//! Degrade-to-`None` accessors over raw Spotify JSON.

use serde_json::Value;

/// Walks `keys` through nested objects and returns the leaf if it is a string.
///
/// Any non-object on the way, a missing key or a non-string leaf yields
/// `None`, so lookups such as `album.external_ids.upc` never fail on partial
/// records.
pub fn safe_nested_get<'a>(record: &'a Value, keys: &[&str]) -> Option<&'a str> {
    let mut current = record;
    for key in keys {
        current = current.as_object()?.get(*key)?;
    }
    current.as_str()
}

/// Joins the track's artist names with `", "` in source order.
pub fn join_artist_names(track: &Value) -> String {
    track
        .get("artists")
        .and_then(Value::as_array)
        .map(|artists| {
            artists
                .iter()
                .filter_map(|artist| artist.get("name").and_then(Value::as_str))
                .collect::<Vec<&str>>()
                .join(", ")
        })
        .unwrap_or_default()
}

/// Top-level string field.
pub(crate) fn string_field(record: &Value, key: &str) -> Option<String> {
    record.get(key).and_then(Value::as_str).map(str::to_string)
}

pub(crate) fn bool_field(record: &Value, key: &str) -> Option<bool> {
    record.get(key).and_then(Value::as_bool)
}

pub(crate) fn u64_field(record: &Value, key: &str) -> Option<u64> {
    record.get(key).and_then(Value::as_u64)
}

/// True when the item's `track` is a real track, not an episode or null.
pub fn is_track_item(item: &Value) -> bool {
    item.get("track")
        .and_then(|track| track.get("type"))
        .and_then(Value::as_str)
        == Some("track")
}
