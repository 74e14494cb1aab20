use serde::Serialize;

use crate::output::OutputError;

/// Pretty-printed JSON array of typed records.
pub fn render_records<T: Serialize>(records: &[T]) -> Result<Vec<u8>, OutputError> {
    Ok(serde_json::to_vec_pretty(records)?)
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::*;
    use crate::export::PlaylistRecord;

    #[test]
    fn test_render_records_keeps_nulls_and_booleans() {
        let bytes = render_records(&[PlaylistRecord::saved_tracks("alice", 1)]).unwrap();
        let json: Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(json[0]["playlist_id"], "liked_alice");
        assert_eq!(json[0]["public"], Value::Bool(false));
        assert_eq!(json[0]["href"], Value::Null);
        assert_eq!(json[0]["tracks_total"], 1);
    }
}
