use serde_json::{Map, Value as JsonValue};
use std::collections::HashMap;

use crate::domain::playlist::Playlist;
use crate::domain::track::Track;
use crate::error::{AppError, Result};

/// Ephemeral ordered sequence of tracks plus arbitrary metadata. Never
/// persisted directly; the inter-node value type passed through the
/// workflow engine.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackList {
    pub tracks: Vec<Track>,
    pub metadata: Map<String, JsonValue>,
}

impl TrackList {
    pub fn new(tracks: Vec<Track>) -> Self {
        Self {
            tracks,
            metadata: Map::new(),
        }
    }

    pub fn with_metadata(&self, key: impl Into<String>, value: JsonValue) -> Self {
        let mut next = self.clone();
        next.metadata.insert(key.into(), value);
        next
    }

    /// Copies a playlist's tracks and records `source_playlist_name`.
    pub fn from_playlist(playlist: &Playlist) -> Self {
        Self::new(playlist.tracks.clone())
            .with_metadata("source_playlist_name", JsonValue::String(playlist.name.clone()))
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// `metadata["metrics"][metric_name]` as an integer-keyed map
    /// (Invariant 4). Rejects a string-keyed-looking map (any key that
    /// does not parse as `i64`) instead of silently coercing.
    pub fn metric_map(&self, metric_name: &str) -> Result<HashMap<i64, Option<f64>>> {
        let Some(metrics) = self.metadata.get("metrics").and_then(JsonValue::as_object) else {
            return Ok(HashMap::new());
        };
        let Some(entries) = metrics.get(metric_name).and_then(JsonValue::as_object) else {
            return Ok(HashMap::new());
        };
        let mut out = HashMap::with_capacity(entries.len());
        for (key, value) in entries {
            let track_id: i64 = key.parse().map_err(|_| {
                AppError::validation(format!(
                    "metrics map for '{metric_name}' has non-integer key '{key}'"
                ))
            })?;
            out.insert(track_id, value.as_f64());
        }
        Ok(out)
    }

    /// Writes an integer-keyed metric map back into
    /// `metadata["metrics"][metric_name]`.
    pub fn set_metric_map(&mut self, metric_name: &str, values: &HashMap<i64, Option<f64>>) {
        let metrics_entry = self
            .metadata
            .entry("metrics")
            .or_insert_with(|| JsonValue::Object(Map::new()));
        let metrics_obj = metrics_entry.as_object_mut().expect("metrics is always an object");
        let mut inner = Map::new();
        for (track_id, value) in values {
            let json_value = match value {
                Some(v) => JsonValue::from(*v),
                None => JsonValue::Null,
            };
            inner.insert(track_id.to_string(), json_value);
        }
        metrics_obj.insert(metric_name.to_string(), JsonValue::Object(inner));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::artist::Artist;

    fn track(id: i64) -> Track {
        Track::new("Title", vec![Artist::new("Artist").unwrap()])
            .unwrap()
            .with_id(id)
    }

    #[test]
    fn metric_map_rejects_string_keys() {
        let mut tl = TrackList::new(vec![track(1)]);
        tl.metadata.insert(
            "metrics".into(),
            serde_json::json!({ "plays": { "not_a_number": 5 } }),
        );
        assert!(tl.metric_map("plays").is_err());
    }

    #[test]
    fn set_and_read_metric_map_round_trips() {
        let mut tl = TrackList::new(vec![track(1), track(2)]);
        let mut values = HashMap::new();
        values.insert(1, Some(10.0));
        values.insert(2, None);
        tl.set_metric_map("plays", &values);
        let read_back = tl.metric_map("plays").unwrap();
        assert_eq!(read_back.get(&1), Some(&Some(10.0)));
        assert_eq!(read_back.get(&2), Some(&None));
    }
}
