use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use std::collections::HashMap;

use crate::domain::artist::Artist;
use crate::error::{AppError, Result};

/// Canonical, service-agnostic recording (spec §3/§4.A).
///
/// Mutation is never in place: every `with_*` method returns a new
/// instance. `connector_track_ids["db"]` is set once the track is
/// persisted; it is the only field `save_track` is allowed to bind.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub id: Option<i64>,
    pub title: String,
    pub artists: Vec<Artist>,
    pub album: Option<String>,
    pub duration_ms: Option<i64>,
    pub release_date: Option<DateTime<Utc>>,
    pub isrc: Option<String>,
    pub connector_track_ids: HashMap<String, String>,
    pub connector_metadata: HashMap<String, HashMap<String, JsonValue>>,
}

impl Track {
    pub fn new(title: impl Into<String>, artists: Vec<Artist>) -> Result<Self> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(AppError::validation("track title must not be empty"));
        }
        if artists.is_empty() {
            return Err(AppError::validation("track must have at least one artist"));
        }
        Ok(Self {
            id: None,
            title,
            artists,
            album: None,
            duration_ms: None,
            release_date: None,
            isrc: None,
            connector_track_ids: HashMap::new(),
            connector_metadata: HashMap::new(),
        })
    }

    pub fn with_id(&self, id: i64) -> Self {
        let mut next = self.clone();
        next.id = Some(id);
        next
    }

    pub fn with_album(&self, album: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.album = Some(album.into());
        next
    }

    pub fn with_duration_ms(&self, duration_ms: i64) -> Self {
        let mut next = self.clone();
        next.duration_ms = Some(duration_ms);
        next
    }

    /// Normalizes to UTC per Invariant 7; a naive datetime is assumed UTC.
    pub fn with_release_date(&self, release_date: DateTime<Utc>) -> Self {
        let mut next = self.clone();
        next.release_date = Some(release_date);
        next
    }

    pub fn with_isrc(&self, isrc: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.isrc = Some(isrc.into());
        next
    }

    pub fn with_connector_track_id(&self, connector: impl Into<String>, external_id: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.connector_track_ids.insert(connector.into(), external_id.into());
        next
    }

    pub fn with_connector_metadata(
        &self,
        connector: impl Into<String>,
        metadata: HashMap<String, JsonValue>,
    ) -> Self {
        let mut next = self.clone();
        next.connector_metadata.insert(connector.into(), metadata);
        next
    }

    /// Read-only accessor into `connector_metadata`, mirrored from
    /// the original `Track.get_connector_attribute` helper.
    pub fn get_connector_attribute(&self, connector: &str, field: &str, default: JsonValue) -> JsonValue {
        self.connector_metadata
            .get(connector)
            .and_then(|fields| fields.get(field))
            .cloned()
            .unwrap_or(default)
    }

    pub fn mbid(&self) -> Option<&str> {
        self.connector_track_ids.get("musicbrainz").map(String::as_str)
    }

    pub fn spotify_id(&self) -> Option<&str> {
        self.connector_track_ids.get("spotify").map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artist() -> Artist {
        Artist::new("Artist").unwrap()
    }

    #[test]
    fn rejects_empty_title() {
        assert!(Track::new("", vec![artist()]).is_err());
    }

    #[test]
    fn rejects_no_artists() {
        assert!(Track::new("Title", vec![]).is_err());
    }

    #[test]
    fn with_methods_return_new_instances() {
        let t = Track::new("Title", vec![artist()]).unwrap();
        let t2 = t.with_album("Album");
        assert_eq!(t2.album.as_deref(), Some("Album"));
        assert_eq!(t.album, None);
        assert_eq!(t2.title, t.title);
    }

    #[test]
    fn with_id_binds_process_assigned_id() {
        let t = Track::new("Title", vec![artist()]).unwrap();
        let t2 = t.with_id(42);
        assert_eq!(t2.id, Some(42));
        assert_eq!(t.id, None);
    }
}
