use std::collections::HashMap;

use crate::domain::track::Track;
use crate::domain::tracklist::TrackList;
use crate::error::{AppError, Result};

/// Persisted ordered sequence of tracks. Ordering is intrinsic:
/// `tracks` is kept in the order `PlaylistTrack.sort_key` implies.
#[derive(Debug, Clone, PartialEq)]
pub struct Playlist {
    pub id: Option<i64>,
    pub name: String,
    pub description: Option<String>,
    pub tracks: Vec<Track>,
    pub connector_playlist_ids: HashMap<String, String>,
}

impl Playlist {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(AppError::validation("playlist name must not be empty"));
        }
        Ok(Self {
            id: None,
            name,
            description: None,
            tracks: Vec::new(),
            connector_playlist_ids: HashMap::new(),
        })
    }

    pub fn with_id(&self, id: i64) -> Self {
        let mut next = self.clone();
        next.id = Some(id);
        next
    }

    pub fn with_description(&self, description: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.description = Some(description.into());
        next
    }

    pub fn with_tracks(&self, tracks: Vec<Track>) -> Self {
        let mut next = self.clone();
        next.tracks = tracks;
        next
    }

    pub fn with_connector_playlist_id(&self, connector: impl Into<String>, external_id: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.connector_playlist_ids.insert(connector.into(), external_id.into());
        next
    }

    pub fn to_tracklist(&self) -> TrackList {
        TrackList::from_playlist(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_name() {
        assert!(Playlist::new("").is_err());
    }

    #[test]
    fn to_tracklist_records_source_name() {
        let p = Playlist::new("Favorites").unwrap();
        let tl = p.to_tracklist();
        assert_eq!(
            tl.metadata.get("source_playlist_name").and_then(|v| v.as_str()),
            Some("Favorites")
        );
    }
}
