use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// The identity-matching method recorded on a `TrackMapping`.
///
/// `Isrc` is the single canonical spelling used for MBID mappings
/// derived via ISRC lookup (spec §9's flagged ambiguity): the source
/// calls this path `isrc` in the match-method column and `isrc_mbid`
/// in one config table. Only `"isrc"` is ever persisted or compared;
/// `isrc_mbid` exists nowhere but this doc comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMethod {
    Direct,
    Isrc,
    Mbid,
    ArtistTitle,
    Cached,
}

impl std::fmt::Display for MatchMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Direct => "direct",
            Self::Isrc => "isrc",
            Self::Mbid => "mbid",
            Self::ArtistTitle => "artist_title",
            Self::Cached => "cached",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for MatchMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "direct" => Ok(Self::Direct),
            "isrc" | "isrc_mbid" => Ok(Self::Isrc),
            "mbid" => Ok(Self::Mbid),
            "artist_title" => Ok(Self::ArtistTitle),
            "cached" => Ok(Self::Cached),
            other => Err(format!("unknown match method: {other}")),
        }
    }
}

/// Representation of a track as it exists on an external service.
/// Keyed by `(connector_name, connector_track_id)`; never stores
/// matching info (that lives on `TrackMapping`).
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectorTrack {
    pub id: Option<i64>,
    pub connector_name: String,
    pub connector_track_id: String,
    pub title: String,
    pub artists: Vec<crate::domain::artist::Artist>,
    pub album: Option<String>,
    pub duration_ms: Option<i64>,
    pub release_date: Option<DateTime<Utc>>,
    pub isrc: Option<String>,
    pub raw_metadata: JsonValue,
    pub last_updated: DateTime<Utc>,
}

/// Edge between a canonical `Track` and a `ConnectorTrack`.
///
/// Append-only in effect (Invariant 3): `match_method` and the
/// originally-observed `confidence` never change once created;
/// re-observation only updates `last_verified`.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackMapping {
    pub id: Option<i64>,
    pub track_id: i64,
    pub connector_track_id: i64,
    pub match_method: MatchMethod,
    pub confidence: i32,
    pub confidence_evidence: Option<JsonValue>,
    /// Raw API payload used to derive the match, distinct from the
    /// connector-specific fields stored on `Track`/`ConnectorTrack`.
    pub metadata: Option<JsonValue>,
    pub last_verified: Option<DateTime<Utc>>,
}

impl TrackMapping {
    pub fn new(track_id: i64, connector_track_id: i64, match_method: MatchMethod, confidence: i32) -> Self {
        Self {
            id: None,
            track_id,
            connector_track_id,
            match_method,
            confidence: confidence.clamp(0, 100),
            confidence_evidence: None,
            metadata: None,
            last_verified: None,
        }
    }

    pub fn with_confidence_evidence(&self, evidence: JsonValue) -> Self {
        let mut next = self.clone();
        next.confidence_evidence = Some(evidence);
        next
    }

    pub fn with_metadata(&self, metadata: JsonValue) -> Self {
        let mut next = self.clone();
        next.metadata = Some(metadata);
        next
    }
}

/// `(playlist_id, connector_name) -> connector_playlist_id`, unique per
/// playlist+connector.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaylistMapping {
    pub id: Option<i64>,
    pub playlist_id: i64,
    pub connector_name: String,
    pub connector_playlist_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn isrc_and_isrc_mbid_parse_to_the_same_variant() {
        assert_eq!("isrc".parse::<MatchMethod>().unwrap(), MatchMethod::Isrc);
        assert_eq!("isrc_mbid".parse::<MatchMethod>().unwrap(), MatchMethod::Isrc);
    }

    #[test]
    fn isrc_variant_displays_as_isrc() {
        assert_eq!(MatchMethod::Isrc.to_string(), "isrc");
    }

    #[test]
    fn confidence_is_clamped() {
        let m = TrackMapping::new(1, 1, MatchMethod::ArtistTitle, 150);
        assert_eq!(m.confidence, 100);
        let m = TrackMapping::new(1, 1, MatchMethod::ArtistTitle, -10);
        assert_eq!(m.confidence, 0);
    }
}
