use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;

/// Per-service preference state, unique per `(track_id, service)`.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackLike {
    pub id: Option<i64>,
    pub track_id: i64,
    pub service: String,
    pub is_liked: bool,
    pub liked_at: Option<DateTime<Utc>>,
    pub last_synced: Option<DateTime<Utc>>,
}

impl TrackLike {
    pub fn new(track_id: i64, service: impl Into<String>, is_liked: bool) -> Self {
        Self {
            id: None,
            track_id,
            service: service.into(),
            is_liked,
            liked_at: None,
            last_synced: None,
        }
    }

    pub fn with_liked_at(&self, liked_at: DateTime<Utc>) -> Self {
        let mut next = self.clone();
        next.liked_at = Some(liked_at);
        next
    }

    pub fn with_last_synced(&self, last_synced: DateTime<Utc>) -> Self {
        let mut next = self.clone();
        next.last_synced = Some(last_synced);
        next
    }
}

/// Immutable play event.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackPlay {
    pub id: Option<i64>,
    pub track_id: i64,
    pub service: String,
    pub played_at: DateTime<Utc>,
    pub ms_played: Option<i64>,
    pub context: Option<JsonValue>,
}

impl TrackPlay {
    pub fn new(track_id: i64, service: impl Into<String>, played_at: DateTime<Utc>) -> Self {
        Self {
            id: None,
            track_id,
            service: service.into(),
            played_at,
            ms_played: None,
            context: None,
        }
    }
}

/// Time-series point. Unique per `(track_id, connector_name,
/// metric_type)` for upsert semantics on the most recent value.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackMetric {
    pub id: Option<i64>,
    pub track_id: i64,
    pub connector_name: String,
    pub metric_type: String,
    pub value: f64,
    pub collected_at: DateTime<Utc>,
}
