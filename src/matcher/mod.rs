//! Cross-service identity resolution (spec §4.F), grounded on
//! `original_source/narada/core/matcher.py`'s `batch_match_tracks`:
//! database-first, then ISRC→MBID, then a connector-specific API
//! lookup, all integer-track-id-keyed.

use async_trait::async_trait;
use sea_orm::ConnectionTrait;
use serde_json::Value as JsonValue;
use std::collections::HashMap;

use crate::connectors::musicbrainz::MusicBrainzConnector;
use crate::db::repositories::{TrackConnectorRepository, TrackMetricsRepository};
use crate::domain::{Artist, MatchMethod, Track, TrackMapping};
use crate::error::Result;
use crate::metrics::registry::CONNECTOR_METRICS;

/// Confidence scores, per spec §4.F.
pub const CONFIDENCE_CACHED: i32 = 98;
pub const CONFIDENCE_MBID: i32 = 95;
pub const CONFIDENCE_ISRC: i32 = 90;
pub const CONFIDENCE_ARTIST_TITLE: i32 = 85;
pub const DURATION_MISSING_PENALTY: i32 = 5;

/// A resolved (or attempted) match against one connector id, returned
/// by a connector's identity-lookup methods. `metric_value` carries
/// whatever headline metric the lookup incidentally returned (e.g.
/// Last.fm's user playcount) so the matcher can persist it alongside
/// the mapping in the same transaction.
pub struct ConnectorMatch {
    pub connector_id: String,
    pub metadata: Option<JsonValue>,
    pub duration_ms: Option<i64>,
    pub metric_type: Option<String>,
    pub metric_value: Option<f64>,
}

/// The narrow identity-lookup surface the matcher needs from a
/// connector; implemented by [`crate::connectors::lastfm::LastFmConnector`].
#[async_trait]
pub trait TargetConnector: Send + Sync {
    fn connector_name(&self) -> &'static str;
    async fn lookup_by_mbid(&self, mbid: &str) -> Result<Option<ConnectorMatch>>;
    async fn lookup_by_artist_title(&self, artists: &[Artist], title: &str) -> Result<Option<ConnectorMatch>>;
}

/// Outcome of resolving one canonical track against a target connector.
#[derive(Debug, Clone)]
pub struct MatchResult {
    pub track: Track,
    pub success: bool,
    pub match_method: Option<MatchMethod>,
    pub confidence: i32,
    pub metric_value: Option<f64>,
}

/// Resolves `tracks` against `target`, persisting newly discovered
/// mappings (and any MBID resolved along the way) within the caller's
/// transaction. Tracks without a persisted id are resolved but never
/// written (no `track_id` to attach a mapping to).
pub async fn batch_match_tracks<C: ConnectionTrait>(
    conn: &C,
    musicbrainz: &MusicBrainzConnector,
    target: &dyn TargetConnector,
    tracks: &[Track],
    max_age_hours: i64,
) -> Result<HashMap<i64, MatchResult>> {
    if tracks.is_empty() {
        return Ok(HashMap::new());
    }

    let connector_repo = TrackConnectorRepository::new(conn);
    let metrics_repo = TrackMetricsRepository::new(conn);
    let connector_name = target.connector_name();
    let headline_metric = CONNECTOR_METRICS.get(connector_name).and_then(|metrics| metrics.first().copied());

    let mut results: HashMap<i64, MatchResult> = HashMap::new();
    let mut unresolved: Vec<Track> = Vec::new();

    // Phase 1: database.
    let ids_with_tracks: Vec<(i64, &Track)> = tracks.iter().filter_map(|t| t.id.map(|id| (id, t))).collect();
    if !ids_with_tracks.is_empty() {
        let ids: Vec<i64> = ids_with_tracks.iter().map(|(id, _)| *id).collect();
        let mappings = connector_repo.get_connector_mappings(&ids, Some(connector_name)).await?;
        let cached_metrics = match headline_metric {
            Some(metric) => metrics_repo.get_track_metrics(&ids, metric, connector_name, Some(max_age_hours)).await?,
            None => HashMap::new(),
        };

        for (id, track) in &ids_with_tracks {
            if mappings.get(id).map(|m| !m.is_empty()).unwrap_or(false) {
                results.insert(
                    *id,
                    MatchResult {
                        track: (*track).clone(),
                        success: true,
                        match_method: Some(MatchMethod::Cached),
                        confidence: CONFIDENCE_CACHED,
                        metric_value: cached_metrics.get(id).copied(),
                    },
                );
            } else {
                unresolved.push((*track).clone());
            }
        }
    }
    if unresolved.is_empty() {
        return Ok(results);
    }

    // Phase 2: ISRC -> MBID.
    let isrcs: Vec<String> = unresolved
        .iter()
        .filter(|t| t.isrc.is_some() && t.mbid().is_none())
        .filter_map(|t| t.isrc.clone())
        .collect();
    let mut mbid_by_isrc: HashMap<String, String> = HashMap::new();
    if !isrcs.is_empty() {
        let lookups = musicbrainz.batch_isrc_lookup(&isrcs).await?;
        for (isrc, candidates) in lookups {
            if let Some(first) = candidates.into_iter().find_map(|t| t.mbid().map(str::to_string)) {
                mbid_by_isrc.insert(isrc, first);
            }
        }
    }
    let mut isrc_resolved_mbid: HashMap<i64, ()> = HashMap::new();
    let unresolved: Vec<Track> = unresolved
        .into_iter()
        .map(|t| match (&t.isrc, t.mbid()) {
            (Some(isrc), None) => match mbid_by_isrc.get(isrc) {
                Some(mbid) => {
                    if let Some(id) = t.id {
                        isrc_resolved_mbid.insert(id, ());
                    }
                    t.with_connector_track_id("musicbrainz", mbid.clone())
                }
                None => t,
            },
            _ => t,
        })
        .collect();

    // Phase 3: API lookup.
    for track in unresolved {
        let attempt = if let Some(mbid) = track.mbid() {
            target.lookup_by_mbid(mbid).await?.map(|m| (m, MatchMethod::Mbid, CONFIDENCE_MBID))
        } else {
            None
        };
        let attempt = match attempt {
            Some(a) => Some(a),
            None if !track.artists.is_empty() => target
                .lookup_by_artist_title(&track.artists, &track.title)
                .await?
                .map(|m| (m, MatchMethod::ArtistTitle, CONFIDENCE_ARTIST_TITLE)),
            None => None,
        };

        // `unresolved` is built only from tracks that had a persisted
        // id at phase 1 (source nodes guarantee ids before enrichment).
        let track_id = track.id.expect("matcher only resolves tracks with a persisted id");

        let Some((connector_match, match_method, base_confidence)) = attempt else {
            results.insert(
                track_id,
                MatchResult { track: track.clone(), success: false, match_method: None, confidence: 0, metric_value: None },
            );
            continue;
        };

        let duration_known = track.duration_ms.is_some() || connector_match.duration_ms.is_some();
        let confidence = if duration_known { base_confidence } else { (base_confidence - DURATION_MISSING_PENALTY).clamp(0, 100) };

        // Phase 5: persist (non-cached successes only).
        connector_repo
            .map_track_to_connector(track_id, connector_name, &connector_match.connector_id, match_method, confidence, connector_match.metadata.clone(), None)
            .await?;
        if isrc_resolved_mbid.contains_key(&track_id) {
            if let Some(mbid) = track.mbid() {
                connector_repo
                    .map_track_to_connector(track_id, "musicbrainz", mbid, MatchMethod::Isrc, CONFIDENCE_ISRC, None, None)
                    .await?;
            }
        }
        if let (Some(metric_type), Some(value)) = (&connector_match.metric_type, connector_match.metric_value) {
            metrics_repo.save_track_metrics(&[(track_id, connector_name.to_string(), metric_type.clone(), value)]).await?;
        }

        results.insert(
            track_id,
            MatchResult {
                track: track.with_connector_track_id(connector_name, connector_match.connector_id),
                success: true,
                match_method: Some(match_method),
                confidence,
                metric_value: connector_match.metric_value,
            },
        );
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_constants_match_the_resolution_table() {
        assert_eq!(CONFIDENCE_CACHED, 98);
        assert_eq!(CONFIDENCE_MBID, 95);
        assert_eq!(CONFIDENCE_ISRC, 90);
        assert_eq!(CONFIDENCE_ARTIST_TITLE, 85);
    }
}
