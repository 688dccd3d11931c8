use once_cell::sync::Lazy;
use std::collections::HashMap;

/// `connector_name -> metric_type` names it emits (spec §4.E).
/// `once_cell::sync::Lazy` in place of the teacher's `lazy_static`
/// (the rest of the transformed code favors `once_cell` for new static
/// tables; see DESIGN.md).
pub static CONNECTOR_METRICS: Lazy<HashMap<&'static str, Vec<&'static str>>> = Lazy::new(|| {
    HashMap::from([
        ("lastfm", vec!["lastfm_user_playcount", "lastfm_global_playcount", "lastfm_listeners"]),
        ("spotify", vec!["spotify_popularity"]),
    ])
});

/// `metric_type -> connector_metadata field name` holding its raw value.
pub static FIELD_MAPPINGS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("lastfm_user_playcount", "lastfm_user_playcount"),
        ("lastfm_global_playcount", "lastfm_global_playcount"),
        ("lastfm_listeners", "lastfm_listeners"),
        ("spotify_popularity", "spotify_popularity"),
    ])
});

/// `metric_type -> TTL in hours` before a cached `TrackMetric` is
/// considered stale and re-fetched from `connector_metadata`.
pub static METRIC_FRESHNESS: Lazy<HashMap<&'static str, i64>> = Lazy::new(|| {
    HashMap::from([("lastfm_user_playcount", 1)])
});

/// Default TTL for metrics with no entry in `METRIC_FRESHNESS`.
pub const DEFAULT_FRESHNESS_HOURS: i64 = 24;

pub fn freshness_hours(metric_type: &str) -> i64 {
    METRIC_FRESHNESS.get(metric_type).copied().unwrap_or(DEFAULT_FRESHNESS_HOURS)
}

/// Looks up which connector owns `metric_type`, if any.
pub fn connector_for_metric(metric_type: &str) -> Option<&'static str> {
    CONNECTOR_METRICS
        .iter()
        .find(|(_, metrics)| metrics.contains(&metric_type))
        .map(|(connector, _)| *connector)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lastfm_user_playcount_has_a_one_hour_ttl() {
        assert_eq!(freshness_hours("lastfm_user_playcount"), 1);
    }

    #[test]
    fn unlisted_metric_falls_back_to_default_ttl() {
        assert_eq!(freshness_hours("some_unknown_metric"), DEFAULT_FRESHNESS_HOURS);
    }

    #[test]
    fn spotify_popularity_resolves_to_the_spotify_connector() {
        assert_eq!(connector_for_metric("spotify_popularity"), Some("spotify"));
    }
}
