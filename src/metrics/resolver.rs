use sea_orm::ConnectionTrait;
use std::collections::HashMap;

use crate::db::repositories::{TrackConnectorRepository, TrackMetricsRepository};
use crate::error::{AppError, Result};
use crate::metrics::registry::{connector_for_metric, freshness_hours, FIELD_MAPPINGS};

/// Resolves `metric_name` for `track_ids` (spec §4.E): cache hit from
/// `TrackMetric` within its TTL, otherwise a fresh read through
/// `connector_metadata`, persisted back as a `TrackMetric` row. Always
/// integer-keyed (Invariant 4).
pub async fn resolve<C: ConnectionTrait>(conn: &C, metric_name: &str, track_ids: &[i64]) -> Result<HashMap<i64, f64>> {
    if track_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let connector = connector_for_metric(metric_name)
        .ok_or_else(|| AppError::validation(format!("no connector registered for metric '{metric_name}'")))?;
    let field = FIELD_MAPPINGS
        .get(metric_name)
        .copied()
        .ok_or_else(|| AppError::validation(format!("no field mapping registered for metric '{metric_name}'")))?;

    let metrics_repo = TrackMetricsRepository::new(conn);
    let mut resolved = metrics_repo
        .get_track_metrics(track_ids, metric_name, connector, Some(freshness_hours(metric_name)))
        .await?;

    let misses: Vec<i64> = track_ids.iter().copied().filter(|id| !resolved.contains_key(id)).collect();
    if misses.is_empty() {
        return Ok(resolved);
    }

    let connector_repo = TrackConnectorRepository::new(conn);
    let raw_values = connector_repo.get_connector_metadata(&misses, connector, Some(field)).await?;

    let mut to_persist = Vec::with_capacity(raw_values.len());
    for (track_id, raw) in &raw_values {
        let Some(value) = json_to_f64(raw) else {
            tracing::warn!(track_id, metric_name, connector, "could not convert metric value to float, skipping");
            continue;
        };
        resolved.insert(*track_id, value);
        to_persist.push((*track_id, connector.to_string(), metric_name.to_string(), value));
    }

    if !to_persist.is_empty() {
        metrics_repo.save_track_metrics(&to_persist).await?;
    }

    Ok(resolved)
}

fn json_to_f64(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.parse::<f64>().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_to_f64_parses_numeric_strings() {
        assert_eq!(json_to_f64(&serde_json::json!("42")), Some(42.0));
        assert_eq!(json_to_f64(&serde_json::json!(42)), Some(42.0));
        assert_eq!(json_to_f64(&serde_json::json!("not a number")), None);
        assert_eq!(json_to_f64(&serde_json::json!(null)), None);
    }
}
