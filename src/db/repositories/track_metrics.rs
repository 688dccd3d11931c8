use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use std::collections::HashMap;

use crate::db::entities::track_metric::{
    ActiveModel as TrackMetricActiveModel, Column as TrackMetricColumn, Entity as TrackMetricEntity,
};
use crate::error::{AppError, Result};

/// `TrackMetrics` repository (spec §4.B). `get_track_metrics` keeps
/// the most-recent value per track; `save_track_metrics` upserts by
/// the `(track_id, connector_name, metric_type)` unique constraint.
pub struct TrackMetricsRepository<'a, C: ConnectionTrait> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> TrackMetricsRepository<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    pub async fn get_track_metrics(
        &self,
        track_ids: &[i64],
        metric_type: &str,
        connector: &str,
        max_age_hours: Option<i64>,
    ) -> Result<HashMap<i64, f64>> {
        let mut query = TrackMetricEntity::find()
            .filter(TrackMetricColumn::TrackId.is_in(track_ids.to_vec()))
            .filter(TrackMetricColumn::MetricType.eq(metric_type))
            .filter(TrackMetricColumn::ConnectorName.eq(connector))
            .filter(TrackMetricColumn::IsDeleted.eq(false));

        if let Some(max_age_hours) = max_age_hours {
            let cutoff = Utc::now() - chrono::Duration::hours(max_age_hours);
            query = query.filter(TrackMetricColumn::CollectedAt.gte(cutoff));
        }

        let rows = query
            .order_by_asc(TrackMetricColumn::CollectedAt)
            .all(self.conn)
            .await
            .map_err(AppError::from_db_err)?;

        let mut out = HashMap::new();
        for row in rows {
            // Later rows (ascending collected_at) overwrite earlier
            // ones, so the most-recent value wins.
            out.insert(row.track_id, row.value);
        }
        Ok(out)
    }

    /// Upserts `(track_id, connector, metric_type, value)` tuples by
    /// the unique constraint, matching the teacher's
    /// `UserSettingsRepository::create_or_update` find-then-update shape.
    pub async fn save_track_metrics(&self, metrics: &[(i64, String, String, f64)]) -> Result<()> {
        let now = Utc::now();
        for (track_id, connector, metric_type, value) in metrics {
            let existing = TrackMetricEntity::find()
                .filter(TrackMetricColumn::TrackId.eq(*track_id))
                .filter(TrackMetricColumn::ConnectorName.eq(connector.clone()))
                .filter(TrackMetricColumn::MetricType.eq(metric_type.clone()))
                .one(self.conn)
                .await
                .map_err(AppError::from_db_err)?;

            if let Some(existing) = existing {
                let mut active: TrackMetricActiveModel = existing.into();
                active.value = Set(*value);
                active.collected_at = Set(now.into());
                active.updated_at = Set(now.into());
                active.update(self.conn).await.map_err(AppError::from_db_err)?;
            } else {
                let active = TrackMetricActiveModel {
                    track_id: Set(*track_id),
                    connector_name: Set(connector.clone()),
                    metric_type: Set(metric_type.clone()),
                    value: Set(*value),
                    collected_at: Set(now.into()),
                    is_deleted: Set(false),
                    deleted_at: Set(None),
                    created_at: Set(now.into()),
                    updated_at: Set(now.into()),
                    ..Default::default()
                };
                active.insert(self.conn).await.map_err(AppError::from_db_err)?;
            }
        }
        Ok(())
    }
}
