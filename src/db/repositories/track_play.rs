use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};

use crate::db::entities::track_play::{ActiveModel as TrackPlayActiveModel, Column as TrackPlayColumn, Entity as TrackPlayEntity};
use crate::domain::TrackPlay;
use crate::error::{AppError, Result};

/// Immutable play events (spec §3 `TrackPlay`). No upsert semantics:
/// every call inserts a new row.
pub struct TrackPlayRepository<'a, C: ConnectionTrait> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> TrackPlayRepository<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    pub async fn record_play(&self, play: &TrackPlay) -> Result<TrackPlay> {
        let now = Utc::now();
        let active = TrackPlayActiveModel {
            track_id: Set(play.track_id),
            service: Set(play.service.clone()),
            played_at: Set(play.played_at.into()),
            ms_played: Set(play.ms_played.map(|d| d as i32)),
            context: Set(play.context.clone()),
            is_deleted: Set(false),
            deleted_at: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        };
        let created = active.insert(self.conn).await.map_err(AppError::from_db_err)?;
        Ok(TrackPlay {
            id: Some(created.id),
            track_id: created.track_id,
            service: created.service,
            played_at: created.played_at.with_timezone(&Utc),
            ms_played: created.ms_played.map(i64::from),
            context: created.context,
        })
    }

    pub async fn latest_played_at(&self, track_id: i64, service: &str) -> Result<Option<chrono::DateTime<Utc>>> {
        use sea_orm::QueryOrder;
        let row = TrackPlayEntity::find()
            .filter(TrackPlayColumn::TrackId.eq(track_id))
            .filter(TrackPlayColumn::Service.eq(service))
            .order_by_desc(TrackPlayColumn::PlayedAt)
            .one(self.conn)
            .await
            .map_err(AppError::from_db_err)?;
        Ok(row.map(|r| r.played_at.with_timezone(&Utc)))
    }
}
