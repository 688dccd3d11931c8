use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};

use crate::db::entities::track_like::{
    ActiveModel as TrackLikeActiveModel, Column as TrackLikeColumn, Entity as TrackLikeEntity,
    Model as TrackLikeModel,
};
use crate::domain::TrackLike;
use crate::error::{AppError, Result};

pub struct TrackLikeRepository<'a, C: ConnectionTrait> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> TrackLikeRepository<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    /// Upserts by the `(track_id, service)` unique constraint.
    pub async fn upsert_like(&self, like: &TrackLike) -> Result<TrackLike> {
        let existing = TrackLikeEntity::find()
            .filter(TrackLikeColumn::TrackId.eq(like.track_id))
            .filter(TrackLikeColumn::Service.eq(like.service.clone()))
            .one(self.conn)
            .await
            .map_err(AppError::from_db_err)?;

        let now = Utc::now();
        let model = if let Some(existing) = existing {
            let mut active: TrackLikeActiveModel = existing.into();
            active.is_liked = Set(like.is_liked);
            if let Some(liked_at) = like.liked_at {
                active.liked_at = Set(Some(liked_at.into()));
            }
            if let Some(last_synced) = like.last_synced {
                active.last_synced = Set(Some(last_synced.into()));
            }
            active.updated_at = Set(now.into());
            active.update(self.conn).await.map_err(AppError::from_db_err)?
        } else {
            let active = TrackLikeActiveModel {
                track_id: Set(like.track_id),
                service: Set(like.service.clone()),
                is_liked: Set(like.is_liked),
                liked_at: Set(like.liked_at.map(Into::into)),
                last_synced: Set(like.last_synced.map(Into::into)),
                is_deleted: Set(false),
                deleted_at: Set(None),
                created_at: Set(now.into()),
                updated_at: Set(now.into()),
                ..Default::default()
            };
            active.insert(self.conn).await.map_err(AppError::from_db_err)?
        };
        Ok(to_domain(&model))
    }

    pub async fn find_unsynced(&self, source: &str, target: &str) -> Result<Vec<TrackLike>> {
        let rows = TrackLikeEntity::find()
            .filter(TrackLikeColumn::Service.eq(source))
            .filter(TrackLikeColumn::IsLiked.eq(true))
            .filter(TrackLikeColumn::IsDeleted.eq(false))
            .all(self.conn)
            .await
            .map_err(AppError::from_db_err)?;

        let synced_target_ids: std::collections::HashSet<i64> = TrackLikeEntity::find()
            .filter(TrackLikeColumn::Service.eq(target))
            .all(self.conn)
            .await
            .map_err(AppError::from_db_err)?
            .into_iter()
            .map(|m| m.track_id)
            .collect();

        Ok(rows
            .into_iter()
            .filter(|r| !synced_target_ids.contains(&r.track_id))
            .map(|m| to_domain(&m))
            .collect())
    }
}

fn to_domain(model: &TrackLikeModel) -> TrackLike {
    TrackLike {
        id: Some(model.id),
        track_id: model.track_id,
        service: model.service.clone(),
        is_liked: model.is_liked,
        liked_at: model.liked_at.map(|d| d.with_timezone(&Utc)),
        last_synced: model.last_synced.map(|d| d.with_timezone(&Utc)),
    }
}
