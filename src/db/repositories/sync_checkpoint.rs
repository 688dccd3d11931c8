use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};
use std::str::FromStr;

use crate::db::entities::sync_checkpoint::{
    ActiveModel as SyncCheckpointActiveModel, Column as SyncCheckpointColumn, Entity as SyncCheckpointEntity,
};
use crate::domain::{EntityType, SyncCheckpoint};
use crate::error::{AppError, Result};

impl FromStr for EntityType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "likes" => Ok(Self::Likes),
            "plays" => Ok(Self::Plays),
            other => Err(format!("unknown entity type: {other}")),
        }
    }
}

/// Upserted after each successful batch in a sync operation, enabling
/// resumable incremental sync.
pub struct SyncCheckpointRepository<'a, C: ConnectionTrait> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> SyncCheckpointRepository<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    pub async fn get(&self, user_id: &str, service: &str, entity_type: &EntityType) -> Result<Option<SyncCheckpoint>> {
        let row = SyncCheckpointEntity::find()
            .filter(SyncCheckpointColumn::UserId.eq(user_id))
            .filter(SyncCheckpointColumn::Service.eq(service))
            .filter(SyncCheckpointColumn::EntityType.eq(entity_type.to_string()))
            .one(self.conn)
            .await
            .map_err(AppError::from_db_err)?;
        Ok(row.map(|m| SyncCheckpoint {
            id: Some(m.id),
            user_id: m.user_id,
            service: m.service,
            entity_type: EntityType::from_str(&m.entity_type).unwrap_or(EntityType::Likes),
            last_timestamp: m.last_timestamp.map(|d| d.with_timezone(&Utc)),
            cursor: m.cursor,
        }))
    }

    pub async fn upsert(&self, checkpoint: &SyncCheckpoint) -> Result<SyncCheckpoint> {
        let existing = SyncCheckpointEntity::find()
            .filter(SyncCheckpointColumn::UserId.eq(checkpoint.user_id.clone()))
            .filter(SyncCheckpointColumn::Service.eq(checkpoint.service.clone()))
            .filter(SyncCheckpointColumn::EntityType.eq(checkpoint.entity_type.to_string()))
            .one(self.conn)
            .await
            .map_err(AppError::from_db_err)?;

        let now = Utc::now();
        let model = if let Some(existing) = existing {
            let mut active: SyncCheckpointActiveModel = existing.into();
            active.last_timestamp = Set(checkpoint.last_timestamp.map(Into::into));
            active.cursor = Set(checkpoint.cursor.clone());
            active.updated_at = Set(now.into());
            active.update(self.conn).await.map_err(AppError::from_db_err)?
        } else {
            let active = SyncCheckpointActiveModel {
                user_id: Set(checkpoint.user_id.clone()),
                service: Set(checkpoint.service.clone()),
                entity_type: Set(checkpoint.entity_type.to_string()),
                last_timestamp: Set(checkpoint.last_timestamp.map(Into::into)),
                cursor: Set(checkpoint.cursor.clone()),
                is_deleted: Set(false),
                deleted_at: Set(None),
                created_at: Set(now.into()),
                updated_at: Set(now.into()),
                ..Default::default()
            };
            active.insert(self.conn).await.map_err(AppError::from_db_err)?
        };

        Ok(SyncCheckpoint {
            id: Some(model.id),
            user_id: model.user_id,
            service: model.service,
            entity_type: EntityType::from_str(&model.entity_type).unwrap_or(EntityType::Likes),
            last_timestamp: model.last_timestamp.map(|d| d.with_timezone(&Utc)),
            cursor: model.cursor,
        })
    }
}
