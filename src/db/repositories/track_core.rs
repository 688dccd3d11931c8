use chrono::Utc;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};
use std::collections::HashMap;

use crate::db::entities::track::{ActiveModel, Column, Entity as TrackEntity, Model as TrackModel};
use crate::db::repositories::base::BaseRepository;
use crate::domain::Track;
use crate::error::{AppError, Result};

pub mod mapper {
    use super::TrackModel;
    use crate::domain::{Artist, Track};
    use std::collections::HashMap;

    pub fn to_domain(model: &TrackModel) -> Track {
        let artists: Vec<Artist> = serde_json::from_value(model.artists.clone())
            .unwrap_or_default();
        Track {
            id: Some(model.id),
            title: model.title.clone(),
            artists,
            album: model.album.clone(),
            duration_ms: model.duration_ms.map(i64::from),
            release_date: model.release_date.map(|d| d.with_timezone(&chrono::Utc)),
            isrc: model.isrc.clone(),
            connector_track_ids: HashMap::from([("db".to_string(), model.id.to_string())]),
            connector_metadata: HashMap::new(),
        }
    }
}

/// Precedence lookup `id -> isrc -> spotify_id -> mbid` (Invariant 2).
/// `spotify_id`/`mbid` precedence is resolved via `connector_track_ids`
/// on the in-memory `Track`, since those identifiers live on
/// `ConnectorTrack`/`TrackMapping`, not on the `tracks` table itself.
pub struct TrackCoreRepository<'a, C: ConnectionTrait> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> TrackCoreRepository<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    /// Finds or creates the canonical track matching `track` by the
    /// precedence order, fills missing scalar fields, and returns it
    /// with its database id bound. Never creates mappings.
    pub async fn save_track(&self, track: &Track) -> Result<Track> {
        let base = BaseRepository::<C, TrackEntity>::new(self.conn);

        if let Some(id) = track.id {
            if let Some(existing) = base.get_by_id(id).await? {
                return self.fill_missing_and_update(existing, track).await;
            }
        }

        if let Some(isrc) = &track.isrc {
            if let Some(existing) = TrackEntity::find()
                .filter(Column::Isrc.eq(isrc.clone()))
                .filter(Column::IsDeleted.eq(false))
                .one(self.conn)
                .await
                .map_err(crate::error::AppError::from_db_err)?
            {
                return self.fill_missing_and_update(existing, track).await;
            }
        }

        // spotify_id / mbid precedence is resolved by callers who hold
        // a `connector_track_id` lookup (TrackConnectorRepository);
        // absent an id/isrc match, create a new canonical row.
        let now = Utc::now();
        let active = ActiveModel {
            title: Set(track.title.clone()),
            artists: Set(serde_json::to_value(&track.artists).unwrap_or_default()),
            album: Set(track.album.clone()),
            duration_ms: Set(track.duration_ms.map(|d| d as i32)),
            release_date: Set(track.release_date.map(Into::into)),
            isrc: Set(track.isrc.clone()),
            is_deleted: Set(false),
            deleted_at: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        };
        let created = base.create(active).await?;
        Ok(mapper::to_domain(&created))
    }

    /// Bulk-fetches canonical tracks by id, for callers reconstructing
    /// a `Playlist`'s tracks from stored `PlaylistTrack` rows.
    pub async fn get_tracks_by_ids(&self, ids: &[i64]) -> Result<HashMap<i64, Track>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = TrackEntity::find()
            .filter(Column::Id.is_in(ids.to_vec()))
            .filter(Column::IsDeleted.eq(false))
            .all(self.conn)
            .await
            .map_err(AppError::from_db_err)?;
        Ok(rows.iter().map(|m| (m.id, mapper::to_domain(m))).collect())
    }

    async fn fill_missing_and_update(&self, existing: TrackModel, incoming: &Track) -> Result<Track> {
        let base = BaseRepository::<C, TrackEntity>::new(self.conn);
        let mut active: ActiveModel = existing.clone().into();
        let mut changed = false;

        if existing.album.is_none() {
            if let Some(album) = &incoming.album {
                active.album = Set(Some(album.clone()));
                changed = true;
            }
        }
        if existing.duration_ms.is_none() {
            if let Some(duration_ms) = incoming.duration_ms {
                active.duration_ms = Set(Some(duration_ms as i32));
                changed = true;
            }
        }
        if existing.release_date.is_none() {
            if let Some(release_date) = incoming.release_date {
                active.release_date = Set(Some(release_date.into()));
                changed = true;
            }
        }
        if existing.isrc.is_none() {
            if let Some(isrc) = &incoming.isrc {
                active.isrc = Set(Some(isrc.clone()));
                changed = true;
            }
        }

        let model = if changed {
            active.updated_at = Set(Utc::now().into());
            base.update(active).await?
        } else {
            existing
        };
        Ok(mapper::to_domain(&model))
    }
}
