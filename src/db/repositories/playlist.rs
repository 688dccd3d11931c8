use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use std::collections::HashMap;

use crate::db::entities::playlist::{ActiveModel as PlaylistActiveModel, Entity as PlaylistEntity};
use crate::db::entities::playlist_mapping::{
    ActiveModel as PlaylistMappingActiveModel, Column as PlaylistMappingColumn, Entity as PlaylistMappingEntity,
};
use crate::db::entities::playlist_track::{
    ActiveModel as PlaylistTrackActiveModel, Column as PlaylistTrackColumn, Entity as PlaylistTrackEntity,
};
use crate::db::repositories::base::BaseRepository;
use crate::db::repositories::track_connector::TrackConnectorRepository;
use crate::db::repositories::track_core::TrackCoreRepository;
use crate::domain::{Playlist, Track};
use crate::error::{AppError, Result};

/// Lexicographically sortable sort keys enabling stable reordering
/// without renumbering: `"a" + zero-padded-8-digit index`.
pub fn sort_key_for_index(index: usize) -> String {
    format!("a{index:08}")
}

pub struct PlaylistRepository<'a, C: ConnectionTrait> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> PlaylistRepository<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    /// Persists any tracks lacking ids, inserts the playlist row,
    /// batch-inserts `PlaylistMapping` and `PlaylistTrack` rows. All
    /// writes in this call must share one transaction (see
    /// `db::session::SessionFactory::with_transaction`).
    pub async fn save_playlist(&self, playlist: &Playlist) -> Result<Playlist> {
        let now = Utc::now();
        let base = BaseRepository::<C, PlaylistEntity>::new(self.conn);

        let active = PlaylistActiveModel {
            name: Set(playlist.name.clone()),
            description: Set(playlist.description.clone()),
            is_deleted: Set(false),
            deleted_at: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        };
        let created = base.create(active).await?;

        for (connector, external_id) in &playlist.connector_playlist_ids {
            let active = PlaylistMappingActiveModel {
                playlist_id: Set(created.id),
                connector_name: Set(connector.clone()),
                connector_playlist_id: Set(external_id.clone()),
                is_deleted: Set(false),
                deleted_at: Set(None),
                created_at: Set(now.into()),
                updated_at: Set(now.into()),
                ..Default::default()
            };
            active.insert(self.conn).await.map_err(AppError::from_db_err)?;
        }

        let mut persisted_tracks = Vec::with_capacity(playlist.tracks.len());
        for (index, track) in playlist.tracks.iter().enumerate() {
            let persisted = self.persist_track(track, &playlist.connector_playlist_ids).await?;
            let track_id = persisted.id.expect("track is persisted before a PlaylistTrack row is written");
            let active = PlaylistTrackActiveModel {
                playlist_id: Set(created.id),
                track_id: Set(track_id),
                sort_key: Set(sort_key_for_index(index)),
                is_deleted: Set(false),
                deleted_at: Set(None),
                created_at: Set(now.into()),
                updated_at: Set(now.into()),
                ..Default::default()
            };
            active.insert(self.conn).await.map_err(AppError::from_db_err)?;
            persisted_tracks.push(persisted);
        }

        Ok(playlist.with_id(created.id).with_tracks(persisted_tracks))
    }

    /// Diffs existing vs. incoming tracks by track id: updates
    /// `sort_key` for kept tracks if changed, inserts new rows,
    /// soft-deletes removed ones, upserts connector mappings.
    pub async fn update_playlist(&self, id: i64, playlist: &Playlist) -> Result<Playlist> {
        let now = Utc::now();

        let existing_rows = PlaylistTrackEntity::find()
            .filter(PlaylistTrackColumn::PlaylistId.eq(id))
            .filter(PlaylistTrackColumn::IsDeleted.eq(false))
            .all(self.conn)
            .await
            .map_err(AppError::from_db_err)?;
        let existing_by_track: HashMap<i64, _> = existing_rows.into_iter().map(|r| (r.track_id, r)).collect();

        let mut incoming_track_ids = Vec::with_capacity(playlist.tracks.len());
        let mut persisted_tracks = Vec::with_capacity(playlist.tracks.len());

        for (index, track) in playlist.tracks.iter().enumerate() {
            let persisted = self.persist_track(track, &playlist.connector_playlist_ids).await?;
            let track_id = persisted.id.expect("track is persisted before a PlaylistTrack row is written");
            incoming_track_ids.push(track_id);
            persisted_tracks.push(persisted);

            let desired_sort_key = sort_key_for_index(index);
            if let Some(existing) = existing_by_track.get(&track_id) {
                if existing.sort_key != desired_sort_key {
                    let mut active: PlaylistTrackActiveModel = existing.clone().into();
                    active.sort_key = Set(desired_sort_key);
                    active.updated_at = Set(now.into());
                    active.update(self.conn).await.map_err(AppError::from_db_err)?;
                }
            } else {
                let active = PlaylistTrackActiveModel {
                    playlist_id: Set(id),
                    track_id: Set(track_id),
                    sort_key: Set(desired_sort_key),
                    is_deleted: Set(false),
                    deleted_at: Set(None),
                    created_at: Set(now.into()),
                    updated_at: Set(now.into()),
                    ..Default::default()
                };
                active.insert(self.conn).await.map_err(AppError::from_db_err)?;
            }
        }

        for (track_id, row) in &existing_by_track {
            if !incoming_track_ids.contains(track_id) {
                let mut active: PlaylistTrackActiveModel = row.clone().into();
                active.is_deleted = Set(true);
                active.deleted_at = Set(Some(now.into()));
                active.updated_at = Set(now.into());
                active.update(self.conn).await.map_err(AppError::from_db_err)?;
            }
        }

        for (connector, external_id) in &playlist.connector_playlist_ids {
            let existing = PlaylistMappingEntity::find()
                .filter(PlaylistMappingColumn::PlaylistId.eq(id))
                .filter(PlaylistMappingColumn::ConnectorName.eq(connector.clone()))
                .one(self.conn)
                .await
                .map_err(AppError::from_db_err)?;
            if let Some(existing) = existing {
                let mut active: PlaylistMappingActiveModel = existing.into();
                active.connector_playlist_id = Set(external_id.clone());
                active.updated_at = Set(now.into());
                active.update(self.conn).await.map_err(AppError::from_db_err)?;
            } else {
                let active = PlaylistMappingActiveModel {
                    playlist_id: Set(id),
                    connector_name: Set(connector.clone()),
                    connector_playlist_id: Set(external_id.clone()),
                    is_deleted: Set(false),
                    deleted_at: Set(None),
                    created_at: Set(now.into()),
                    updated_at: Set(now.into()),
                    ..Default::default()
                };
                active.insert(self.conn).await.map_err(AppError::from_db_err)?;
            }
        }

        let base = BaseRepository::<C, PlaylistEntity>::new(self.conn);
        let playlist_row = base
            .get_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("playlist {id}")))?;
        let mut active: PlaylistActiveModel = playlist_row.into();
        active.name = Set(playlist.name.clone());
        active.description = Set(playlist.description.clone());
        active.updated_at = Set(now.into());
        base.update(active).await?;

        Ok(playlist.with_id(id).with_tracks(persisted_tracks))
    }

    /// Reconstructs a `Playlist` from its stored row, connector
    /// mappings, and ordered tracks. `None` if the row is absent or
    /// soft-deleted.
    pub async fn get_playlist(&self, id: i64) -> Result<Option<Playlist>> {
        let base = BaseRepository::<C, PlaylistEntity>::new(self.conn);
        let Some(row) = base.get_by_id(id).await? else { return Ok(None) };

        let mappings = PlaylistMappingEntity::find()
            .filter(PlaylistMappingColumn::PlaylistId.eq(id))
            .filter(PlaylistMappingColumn::IsDeleted.eq(false))
            .all(self.conn)
            .await
            .map_err(AppError::from_db_err)?;

        let track_ids = self.load_ordered_track_ids(id).await?;
        let track_repo = TrackCoreRepository::new(self.conn);
        let by_id = track_repo.get_tracks_by_ids(&track_ids).await?;
        let tracks = track_ids.iter().filter_map(|id| by_id.get(id).cloned()).collect();

        let mut playlist = Playlist::new(row.name)?.with_id(id).with_tracks(tracks);
        if let Some(description) = row.description {
            playlist = playlist.with_description(description);
        }
        for mapping in mappings {
            playlist = playlist.with_connector_playlist_id(mapping.connector_name, mapping.connector_playlist_id);
        }
        Ok(Some(playlist))
    }

    /// Persists an id-less track. Prefers `ingest_external_track` over a
    /// bare `save_track` when the track already carries an id for one of
    /// the playlist's source connectors (spec §4.B), so it resolves
    /// through the same identity path as direct ingestion instead of
    /// risking a second canonical row for a track a connector node
    /// already knows.
    async fn persist_track(&self, track: &Track, connector_playlist_ids: &HashMap<String, String>) -> Result<Track> {
        if track.id.is_some() {
            return Ok(track.clone());
        }

        let connector = connector_playlist_ids.keys().find(|connector| track.connector_track_ids.contains_key(connector.as_str()));
        if let Some(connector) = connector {
            let connector_id = track.connector_track_ids[connector].clone();
            let metadata = track
                .connector_metadata
                .get(connector)
                .map(|fields| serde_json::to_value(fields).unwrap_or(serde_json::Value::Null))
                .unwrap_or(serde_json::Value::Null);
            let connector_repo = TrackConnectorRepository::new(self.conn);
            let (persisted, _, _) = connector_repo
                .ingest_external_track(
                    connector,
                    &connector_id,
                    metadata,
                    &track.title,
                    &track.artists,
                    track.album.as_deref(),
                    track.duration_ms,
                    track.release_date,
                    track.isrc.as_deref(),
                )
                .await?;
            return Ok(persisted);
        }

        TrackCoreRepository::new(self.conn).save_track(track).await
    }

    /// Loads a playlist's tracks ordered by `sort_key` ascending among
    /// non-deleted rows (Invariant 6).
    pub async fn load_ordered_track_ids(&self, id: i64) -> Result<Vec<i64>> {
        let rows = PlaylistTrackEntity::find()
            .filter(PlaylistTrackColumn::PlaylistId.eq(id))
            .filter(PlaylistTrackColumn::IsDeleted.eq(false))
            .order_by_asc(PlaylistTrackColumn::SortKey)
            .all(self.conn)
            .await
            .map_err(AppError::from_db_err)?;
        Ok(rows.into_iter().map(|r| r.track_id).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_keys_are_lexicographically_ordered() {
        assert!(sort_key_for_index(0) < sort_key_for_index(1));
        assert!(sort_key_for_index(1) < sort_key_for_index(2));
        assert_eq!(sort_key_for_index(0), "a00000000");
        assert_eq!(sort_key_for_index(5), "a00000005");
    }
}
