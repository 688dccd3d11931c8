use chrono::Utc;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::str::FromStr;

use crate::db::entities::connector_track::{
    ActiveModel as ConnectorTrackActiveModel, Column as ConnectorTrackColumn, Entity as ConnectorTrackEntity,
    Model as ConnectorTrackModel,
};
use crate::db::entities::track_mapping::{
    ActiveModel as TrackMappingActiveModel, Column as TrackMappingColumn, Entity as TrackMappingEntity,
    Model as TrackMappingModel,
};
use crate::db::repositories::base::BaseRepository;
use crate::db::repositories::track_core::TrackCoreRepository;
use crate::domain::{ConnectorTrack, MatchMethod, Track, TrackMapping};
use crate::error::{AppError, Result};

/// The entry point for source ingestion and cross-resolution mapping
/// (spec §4.B "Track connector"), grounded on
/// `original_source/narada/repositories/track/connector.py`.
pub struct TrackConnectorRepository<'a, C: ConnectionTrait> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> TrackConnectorRepository<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    /// Finds or creates the `ConnectorTrack`; finds or creates the
    /// canonical `Track`; creates a `direct, confidence=100` mapping
    /// if absent. The single entry point for source ingestion.
    pub async fn ingest_external_track(
        &self,
        connector: &str,
        connector_id: &str,
        metadata: JsonValue,
        title: &str,
        artists: &[crate::domain::Artist],
        album: Option<&str>,
        duration_ms: Option<i64>,
        release_date: Option<chrono::DateTime<Utc>>,
        isrc: Option<&str>,
    ) -> Result<(Track, ConnectorTrack, TrackMapping)> {
        let connector_track = self
            .find_or_create_connector_track(connector, connector_id, &metadata, title, artists, album, duration_ms, release_date, isrc)
            .await?;
        let connector_track_id = connector_track.id.expect("connector track has an id");

        // Step 2: reuse the track already mapped to this ConnectorTrack, if
        // any. save_track's own id/isrc matching can't find this when the
        // incoming track has no isrc, so without this lookup a re-ingest
        // would create a duplicate Track plus a duplicate TrackMapping.
        let existing_mapping = TrackMappingEntity::find()
            .filter(TrackMappingColumn::ConnectorTrackId.eq(connector_track_id))
            .filter(TrackMappingColumn::IsDeleted.eq(false))
            .one(self.conn)
            .await
            .map_err(AppError::from_db_err)?;

        let mut incoming = Track::new(title, artists.to_vec())?;
        if let Some(album) = album {
            incoming = incoming.with_album(album);
        }
        if let Some(duration_ms) = duration_ms {
            incoming = incoming.with_duration_ms(duration_ms);
        }
        if let Some(release_date) = release_date {
            incoming = incoming.with_release_date(release_date);
        }
        if let Some(isrc) = isrc {
            incoming = incoming.with_isrc(isrc);
        }

        let track_repo = TrackCoreRepository::new(self.conn);
        let (track, mapping) = if let Some(existing_mapping) = existing_mapping {
            incoming = incoming.with_id(existing_mapping.track_id);
            let track = track_repo.save_track(&incoming).await?;
            (track, to_domain_mapping(&existing_mapping))
        } else {
            let track = track_repo.save_track(&incoming).await?;
            let track_id = track.id.expect("save_track always binds an id");
            let mapping = self.find_or_create_direct_mapping(track_id, connector_track_id).await?;
            (track, mapping)
        };

        Ok((track, connector_track, mapping))
    }

    /// Entry point for cross-resolution (§4.F). Creates the
    /// `ConnectorTrack` if absent; creates a mapping with the given
    /// `match_method`/`confidence`.
    pub async fn map_track_to_connector(
        &self,
        track_id: i64,
        connector: &str,
        connector_id: &str,
        match_method: MatchMethod,
        confidence: i32,
        metadata: Option<JsonValue>,
        confidence_evidence: Option<JsonValue>,
    ) -> Result<TrackMapping> {
        let connector_track = match self.get_connector_track(connector, connector_id).await {
            Ok(existing) => existing,
            Err(_) => {
                self.find_or_create_connector_track(
                    connector,
                    connector_id,
                    &metadata.clone().unwrap_or(JsonValue::Null),
                    "",
                    &[],
                    None,
                    None,
                    None,
                    None,
                )
                .await?
            }
        };

        let base = BaseRepository::<C, TrackMappingEntity>::new(self.conn);
        let existing = TrackMappingEntity::find()
            .filter(TrackMappingColumn::TrackId.eq(track_id))
            .filter(TrackMappingColumn::ConnectorTrackId.eq(connector_track.id))
            .filter(TrackMappingColumn::IsDeleted.eq(false))
            .one(self.conn)
            .await
            .map_err(AppError::from_db_err)?;

        if let Some(existing) = existing {
            // Invariant 3: match_method/confidence are append-only.
            // Re-observation only refreshes last_verified.
            let mut active: TrackMappingActiveModel = existing.clone().into();
            active.last_verified = Set(Some(Utc::now().into()));
            if let Some(metadata) = metadata {
                active.metadata = Set(Some(metadata));
            }
            let updated = base.update(active).await?;
            return Ok(to_domain_mapping(&updated));
        }

        let now = Utc::now();
        let active = TrackMappingActiveModel {
            track_id: Set(track_id),
            connector_track_id: Set(connector_track.id.unwrap()),
            match_method: Set(match_method.to_string()),
            confidence: Set(confidence.clamp(0, 100)),
            confidence_evidence: Set(confidence_evidence),
            metadata: Set(metadata),
            last_verified: Set(Some(now.into())),
            is_deleted: Set(false),
            deleted_at: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        };
        let created = base.create(active).await?;
        Ok(to_domain_mapping(&created))
    }

    pub async fn get_connector_mappings(
        &self,
        track_ids: &[i64],
        connector: Option<&str>,
    ) -> Result<HashMap<i64, Vec<TrackMapping>>> {
        let mut query = TrackMappingEntity::find()
            .filter(TrackMappingColumn::TrackId.is_in(track_ids.to_vec()))
            .filter(TrackMappingColumn::IsDeleted.eq(false));

        if let Some(connector) = connector {
            let ids: Vec<i64> = ConnectorTrackEntity::find()
                .filter(ConnectorTrackColumn::ConnectorName.eq(connector))
                .all(self.conn)
                .await
                .map_err(AppError::from_db_err)?
                .into_iter()
                .map(|m| m.id)
                .collect();
            query = query.filter(TrackMappingColumn::ConnectorTrackId.is_in(ids));
        }

        let rows = query.all(self.conn).await.map_err(AppError::from_db_err)?;
        let mut out: HashMap<i64, Vec<TrackMapping>> = HashMap::new();
        for row in rows {
            out.entry(row.track_id).or_default().push(to_domain_mapping(&row));
        }
        Ok(out)
    }

    pub async fn get_connector_metadata(
        &self,
        track_ids: &[i64],
        connector: &str,
        field: Option<&str>,
    ) -> Result<HashMap<i64, JsonValue>> {
        let mappings = self.get_connector_mappings(track_ids, Some(connector)).await?;
        let connector_track_ids: Vec<i64> = mappings.values().flatten().map(|m| m.connector_track_id).collect();
        let tracks = ConnectorTrackEntity::find()
            .filter(ConnectorTrackColumn::Id.is_in(connector_track_ids))
            .all(self.conn)
            .await
            .map_err(AppError::from_db_err)?;
        let by_id: HashMap<i64, &ConnectorTrackModel> = tracks.iter().map(|t| (t.id, t)).collect();

        let mut out = HashMap::new();
        for (track_id, track_mappings) in &mappings {
            for mapping in track_mappings {
                if let Some(ct) = by_id.get(&mapping.connector_track_id) {
                    let value = match field {
                        Some(field) => ct.raw_metadata.get(field).cloned().unwrap_or(JsonValue::Null),
                        None => ct.raw_metadata.clone(),
                    };
                    out.insert(*track_id, value);
                }
            }
        }
        Ok(out)
    }

    /// Refreshes `raw_metadata`/`last_updated` on an existing
    /// `ConnectorTrack` row without touching any mapping, for enrichers
    /// that re-fetch a metric for a track they already have identity
    /// for (spec §4.H). No-op if the connector track doesn't exist yet.
    pub async fn update_raw_metadata(&self, connector: &str, connector_id: &str, metadata: JsonValue) -> Result<()> {
        let existing = ConnectorTrackEntity::find()
            .filter(ConnectorTrackColumn::ConnectorName.eq(connector))
            .filter(ConnectorTrackColumn::ConnectorTrackId.eq(connector_id))
            .filter(ConnectorTrackColumn::IsDeleted.eq(false))
            .one(self.conn)
            .await
            .map_err(AppError::from_db_err)?;
        let Some(existing) = existing else { return Ok(()) };
        let now = Utc::now();
        let mut active: ConnectorTrackActiveModel = existing.into();
        active.raw_metadata = Set(metadata);
        active.last_updated = Set(now.into());
        active.updated_at = Set(now.into());
        let base = BaseRepository::<C, ConnectorTrackEntity>::new(self.conn);
        base.update(active).await?;
        Ok(())
    }

    pub async fn find_track_by_connector(&self, connector: &str, connector_id: &str) -> Result<Option<Track>> {
        let Some(connector_track) = self.get_connector_track(connector, connector_id).await.ok() else {
            return Ok(None);
        };
        let mapping = TrackMappingEntity::find()
            .filter(TrackMappingColumn::ConnectorTrackId.eq(connector_track.id))
            .filter(TrackMappingColumn::IsDeleted.eq(false))
            .one(self.conn)
            .await
            .map_err(AppError::from_db_err)?;
        let Some(mapping) = mapping else { return Ok(None) };
        let track_repo = BaseRepository::<C, crate::db::entities::track::Entity>::new(self.conn);
        let track = track_repo.get_by_id(mapping.track_id).await?;
        Ok(track.map(|m| crate::db::repositories::track_core::mapper::to_domain(&m)))
    }

    pub async fn save_mapping_confidence(&self, mapping_id: i64, confidence: i32) -> Result<TrackMapping> {
        let base = BaseRepository::<C, TrackMappingEntity>::new(self.conn);
        let existing = base
            .get_by_id(mapping_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("track mapping {mapping_id}")))?;
        let mut active: TrackMappingActiveModel = existing.into();
        active.confidence = Set(confidence.clamp(0, 100));
        active.updated_at = Set(Utc::now().into());
        let updated = base.update(active).await?;
        Ok(to_domain_mapping(&updated))
    }

    pub async fn get_mapping_info(&self, track_id: i64, connector: &str) -> Result<Option<TrackMapping>> {
        let mappings = self.get_connector_mappings(&[track_id], Some(connector)).await?;
        Ok(mappings.get(&track_id).and_then(|v| v.first().cloned()))
    }

    async fn get_connector_track(&self, connector: &str, connector_id: &str) -> Result<ConnectorTrack> {
        let model = ConnectorTrackEntity::find()
            .filter(ConnectorTrackColumn::ConnectorName.eq(connector))
            .filter(ConnectorTrackColumn::ConnectorTrackId.eq(connector_id))
            .filter(ConnectorTrackColumn::IsDeleted.eq(false))
            .one(self.conn)
            .await
            .map_err(AppError::from_db_err)?
            .ok_or_else(|| AppError::not_found(format!("connector track {connector}/{connector_id}")))?;
        Ok(to_domain_connector_track(&model))
    }

    #[allow(clippy::too_many_arguments)]
    async fn find_or_create_connector_track(
        &self,
        connector: &str,
        connector_id: &str,
        metadata: &JsonValue,
        title: &str,
        artists: &[crate::domain::Artist],
        album: Option<&str>,
        duration_ms: Option<i64>,
        release_date: Option<chrono::DateTime<Utc>>,
        isrc: Option<&str>,
    ) -> Result<ConnectorTrack> {
        let base = BaseRepository::<C, ConnectorTrackEntity>::new(self.conn);
        let existing = ConnectorTrackEntity::find()
            .filter(ConnectorTrackColumn::ConnectorName.eq(connector))
            .filter(ConnectorTrackColumn::ConnectorTrackId.eq(connector_id))
            .filter(ConnectorTrackColumn::IsDeleted.eq(false))
            .one(self.conn)
            .await
            .map_err(AppError::from_db_err)?;

        let now = Utc::now();
        if let Some(existing) = existing {
            // Refresh raw_metadata and last_updated on re-observation.
            let mut active: ConnectorTrackActiveModel = existing.into();
            active.raw_metadata = Set(metadata.clone());
            active.last_updated = Set(now.into());
            active.updated_at = Set(now.into());
            let updated = base.update(active).await?;
            return Ok(to_domain_connector_track(&updated));
        }

        let active = ConnectorTrackActiveModel {
            connector_name: Set(connector.to_string()),
            connector_track_id: Set(connector_id.to_string()),
            title: Set(title.to_string()),
            artists: Set(serde_json::to_value(artists).unwrap_or_default()),
            album: Set(album.map(str::to_string)),
            duration_ms: Set(duration_ms.map(|d| d as i32)),
            release_date: Set(release_date.map(Into::into)),
            isrc: Set(isrc.map(str::to_string)),
            raw_metadata: Set(metadata.clone()),
            last_updated: Set(now.into()),
            is_deleted: Set(false),
            deleted_at: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        };
        let created = base.create(active).await?;
        Ok(to_domain_connector_track(&created))
    }

    async fn find_or_create_direct_mapping(&self, track_id: i64, connector_track_id: i64) -> Result<TrackMapping> {
        let base = BaseRepository::<C, TrackMappingEntity>::new(self.conn);
        let existing = TrackMappingEntity::find()
            .filter(TrackMappingColumn::TrackId.eq(track_id))
            .filter(TrackMappingColumn::ConnectorTrackId.eq(connector_track_id))
            .filter(TrackMappingColumn::IsDeleted.eq(false))
            .one(self.conn)
            .await
            .map_err(AppError::from_db_err)?;
        if let Some(existing) = existing {
            return Ok(to_domain_mapping(&existing));
        }
        let now = Utc::now();
        let active = TrackMappingActiveModel {
            track_id: Set(track_id),
            connector_track_id: Set(connector_track_id),
            match_method: Set(MatchMethod::Direct.to_string()),
            confidence: Set(100),
            confidence_evidence: Set(None),
            metadata: Set(None),
            last_verified: Set(Some(now.into())),
            is_deleted: Set(false),
            deleted_at: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        };
        let created = base.create(active).await?;
        Ok(to_domain_mapping(&created))
    }
}

fn to_domain_mapping(model: &TrackMappingModel) -> TrackMapping {
    TrackMapping {
        id: Some(model.id),
        track_id: model.track_id,
        connector_track_id: model.connector_track_id,
        match_method: MatchMethod::from_str(&model.match_method).unwrap_or(MatchMethod::Direct),
        confidence: model.confidence,
        confidence_evidence: model.confidence_evidence.clone(),
        metadata: model.metadata.clone(),
        last_verified: model.last_verified.map(|d| d.with_timezone(&Utc)),
    }
}

fn to_domain_connector_track(model: &ConnectorTrackModel) -> ConnectorTrack {
    ConnectorTrack {
        id: Some(model.id),
        connector_name: model.connector_name.clone(),
        connector_track_id: model.connector_track_id.clone(),
        title: model.title.clone(),
        artists: serde_json::from_value(model.artists.clone()).unwrap_or_default(),
        album: model.album.clone(),
        duration_ms: model.duration_ms.map(i64::from),
        release_date: model.release_date.map(|d| d.with_timezone(&Utc)),
        isrc: model.isrc.clone(),
        raw_metadata: model.raw_metadata.clone(),
        last_updated: model.last_updated.with_timezone(&Utc),
    }
}
