//! Source node factory (spec §4.H), grounded on the teacher's
//! `tasks::spotify_sync` fetch-then-persist shape and
//! `original_source/narada/workflows/source_nodes.py`'s
//! all-tracks-must-have-ids guarantee.

use futures::future::BoxFuture;
use serde_json::json;

use crate::connectors::Connector;
use crate::db::repositories::{PlaylistRepository, TrackConnectorRepository};
use crate::domain::TrackList;
use crate::error::{AppError, Result};
use crate::workflows::context::{Context, Value};
use crate::workflows::nodes::{config_object, require_str};
use crate::workflows::services::Services;

pub fn spotify_playlist(_ctx: &Context, config: &Value) -> BoxFuture<'static, Result<Value>> {
    let config = config.clone();
    Box::pin(async move { spotify_playlist_impl(config).await })
}

async fn spotify_playlist_impl(config: Value) -> Result<Value> {
    let fields = config_object(&config)?;
    let access_token = require_str(fields, "access_token")?;
    let playlist_id = require_str(fields, "playlist_id")?;

    let services = Services::global();
    let fetched = services.spotify.get_playlist(access_token, playlist_id).await?;

    let saved = services
        .sessions
        .with_transaction(|txn| async move {
            let connector_repo = TrackConnectorRepository::new(&txn);
            let mut persisted_tracks = Vec::with_capacity(fetched.tracks.len());
            for track in &fetched.tracks {
                let connector_id = track
                    .spotify_id()
                    .ok_or_else(|| AppError::dependency("source.spotify_playlist", "fetched track has no spotify id"))?;
                let metadata = serde_json::to_value(track.connector_metadata.get("spotify").cloned().unwrap_or_default())
                    .unwrap_or(serde_json::Value::Null);
                let (persisted, _connector_track, _mapping) = connector_repo
                    .ingest_external_track(
                        "spotify",
                        connector_id,
                        metadata,
                        &track.title,
                        &track.artists,
                        track.album.as_deref(),
                        track.duration_ms,
                        track.release_date,
                        track.isrc.as_deref(),
                    )
                    .await?;
                persisted_tracks.push(persisted);
            }

            if persisted_tracks.iter().any(|t| t.id.is_none()) {
                return Err(AppError::dependency("source.spotify_playlist", "a track lacks a persisted id after ingestion"));
            }

            let to_save = fetched.with_tracks(persisted_tracks);
            let playlist_repo = PlaylistRepository::new(&txn);
            let saved = playlist_repo.save_playlist(&to_save).await?;
            Ok((txn, saved))
        })
        .await?;

    let tracklist = TrackList::from_playlist(&saved);
    Ok(Value::object([
        ("tracklist".to_string(), Value::TrackList(tracklist.clone())),
        ("operation".to_string(), Value::Json(json!("source"))),
        ("tracks_count".to_string(), Value::Json(json!(tracklist.len()))),
        ("playlist_id".to_string(), Value::Json(json!(saved.id))),
    ]))
}
