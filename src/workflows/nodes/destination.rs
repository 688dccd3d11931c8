//! Destination node factory (spec §4.H): writes a tracklist out, either
//! to the internal store only or through a connector that also owns a
//! playlist concept (`create_spotify`/`update_spotify`).

use futures::future::BoxFuture;
use serde_json::json;

use crate::connectors::{Connector, PlaylistWriteMode};
use crate::db::repositories::PlaylistRepository;
use crate::domain::Playlist;
use crate::error::{AppError, Result};
use crate::workflows::context::{Context, Value};
use crate::workflows::nodes::{config_object, optional_str, primary_input, require_str};
use crate::workflows::services::Services;

pub fn create_internal(ctx: &Context, config: &Value) -> BoxFuture<'static, Result<Value>> {
    let ctx = ctx.clone();
    let config = config.clone();
    Box::pin(async move { create_internal_impl(ctx, config).await })
}

pub fn create_spotify(ctx: &Context, config: &Value) -> BoxFuture<'static, Result<Value>> {
    let ctx = ctx.clone();
    let config = config.clone();
    Box::pin(async move { create_spotify_impl(ctx, config).await })
}

pub fn update_spotify(ctx: &Context, config: &Value) -> BoxFuture<'static, Result<Value>> {
    let ctx = ctx.clone();
    let config = config.clone();
    Box::pin(async move { update_spotify_impl(ctx, config).await })
}

async fn create_internal_impl(ctx: Context, config: Value) -> Result<Value> {
    let fields = config_object(&config)?;
    let input = primary_input(&ctx, fields)?;
    let name = require_str(fields, "name")?;
    let description = optional_str(fields, "description");

    let mut playlist = Playlist::new(name)?.with_tracks(input.tracks);
    if let Some(description) = description {
        playlist = playlist.with_description(description);
    }

    let services = Services::global();
    let saved = services
        .sessions
        .with_transaction(|txn| async move {
            let saved = PlaylistRepository::new(&txn).save_playlist(&playlist).await?;
            Ok((txn, saved))
        })
        .await?;

    Ok(destination_result("destination", saved))
}

async fn create_spotify_impl(ctx: Context, config: Value) -> Result<Value> {
    let fields = config_object(&config)?;
    let input = primary_input(&ctx, fields)?;
    let name = require_str(fields, "name")?;
    let description = optional_str(fields, "description");
    let access_token = require_str(fields, "access_token")?;
    let user_id = optional_str(fields, "user_id");

    let mut draft = Playlist::new(name)?.with_tracks(input.tracks);
    if let Some(description) = description {
        draft = draft.with_description(description);
    }

    let services = Services::global();
    let external_id = services.spotify.create_playlist(access_token, &draft, user_id).await?;
    let to_save = draft.with_connector_playlist_id("spotify", external_id);

    let saved = services
        .sessions
        .with_transaction(|txn| async move {
            let saved = PlaylistRepository::new(&txn).save_playlist(&to_save).await?;
            Ok((txn, saved))
        })
        .await?;

    Ok(destination_result("destination", saved))
}

async fn update_spotify_impl(ctx: Context, config: Value) -> Result<Value> {
    let fields = config_object(&config)?;
    let input = primary_input(&ctx, fields)?;
    let playlist_id = fields
        .get("playlist_id")
        .and_then(serde_json::Value::as_i64)
        .ok_or_else(|| AppError::validation("config field 'playlist_id' must be an integer"))?;
    let access_token = require_str(fields, "access_token")?;
    let mode = match optional_str(fields, "mode").unwrap_or("replace") {
        "replace" => PlaylistWriteMode::Replace,
        "append" => PlaylistWriteMode::Append,
        other => return Err(AppError::validation(format!("unknown playlist write mode '{other}'"))),
    };

    let services = Services::global();
    let conn = services.sessions.connection();
    let stored = PlaylistRepository::new(conn)
        .get_playlist(playlist_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("playlist {playlist_id}")))?;
    let external_id = stored
        .connector_playlist_ids
        .get("spotify")
        .cloned()
        .ok_or_else(|| AppError::dependency("destination.update_spotify", "stored playlist has no spotify mapping"))?;

    let to_write = stored.with_tracks(input.tracks);
    services.spotify.update_playlist(access_token, &external_id, &to_write, mode).await?;

    let saved = services
        .sessions
        .with_transaction(|txn| async move {
            let saved = PlaylistRepository::new(&txn).update_playlist(playlist_id, &to_write).await?;
            Ok((txn, saved))
        })
        .await?;

    Ok(destination_result("destination", saved))
}

fn destination_result(operation: &str, playlist: Playlist) -> Value {
    Value::object([
        ("operation".to_string(), Value::Json(json!(operation))),
        ("playlist_id".to_string(), Value::Json(json!(playlist.id))),
        ("tracks_count".to_string(), Value::Json(json!(playlist.tracks.len()))),
    ])
}
