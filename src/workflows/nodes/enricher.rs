//! Enricher node factory (spec §4.H): resolves cross-service identity
//! via the matcher (§4.F) for tracks that need it, refreshes stale
//! metric data from the connector, then resolves the requested metrics
//! (§4.E) and writes them back onto the tracklist.

use futures::future::BoxFuture;
use serde_json::json;
use std::collections::HashMap;

use crate::domain::TrackList;
use crate::error::{AppError, Result};
use crate::matcher;
use crate::metrics::registry::freshness_hours;
use crate::metrics::resolver;
use crate::workflows::context::{Context, Value};
use crate::workflows::nodes::{config_object, optional_str, primary_input, str_array};
use crate::workflows::services::Services;

/// TTL for the matcher's own cached-identity check; identity rarely
/// changes once established, so this is far looser than any metric's
/// freshness window.
const IDENTITY_FRESHNESS_HOURS: i64 = 24 * 30;

pub fn lastfm(ctx: &Context, config: &Value) -> BoxFuture<'static, Result<Value>> {
    let ctx = ctx.clone();
    let config = config.clone();
    Box::pin(async move { lastfm_impl(ctx, config).await })
}

pub fn spotify(ctx: &Context, config: &Value) -> BoxFuture<'static, Result<Value>> {
    let ctx = ctx.clone();
    let config = config.clone();
    Box::pin(async move { spotify_impl(ctx, config).await })
}

async fn lastfm_impl(ctx: Context, config: Value) -> Result<Value> {
    let fields = config_object(&config)?;
    let input = primary_input(&ctx, fields)?;
    let attributes = str_array(fields, "attributes");
    if attributes.is_empty() {
        return Err(AppError::validation("enricher.lastfm requires a non-empty 'attributes' list"));
    }
    let lastfm_username = optional_str(fields, "lastfm_username").map(str::to_string);

    let services = Services::global();
    let unmatched: Vec<_> = input.tracks.iter().filter(|t| !t.connector_track_ids.contains_key("lastfm")).cloned().collect();

    {
        let services = services.clone();
        services
            .sessions
            .with_transaction(move |txn| async move {
                if !unmatched.is_empty() {
                    matcher::batch_match_tracks(&txn, &services.musicbrainz, &services.lastfm, &unmatched, IDENTITY_FRESHNESS_HOURS).await?;
                }
                Ok((txn, ()))
            })
            .await?;
    }

    // Re-read tracks after the matcher transaction: newly matched ones
    // now carry a `connector_track_ids["lastfm"]` set only in the DB,
    // not on these in-memory `Track` values, but the stale-metric pass
    // below only needs track ids, not the lastfm identity itself (the
    // connector re-resolves by mbid/artist-title, same as the matcher).
    let with_identity = &input.tracks;
    let track_ids: Vec<i64> = with_identity.iter().filter_map(|t| t.id).collect();
    let headline_metric = "lastfm_user_playcount";
    let freshness = freshness_hours(headline_metric);
    let conn = services.sessions.connection();
    let metrics_repo = crate::db::repositories::TrackMetricsRepository::new(conn);
    let cached = metrics_repo.get_track_metrics(&track_ids, headline_metric, "lastfm", Some(freshness)).await?;
    let stale_ids: Vec<i64> = track_ids.iter().copied().filter(|id| !cached.contains_key(id)).collect();

    if !stale_ids.is_empty() {
        let stale_tracks: Vec<_> = with_identity.iter().filter(|t| t.id.map(|id| stale_ids.contains(&id)).unwrap_or(false)).cloned().collect();
        let fetched = services.lastfm.batch_get_track_info(&stale_tracks, lastfm_username.as_deref()).await?;
        let connector_repo = crate::db::repositories::TrackConnectorRepository::new(conn);
        let mut to_persist = Vec::new();
        for (track_id, info) in &fetched {
            let Some(url) = &info.lastfm_url else { continue };
            let metadata = json!({
                "lastfm_user_playcount": info.lastfm_user_playcount,
                "lastfm_global_playcount": info.lastfm_global_playcount,
                "lastfm_listeners": info.lastfm_listeners,
            });
            connector_repo.update_raw_metadata("lastfm", url, metadata).await?;
            if let Some(v) = info.lastfm_user_playcount {
                to_persist.push((*track_id, "lastfm".to_string(), "lastfm_user_playcount".to_string(), v as f64));
            }
            if let Some(v) = info.lastfm_global_playcount {
                to_persist.push((*track_id, "lastfm".to_string(), "lastfm_global_playcount".to_string(), v as f64));
            }
            if let Some(v) = info.lastfm_listeners {
                to_persist.push((*track_id, "lastfm".to_string(), "lastfm_listeners".to_string(), v as f64));
            }
        }
        if !to_persist.is_empty() {
            metrics_repo.save_track_metrics(&to_persist).await?;
        }
    }

    apply_metrics(input, &attributes, &track_ids).await
}

async fn spotify_impl(ctx: Context, config: Value) -> Result<Value> {
    let fields = config_object(&config)?;
    let input = primary_input(&ctx, fields)?;
    let attributes = str_array(fields, "attributes");
    if attributes.is_empty() {
        return Err(AppError::validation("enricher.spotify requires a non-empty 'attributes' list"));
    }
    let access_token = optional_str(fields, "access_token").map(str::to_string);

    let services = Services::global();
    let track_ids: Vec<i64> = input.tracks.iter().filter_map(|t| t.id).collect();
    let freshness = freshness_hours("spotify_popularity");
    let conn = services.sessions.connection();
    let metrics_repo = crate::db::repositories::TrackMetricsRepository::new(conn);
    let cached = metrics_repo.get_track_metrics(&track_ids, "spotify_popularity", "spotify", Some(freshness)).await?;
    let stale: Vec<_> = input
        .tracks
        .iter()
        .filter(|t| t.id.map(|id| !cached.contains_key(&id)).unwrap_or(false))
        .filter_map(|t| t.spotify_id().map(str::to_string).zip(t.id))
        .collect();

    if !stale.is_empty() {
        let access_token = access_token.ok_or_else(|| AppError::validation("enricher.spotify requires 'access_token' to refresh stale metrics"))?;
        let spotify_ids: Vec<String> = stale.iter().map(|(sid, _)| sid.clone()).collect();
        let popularity = services.spotify.batch_get_track_popularity(&access_token, &spotify_ids).await?;
        let connector_repo = crate::db::repositories::TrackConnectorRepository::new(conn);
        let mut to_persist = Vec::new();
        for (spotify_id, track_id) in &stale {
            if let Some(value) = popularity.get(spotify_id) {
                connector_repo.update_raw_metadata("spotify", spotify_id, json!({ "spotify_popularity": value })).await?;
                to_persist.push((*track_id, "spotify".to_string(), "spotify_popularity".to_string(), *value as f64));
            }
        }
        if !to_persist.is_empty() {
            metrics_repo.save_track_metrics(&to_persist).await?;
        }
    }

    apply_metrics(input, &attributes, &track_ids).await
}

async fn apply_metrics(input: TrackList, attributes: &[String], track_ids: &[i64]) -> Result<Value> {
    let services = Services::global();
    let conn = services.sessions.connection();
    let mut tracklist = input;
    let mut metrics_out = HashMap::new();
    for metric_name in attributes {
        let values = resolver::resolve(conn, metric_name, track_ids).await?;
        let as_optional: HashMap<i64, Option<f64>> = values.iter().map(|(id, v)| (*id, Some(*v))).collect();
        tracklist.set_metric_map(metric_name, &as_optional);
        metrics_out.insert(metric_name.clone(), values);
    }

    Ok(Value::object([
        ("tracklist".to_string(), Value::TrackList(tracklist.clone())),
        ("operation".to_string(), Value::Json(json!("enrich"))),
        ("tracks_count".to_string(), Value::Json(json!(tracklist.len()))),
        ("metrics".to_string(), Value::Json(serde_json::to_value(metrics_out).unwrap_or(serde_json::Value::Null))),
    ]))
}
