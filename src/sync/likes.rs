//! Spotify-likes import (spec §4.J), grounded on
//! `original_source/narada/services/like_sync.py`'s checkpoint-per-batch
//! resumable loop. Driven by the shared batch processor so rate
//! limiting and per-item error containment are inherited rather than
//! reimplemented here.

use crate::connectors::spotify::SpotifyLikedTrack;
use crate::db::repositories::{SyncCheckpointRepository, TrackConnectorRepository, TrackLikeRepository};
use crate::domain::{EntityType, SyncCheckpoint, SyncStats, TrackLike};
use crate::error::{AppError, Result};
use crate::sync::stats::{tally, Outcome};
use crate::workflows::services::Services;

const CANONICAL_SERVICE: &str = "internal";
const SPOTIFY_SERVICE: &str = "spotify";

/// Imports `access_token`'s owner's Spotify-liked tracks page by page,
/// resuming from `user_id`'s stored cursor (the previous call's Spotify
/// `next` URL) and checkpointing after every page. `max_imports` caps
/// the total number of tracks imported across the whole call, not per
/// page.
pub async fn import_likes_from_spotify(user_id: &str, access_token: &str, max_imports: Option<usize>) -> Result<SyncStats> {
    let services = Services::global();
    let mut stats = SyncStats::default();
    let conn = services.sessions.connection();
    let checkpoint_repo = SyncCheckpointRepository::new(conn);

    let mut cursor = checkpoint_repo.get(user_id, SPOTIFY_SERVICE, &EntityType::Likes).await?.and_then(|c| c.cursor);
    let mut imported_so_far = 0usize;

    loop {
        let (mut page, next) = services.spotify.get_saved_tracks_page(access_token, cursor.as_deref()).await?;
        if page.is_empty() {
            break;
        }
        if let Some(max) = max_imports {
            let budget = max.saturating_sub(imported_so_far);
            page.truncate(budget);
        }
        if page.is_empty() {
            break;
        }

        let latest_added_at = page.iter().map(|t| t.added_at).max();
        let results = services
            .batch
            .process("sync.likes.spotify", page, |liked: SpotifyLikedTrack| async move { import_one(&liked).await }, None)
            .await;

        let imported = tally(&mut stats, results, |_| Outcome::Imported);
        imported_so_far += imported.len();

        let mut checkpoint = SyncCheckpoint::new(user_id, SPOTIFY_SERVICE, EntityType::Likes);
        if let Some(ts) = latest_added_at {
            checkpoint = checkpoint.with_last_timestamp(ts);
        }
        if let Some(cursor) = &next {
            checkpoint = checkpoint.with_cursor(cursor.clone());
        }
        checkpoint_repo.upsert(&checkpoint).await?;

        let hit_budget = max_imports.map(|max| imported_so_far >= max).unwrap_or(false);
        if next.is_none() || hit_budget {
            break;
        }
        cursor = next;
    }

    Ok(stats)
}

async fn import_one(liked: &SpotifyLikedTrack) -> Result<i64> {
    let services = Services::global();
    let track = liked.track.clone();
    let added_at = liked.added_at;

    services
        .sessions
        .with_transaction(move |txn| async move {
            let connector_repo = TrackConnectorRepository::new(&txn);
            let connector_id = track.spotify_id().map(str::to_string).ok_or_else(|| AppError::validation("liked track has no spotify id"))?;
            let metadata = serde_json::to_value(track.connector_metadata.get("spotify").cloned().unwrap_or_default()).unwrap_or(serde_json::Value::Null);
            let (persisted, _connector_track, _mapping) = connector_repo
                .ingest_external_track(
                    SPOTIFY_SERVICE,
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
            let track_id = persisted.id.expect("save_track always binds an id");

            let like_repo = TrackLikeRepository::new(&txn);
            like_repo.upsert_like(&TrackLike::new(track_id, SPOTIFY_SERVICE, true).with_liked_at(added_at)).await?;
            like_repo.upsert_like(&TrackLike::new(track_id, CANONICAL_SERVICE, true).with_liked_at(added_at)).await?;

            Ok((txn, track_id))
        })
        .await
}
