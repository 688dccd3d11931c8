//! Last.fm loves export (spec §4.J): syncs tracks liked in the
//! canonical store but not yet loved on Last.fm, grounded on the same
//! checkpoint-per-batch shape as `sync::likes`.

use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;

use crate::db::repositories::{SyncCheckpointRepository, TrackCoreRepository, TrackLikeRepository};
use crate::domain::{EntityType, SyncCheckpoint, SyncStats, Track, TrackLike};
use crate::error::{AppError, Result};
use crate::matcher;
use crate::sync::stats::{tally, Outcome};
use crate::workflows::services::Services;

const CANONICAL_SERVICE: &str = "internal";
const LASTFM_SERVICE: &str = "lastfm";

/// Identity lookups the matcher performs on behalf of a love-export are
/// cheap and authoritative once made; this mirrors `enricher::lastfm`'s
/// own freshness window for the same reason.
const IDENTITY_FRESHNESS_HOURS: i64 = 24 * 30;

/// Exports every canonical-store like with no matching Last.fm love yet
/// to Last.fm, one `track.love` call per track, via the batch
/// processor.
pub async fn export_loves_to_lastfm(user_id: &str) -> Result<SyncStats> {
    let services = Services::global();
    let mut stats = SyncStats::default();
    let conn = services.sessions.connection();

    let unsynced = TrackLikeRepository::new(conn).find_unsynced(CANONICAL_SERVICE, LASTFM_SERVICE).await?;
    if unsynced.is_empty() {
        return Ok(stats);
    }

    let track_ids: Vec<i64> = unsynced.iter().map(|l| l.track_id).collect();
    let tracks = Arc::new(TrackCoreRepository::new(conn).get_tracks_by_ids(&track_ids).await?);

    let results = services
        .batch
        .process(
            "sync.loves.lastfm",
            unsynced,
            {
                let tracks = Arc::clone(&tracks);
                move |like: TrackLike| {
                    let tracks = Arc::clone(&tracks);
                    async move { export_one(like, tracks).await }
                }
            },
            None,
        )
        .await;

    let exported = tally(&mut stats, results, |_| Outcome::Exported);
    if let Some(latest) = exported.iter().filter_map(|l: &TrackLike| l.last_synced).max() {
        let checkpoint = SyncCheckpoint::new(user_id, LASTFM_SERVICE, EntityType::Likes).with_last_timestamp(latest);
        SyncCheckpointRepository::new(conn).upsert(&checkpoint).await?;
    }

    Ok(stats)
}

async fn export_one(like: TrackLike, tracks: Arc<HashMap<i64, Track>>) -> Result<TrackLike> {
    let services = Services::global();
    let track = tracks
        .get(&like.track_id)
        .cloned()
        .ok_or_else(|| AppError::not_found(format!("track {}", like.track_id)))?;

    let matched = {
        let services = services.clone();
        let track = track.clone();
        services
            .sessions
            .with_transaction(move |txn| async move {
                let results = matcher::batch_match_tracks(&txn, &services.musicbrainz, &services.lastfm, std::slice::from_ref(&track), IDENTITY_FRESHNESS_HOURS).await?;
                Ok((txn, results))
            })
            .await?
    };

    let resolved = matched.get(&like.track_id).filter(|m| m.success);
    if resolved.is_none() {
        return Err(AppError::dependency("sync.loves.lastfm", format!("could not resolve track {} on last.fm", like.track_id)));
    }

    let artist_name = track.artists.first().map(|a| a.name.as_str()).unwrap_or_default();
    services.lastfm.love_track(artist_name, &track.title).await?;

    let conn = services.sessions.connection();
    TrackLikeRepository::new(conn)
        .upsert_like(&TrackLike::new(like.track_id, LASTFM_SERVICE, true).with_last_synced(Utc::now()))
        .await
}
