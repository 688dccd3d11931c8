//! Last.fm play-history import (spec §4.J), grounded on the same
//! checkpoint-per-batch shape as `sync::likes` but paginated by page
//! number rather than a connector-issued cursor, since Last.fm's
//! `user.getRecentTracks` takes a plain page index.

use crate::connectors::lastfm::RecentTrack;
use crate::db::repositories::{SyncCheckpointRepository, TrackConnectorRepository, TrackCoreRepository, TrackPlayRepository};
use crate::domain::{Artist, EntityType, MatchMethod, SyncCheckpoint, SyncStats, Track, TrackPlay};
use crate::error::Result;
use crate::matcher::CONFIDENCE_MBID;
use crate::sync::stats::{tally, Outcome};
use crate::workflows::services::Services;

const LASTFM_SERVICE: &str = "lastfm";
const SCROBBLES_PER_PAGE: u32 = 200;

/// Imports `username`'s Last.fm scrobble history page by page, resuming
/// from `user_id`'s stored checkpoint (`last_timestamp` bounds the
/// `from` window, `cursor` holds the next page number as a string) and
/// checkpointing after every page. `max_pages` bounds a single call so
/// a very long history is imported incrementally across repeated runs.
pub async fn import_play_history_from_lastfm(user_id: &str, username: Option<&str>, max_pages: Option<u32>) -> Result<SyncStats> {
    let services = Services::global();
    let mut stats = SyncStats::default();
    let conn = services.sessions.connection();
    let checkpoint_repo = SyncCheckpointRepository::new(conn);

    let existing = checkpoint_repo.get(user_id, LASTFM_SERVICE, &EntityType::Plays).await?;
    // Last.fm's `from` bound is inclusive; step one second past the last
    // recorded scrobble so it isn't re-fetched and re-recorded every resume.
    let from_time = existing.as_ref().and_then(|c| c.last_timestamp).map(|ts| ts + chrono::Duration::seconds(1));
    let mut page: u32 = existing.as_ref().and_then(|c| c.cursor.as_ref()).and_then(|c| c.parse().ok()).unwrap_or(1);
    let mut pages_fetched = 0u32;

    loop {
        let scrobbles = services.lastfm.get_recent_tracks(username, SCROBBLES_PER_PAGE, page, from_time, None).await?;
        if scrobbles.is_empty() {
            break;
        }

        let latest_scrobbled_at = scrobbles.iter().map(|t| t.scrobbled_at).max();
        let results = services
            .batch
            .process("sync.plays.lastfm", scrobbles, |scrobble: RecentTrack| async move { import_one(&scrobble).await }, None)
            .await;

        let imported = tally(&mut stats, results, |_| Outcome::Imported);
        let _ = imported;

        page += 1;
        pages_fetched += 1;

        let mut checkpoint = SyncCheckpoint::new(user_id, LASTFM_SERVICE, EntityType::Plays).with_cursor(page.to_string());
        if let Some(ts) = latest_scrobbled_at.or(from_time) {
            checkpoint = checkpoint.with_last_timestamp(ts);
        }
        checkpoint_repo.upsert(&checkpoint).await?;

        if max_pages.map(|max| pages_fetched >= max).unwrap_or(false) {
            break;
        }
    }

    Ok(stats)
}

async fn import_one(scrobble: &RecentTrack) -> Result<TrackPlay> {
    let services = Services::global();
    let scrobble = scrobble.clone();
    let conn = services.sessions.connection();
    let connector_repo = TrackConnectorRepository::new(conn);

    let track_id = if let Some(mbid) = &scrobble.mbid {
        match connector_repo.find_track_by_connector("musicbrainz", mbid).await? {
            Some(track) => track.id.expect("a persisted track always has an id"),
            None => create_fallback_track(conn, &connector_repo, &scrobble, Some(mbid.as_str())).await?,
        }
    } else {
        create_fallback_track(conn, &connector_repo, &scrobble, None).await?
    };

    TrackPlayRepository::new(conn).record_play(&scrobble.clone().into_track_play(track_id)).await
}

/// Scrobbles with no existing mapping are persisted as a minimally
/// constructed track rather than dropped, accepting a risk of
/// duplicate rows until title-based dedup exists (see DESIGN.md).
async fn create_fallback_track<C: sea_orm::ConnectionTrait>(
    conn: &C,
    connector_repo: &TrackConnectorRepository<'_, C>,
    scrobble: &RecentTrack,
    mbid: Option<&str>,
) -> Result<i64> {
    let artist = Artist::new(scrobble.artist_name.clone())?;
    let mut track = Track::new(scrobble.track_name.clone(), vec![artist])?;
    if let Some(album) = &scrobble.album_name {
        track = track.with_album(album.clone());
    }
    let track = TrackCoreRepository::new(conn).save_track(&track).await?;
    let track_id = track.id.expect("save_track always binds an id");
    if let Some(mbid) = mbid {
        connector_repo.map_track_to_connector(track_id, "musicbrainz", mbid, MatchMethod::Mbid, CONFIDENCE_MBID, None, None).await?;
    }
    Ok(track_id)
}
