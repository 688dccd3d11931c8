//! Integration tests exercising repositories against a real (in-memory)
//! SQLite database, grounded on the teacher's own database-integration
//! test style (`tests/database_tests.rs`), rewritten for narada's
//! schema.

use chrono::Utc;

use narada::db::repositories::{SyncCheckpointRepository, TrackConnectorRepository, TrackCoreRepository, TrackLikeRepository, TrackPlayRepository};
use narada::domain::{EntityType, MatchMethod, SyncCheckpoint, TrackLike, TrackPlay};
use narada::test_utils::{insert_test_connector_track, insert_test_track, setup_test_db};

#[tokio::test]
async fn save_track_then_get_tracks_by_ids_round_trips() {
    let db = setup_test_db().await;
    let track = insert_test_track(&db, "Komm, susser Tod", "Frank Sinatra").await;
    let id = track.id.expect("saved track has an id");

    let fetched = TrackCoreRepository::new(&db).get_tracks_by_ids(&[id]).await.unwrap();
    assert_eq!(fetched.get(&id).map(|t| t.title.as_str()), Some("Komm, susser Tod"));
}

#[tokio::test]
async fn ingest_external_track_is_idempotent_on_connector_id() {
    let db = setup_test_db().await;
    let connector_repo = TrackConnectorRepository::new(&db);
    let artists = vec![narada::domain::Artist::new("Radiohead").unwrap()];

    let (first, _, _) = connector_repo
        .ingest_external_track("spotify", "abc123", serde_json::Value::Null, "Paranoid Android", &artists, None, None, None, None)
        .await
        .unwrap();
    let (second, _, _) = connector_repo
        .ingest_external_track("spotify", "abc123", serde_json::Value::Null, "Paranoid Android", &artists, None, None, None, None)
        .await
        .unwrap();

    assert_eq!(first.id, second.id);
}

#[tokio::test]
async fn find_track_by_connector_resolves_a_previously_ingested_track() {
    let db = setup_test_db().await;
    let track = insert_test_connector_track(&db, "musicbrainz", "mbid-1", "Karma Police", "Radiohead").await.unwrap();

    let found = TrackConnectorRepository::new(&db).find_track_by_connector("musicbrainz", "mbid-1").await.unwrap();
    assert_eq!(found.and_then(|t| t.id), track.id);
}

#[tokio::test]
async fn map_track_to_connector_is_append_only_on_reobservation() {
    let db = setup_test_db().await;
    let track = insert_test_track(&db, "Idioteque", "Radiohead").await;
    let track_id = track.id.unwrap();
    let connector_repo = TrackConnectorRepository::new(&db);

    let first = connector_repo.map_track_to_connector(track_id, "lastfm", "lastfm-url-1", MatchMethod::ArtistTitle, 80, None, None).await.unwrap();
    let second = connector_repo.map_track_to_connector(track_id, "lastfm", "lastfm-url-1", MatchMethod::ArtistTitle, 80, None, None).await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.match_method, MatchMethod::ArtistTitle);
}

#[tokio::test]
async fn find_unsynced_excludes_likes_already_present_on_the_target() {
    let db = setup_test_db().await;
    let track_a = insert_test_track(&db, "Track A", "Artist").await;
    let track_b = insert_test_track(&db, "Track B", "Artist").await;
    let like_repo = TrackLikeRepository::new(&db);

    like_repo.upsert_like(&TrackLike::new(track_a.id.unwrap(), "internal", true)).await.unwrap();
    like_repo.upsert_like(&TrackLike::new(track_b.id.unwrap(), "internal", true)).await.unwrap();
    like_repo.upsert_like(&TrackLike::new(track_b.id.unwrap(), "lastfm", true)).await.unwrap();

    let unsynced = like_repo.find_unsynced("internal", "lastfm").await.unwrap();
    assert_eq!(unsynced.len(), 1);
    assert_eq!(unsynced[0].track_id, track_a.id.unwrap());
}

#[tokio::test]
async fn record_play_then_latest_played_at_reflects_the_newest_scrobble() {
    let db = setup_test_db().await;
    let track = insert_test_track(&db, "Everything In Its Right Place", "Radiohead").await;
    let track_id = track.id.unwrap();
    let play_repo = TrackPlayRepository::new(&db);

    let earlier = Utc::now() - chrono::Duration::days(1);
    let later = Utc::now();
    play_repo.record_play(&TrackPlay::new(track_id, "lastfm", earlier)).await.unwrap();
    play_repo.record_play(&TrackPlay::new(track_id, "lastfm", later)).await.unwrap();

    let latest = play_repo.latest_played_at(track_id, "lastfm").await.unwrap();
    assert_eq!(latest.map(|t| t.timestamp()), Some(later.timestamp()));
}

#[tokio::test]
async fn sync_checkpoint_upsert_overwrites_the_same_user_service_entity_type() {
    let db = setup_test_db().await;
    let checkpoint_repo = SyncCheckpointRepository::new(&db);

    let first = SyncCheckpoint::new("user-1", "spotify", EntityType::Likes).with_cursor("page-1");
    checkpoint_repo.upsert(&first).await.unwrap();

    let second = SyncCheckpoint::new("user-1", "spotify", EntityType::Likes).with_cursor("page-2");
    checkpoint_repo.upsert(&second).await.unwrap();

    let stored = checkpoint_repo.get("user-1", "spotify", &EntityType::Likes).await.unwrap();
    assert_eq!(stored.and_then(|c| c.cursor), Some("page-2".to_string()));
}
