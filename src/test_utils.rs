//! Test utilities for narada.
//!
//! Provides helpers for isolated integration tests: an in-memory
//! SQLite database per test (grounded on the teacher's own
//! `setup_test_db` pattern) and factory functions for constructing
//! fixture domain objects.

use sea_orm::{Database, DatabaseConnection};

use crate::config::Config;
use crate::db::repositories::{TrackConnectorRepository, TrackCoreRepository};
use crate::domain::{Artist, Track};
use crate::error::Result;

/// Sets up an in-memory SQLite database with all migrations applied.
/// Each call creates a fresh, isolated database, safe for parallel
/// tests.
pub async fn setup_test_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:").await.expect("failed to create in-memory database");
    migration::Migrator::up(&db, None).await.expect("failed to run migrations");
    db
}

/// A `Config` with placeholder credentials, suitable for tests that
/// never make a real network call (connector tests stub HTTP via
/// `wiremock` instead).
pub fn test_config() -> Config {
    Config {
        database_url: "sqlite::memory:".to_string(),
        database_max_connections: 1,
        database_min_connections: 1,
        spotify_client_id: "test-client-id".to_string(),
        spotify_client_secret: "test-client-secret".to_string(),
        spotify_redirect_uri: "http://localhost/callback".to_string(),
        lastfm_key: "test-lastfm-key".to_string(),
        lastfm_secret: "test-lastfm-secret".to_string(),
        lastfm_username: Some("test-user".to_string()),
        lastfm_password: None,
        api_rate_limit: 1000,
        batch_size: 50,
        concurrency_limit: 5,
        retry_count: 1,
        retry_base_delay_ms: 1,
        retry_max_delay_ms: 1,
        request_delay_ms: 0,
        workflows_dir: "workflows".to_string(),
    }
}

/// Builds an unpersisted fixture track with a single artist.
pub fn fixture_track(title: &str, artist: &str) -> Track {
    Track::new(title, vec![Artist::new(artist).expect("valid artist name")]).expect("valid track")
}

/// Persists a fixture track directly via `TrackCoreRepository`,
/// bypassing connector ingestion for tests that only need a row to
/// exist.
pub async fn insert_test_track(db: &DatabaseConnection, title: &str, artist: &str) -> Track {
    TrackCoreRepository::new(db).save_track(&fixture_track(title, artist)).await.expect("failed to insert test track")
}

/// Persists a fixture track as if ingested from `connector`, so
/// `TrackConnectorRepository`-backed lookups (`find_track_by_connector`,
/// mapping confidence) have a realistic row to act on.
pub async fn insert_test_connector_track(db: &DatabaseConnection, connector: &str, connector_id: &str, title: &str, artist: &str) -> Result<Track> {
    let artists = vec![Artist::new(artist)?];
    let (track, _connector_track, _mapping) = TrackConnectorRepository::new(db)
        .ingest_external_track(connector, connector_id, serde_json::Value::Null, title, &artists, None, None, None, None)
        .await?;
    Ok(track)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn setup_test_db_applies_migrations() {
        let db = setup_test_db().await;
        let tracks = TrackCoreRepository::new(&db).get_tracks_by_ids(&[1]).await.unwrap();
        assert!(tracks.is_empty());
    }

    #[tokio::test]
    async fn insert_test_track_round_trips() {
        let db = setup_test_db().await;
        let track = insert_test_track(&db, "Test Title", "Test Artist").await;
        assert_eq!(track.title, "Test Title");
        assert!(track.id.is_some());
    }

    #[tokio::test]
    async fn parallel_databases_are_isolated() {
        let (db1, db2) = tokio::join!(setup_test_db(), setup_test_db());
        insert_test_track(&db1, "Only In One", "Artist").await;

        let tracks1 = TrackCoreRepository::new(&db1).get_tracks_by_ids(&[1]).await.unwrap();
        let tracks2 = TrackCoreRepository::new(&db2).get_tracks_by_ids(&[1]).await.unwrap();
        assert_eq!(tracks1.len(), 1);
        assert!(tracks2.is_empty());
    }
}
