pub use sea_orm_migration::prelude::*;

mod common;

mod m20240101_000001_create_tracks_table;
mod m20240101_000002_create_connector_tracks_table;
mod m20240101_000003_create_track_mappings_table;
mod m20240101_000004_create_track_metrics_table;
mod m20240101_000005_create_track_likes_table;
mod m20240101_000006_create_track_plays_table;
mod m20240101_000007_create_playlists_table;
mod m20240101_000008_create_playlist_mappings_table;
mod m20240101_000009_create_playlist_tracks_table;
mod m20240101_000010_create_sync_checkpoints_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_tracks_table::Migration),
            Box::new(m20240101_000002_create_connector_tracks_table::Migration),
            Box::new(m20240101_000003_create_track_mappings_table::Migration),
            Box::new(m20240101_000004_create_track_metrics_table::Migration),
            Box::new(m20240101_000005_create_track_likes_table::Migration),
            Box::new(m20240101_000006_create_track_plays_table::Migration),
            Box::new(m20240101_000007_create_playlists_table::Migration),
            Box::new(m20240101_000008_create_playlist_mappings_table::Migration),
            Box::new(m20240101_000009_create_playlist_tracks_table::Migration),
            Box::new(m20240101_000010_create_sync_checkpoints_table::Migration),
        ]
    }
}
