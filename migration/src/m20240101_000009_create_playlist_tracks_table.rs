use sea_orm_migration::prelude::*;

use crate::common::with_audit_columns;
use crate::m20240101_000001_create_tracks_table::Tracks;
use crate::m20240101_000007_create_playlists_table::Playlists;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let mut table = Table::create();
        table
            .table(PlaylistTracks::Table)
            .if_not_exists()
            .col(
                ColumnDef::new(PlaylistTracks::Id)
                    .integer()
                    .not_null()
                    .auto_increment()
                    .primary_key(),
            )
            .col(
                ColumnDef::new(PlaylistTracks::PlaylistId)
                    .integer()
                    .not_null(),
            )
            .col(ColumnDef::new(PlaylistTracks::TrackId).integer().not_null())
            .col(
                ColumnDef::new(PlaylistTracks::SortKey)
                    .string_len(32)
                    .not_null(),
            )
            .foreign_key(
                ForeignKey::create()
                    .name("fk_playlist_tracks_playlist_id")
                    .from(PlaylistTracks::Table, PlaylistTracks::PlaylistId)
                    .to(Playlists::Table, Playlists::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .foreign_key(
                ForeignKey::create()
                    .name("fk_playlist_tracks_track_id")
                    .from(PlaylistTracks::Table, PlaylistTracks::TrackId)
                    .to(Tracks::Table, Tracks::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            );

        manager
            .create_table(with_audit_columns(table).to_owned())
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_playlist_tracks_playlist_id")
                    .table(PlaylistTracks::Table)
                    .col(PlaylistTracks::PlaylistId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_playlist_tracks_sort_key")
                    .table(PlaylistTracks::Table)
                    .col(PlaylistTracks::PlaylistId)
                    .col(PlaylistTracks::SortKey)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PlaylistTracks::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum PlaylistTracks {
    Table,
    Id,
    PlaylistId,
    TrackId,
    SortKey,
}
