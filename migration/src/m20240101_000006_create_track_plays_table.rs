use sea_orm_migration::prelude::*;

use crate::common::with_audit_columns;
use crate::m20240101_000001_create_tracks_table::Tracks;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let mut table = Table::create();
        table
            .table(TrackPlays::Table)
            .if_not_exists()
            .col(
                ColumnDef::new(TrackPlays::Id)
                    .integer()
                    .not_null()
                    .auto_increment()
                    .primary_key(),
            )
            .col(ColumnDef::new(TrackPlays::TrackId).integer().not_null())
            .col(ColumnDef::new(TrackPlays::Service).string_len(50).not_null())
            .col(
                ColumnDef::new(TrackPlays::PlayedAt)
                    .timestamp_with_time_zone()
                    .not_null(),
            )
            .col(ColumnDef::new(TrackPlays::MsPlayed).integer())
            .col(ColumnDef::new(TrackPlays::Context).json())
            .foreign_key(
                ForeignKey::create()
                    .name("fk_track_plays_track_id")
                    .from(TrackPlays::Table, TrackPlays::TrackId)
                    .to(Tracks::Table, Tracks::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            );

        manager
            .create_table(with_audit_columns(table).to_owned())
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_track_plays_track_id")
                    .table(TrackPlays::Table)
                    .col(TrackPlays::TrackId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_track_plays_played_at")
                    .table(TrackPlays::Table)
                    .col(TrackPlays::PlayedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TrackPlays::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum TrackPlays {
    Table,
    Id,
    TrackId,
    Service,
    PlayedAt,
    MsPlayed,
    Context,
}
