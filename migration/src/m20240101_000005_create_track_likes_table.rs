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
            .table(TrackLikes::Table)
            .if_not_exists()
            .col(
                ColumnDef::new(TrackLikes::Id)
                    .integer()
                    .not_null()
                    .auto_increment()
                    .primary_key(),
            )
            .col(ColumnDef::new(TrackLikes::TrackId).integer().not_null())
            .col(ColumnDef::new(TrackLikes::Service).string_len(50).not_null())
            .col(
                ColumnDef::new(TrackLikes::IsLiked)
                    .boolean()
                    .not_null()
                    .default(true),
            )
            .col(ColumnDef::new(TrackLikes::LikedAt).timestamp_with_time_zone())
            .col(ColumnDef::new(TrackLikes::LastSynced).timestamp_with_time_zone())
            .foreign_key(
                ForeignKey::create()
                    .name("fk_track_likes_track_id")
                    .from(TrackLikes::Table, TrackLikes::TrackId)
                    .to(Tracks::Table, Tracks::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            );

        manager
            .create_table(with_audit_columns(table).to_owned())
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_track_likes_unique")
                    .table(TrackLikes::Table)
                    .col(TrackLikes::TrackId)
                    .col(TrackLikes::Service)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TrackLikes::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum TrackLikes {
    Table,
    Id,
    TrackId,
    Service,
    IsLiked,
    LikedAt,
    LastSynced,
}
