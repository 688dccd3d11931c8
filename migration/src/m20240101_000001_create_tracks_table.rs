use sea_orm_migration::prelude::*;

use crate::common::with_audit_columns;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let mut table = Table::create();
        table
            .table(Tracks::Table)
            .if_not_exists()
            .col(
                ColumnDef::new(Tracks::Id)
                    .integer()
                    .not_null()
                    .auto_increment()
                    .primary_key(),
            )
            .col(ColumnDef::new(Tracks::Title).string_len(1000).not_null())
            .col(ColumnDef::new(Tracks::Artists).json().not_null())
            .col(ColumnDef::new(Tracks::Album).string_len(1000))
            .col(ColumnDef::new(Tracks::DurationMs).integer())
            .col(ColumnDef::new(Tracks::ReleaseDate).timestamp_with_time_zone())
            .col(ColumnDef::new(Tracks::Isrc).string_len(32));

        manager
            .create_table(with_audit_columns(table).to_owned())
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_tracks_isrc")
                    .table(Tracks::Table)
                    .col(Tracks::Isrc)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Tracks::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Tracks {
    Table,
    Id,
    Title,
    Artists,
    Album,
    DurationMs,
    ReleaseDate,
    Isrc,
}
