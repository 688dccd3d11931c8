use sea_orm_migration::prelude::*;

use crate::common::with_audit_columns;
use crate::m20240101_000007_create_playlists_table::Playlists;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let mut table = Table::create();
        table
            .table(PlaylistMappings::Table)
            .if_not_exists()
            .col(
                ColumnDef::new(PlaylistMappings::Id)
                    .integer()
                    .not_null()
                    .auto_increment()
                    .primary_key(),
            )
            .col(
                ColumnDef::new(PlaylistMappings::PlaylistId)
                    .integer()
                    .not_null(),
            )
            .col(
                ColumnDef::new(PlaylistMappings::ConnectorName)
                    .string_len(50)
                    .not_null(),
            )
            .col(
                ColumnDef::new(PlaylistMappings::ConnectorPlaylistId)
                    .string_len(255)
                    .not_null(),
            )
            .foreign_key(
                ForeignKey::create()
                    .name("fk_playlist_mappings_playlist_id")
                    .from(PlaylistMappings::Table, PlaylistMappings::PlaylistId)
                    .to(Playlists::Table, Playlists::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            );

        manager
            .create_table(with_audit_columns(table).to_owned())
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_playlist_mappings_unique")
                    .table(PlaylistMappings::Table)
                    .col(PlaylistMappings::PlaylistId)
                    .col(PlaylistMappings::ConnectorName)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PlaylistMappings::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum PlaylistMappings {
    Table,
    Id,
    PlaylistId,
    ConnectorName,
    ConnectorPlaylistId,
}
