use sea_orm_migration::prelude::*;

use crate::common::with_audit_columns;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let mut table = Table::create();
        table
            .table(ConnectorTracks::Table)
            .if_not_exists()
            .col(
                ColumnDef::new(ConnectorTracks::Id)
                    .integer()
                    .not_null()
                    .auto_increment()
                    .primary_key(),
            )
            .col(
                ColumnDef::new(ConnectorTracks::ConnectorName)
                    .string_len(50)
                    .not_null(),
            )
            .col(
                ColumnDef::new(ConnectorTracks::ConnectorTrackId)
                    .string_len(255)
                    .not_null(),
            )
            .col(
                ColumnDef::new(ConnectorTracks::Title)
                    .string_len(1000)
                    .not_null(),
            )
            .col(ColumnDef::new(ConnectorTracks::Artists).json().not_null())
            .col(ColumnDef::new(ConnectorTracks::Album).string_len(1000))
            .col(ColumnDef::new(ConnectorTracks::DurationMs).integer())
            .col(ColumnDef::new(ConnectorTracks::ReleaseDate).timestamp_with_time_zone())
            .col(ColumnDef::new(ConnectorTracks::Isrc).string_len(32))
            .col(ColumnDef::new(ConnectorTracks::RawMetadata).json().not_null())
            .col(
                ColumnDef::new(ConnectorTracks::LastUpdated)
                    .timestamp_with_time_zone()
                    .not_null(),
            );

        manager
            .create_table(with_audit_columns(table).to_owned())
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_connector_tracks_unique")
                    .table(ConnectorTracks::Table)
                    .col(ConnectorTracks::ConnectorName)
                    .col(ConnectorTracks::ConnectorTrackId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ConnectorTracks::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum ConnectorTracks {
    Table,
    Id,
    ConnectorName,
    ConnectorTrackId,
    Title,
    Artists,
    Album,
    DurationMs,
    ReleaseDate,
    Isrc,
    RawMetadata,
    LastUpdated,
}
