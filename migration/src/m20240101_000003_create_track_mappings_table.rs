use sea_orm_migration::prelude::*;

use crate::common::with_audit_columns;
use crate::m20240101_000001_create_tracks_table::Tracks;
use crate::m20240101_000002_create_connector_tracks_table::ConnectorTracks;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let mut table = Table::create();
        table
            .table(TrackMappings::Table)
            .if_not_exists()
            .col(
                ColumnDef::new(TrackMappings::Id)
                    .integer()
                    .not_null()
                    .auto_increment()
                    .primary_key(),
            )
            .col(ColumnDef::new(TrackMappings::TrackId).integer().not_null())
            .col(
                ColumnDef::new(TrackMappings::ConnectorTrackId)
                    .integer()
                    .not_null(),
            )
            .col(
                ColumnDef::new(TrackMappings::MatchMethod)
                    .string_len(32)
                    .not_null(),
            )
            .col(ColumnDef::new(TrackMappings::Confidence).integer().not_null())
            .col(ColumnDef::new(TrackMappings::ConfidenceEvidence).json())
            .col(ColumnDef::new(TrackMappings::Metadata).json())
            .col(ColumnDef::new(TrackMappings::LastVerified).timestamp_with_time_zone())
            .foreign_key(
                ForeignKey::create()
                    .name("fk_track_mappings_track_id")
                    .from(TrackMappings::Table, TrackMappings::TrackId)
                    .to(Tracks::Table, Tracks::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .foreign_key(
                ForeignKey::create()
                    .name("fk_track_mappings_connector_track_id")
                    .from(TrackMappings::Table, TrackMappings::ConnectorTrackId)
                    .to(ConnectorTracks::Table, ConnectorTracks::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            );

        manager
            .create_table(with_audit_columns(table).to_owned())
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_track_mappings_unique")
                    .table(TrackMappings::Table)
                    .col(TrackMappings::TrackId)
                    .col(TrackMappings::ConnectorTrackId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_track_mappings_track_id")
                    .table(TrackMappings::Table)
                    .col(TrackMappings::TrackId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TrackMappings::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum TrackMappings {
    Table,
    Id,
    TrackId,
    ConnectorTrackId,
    MatchMethod,
    Confidence,
    ConfidenceEvidence,
    Metadata,
    LastVerified,
}
