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
            .table(TrackMetrics::Table)
            .if_not_exists()
            .col(
                ColumnDef::new(TrackMetrics::Id)
                    .integer()
                    .not_null()
                    .auto_increment()
                    .primary_key(),
            )
            .col(ColumnDef::new(TrackMetrics::TrackId).integer().not_null())
            .col(
                ColumnDef::new(TrackMetrics::ConnectorName)
                    .string_len(50)
                    .not_null(),
            )
            .col(
                ColumnDef::new(TrackMetrics::MetricType)
                    .string_len(50)
                    .not_null(),
            )
            .col(ColumnDef::new(TrackMetrics::Value).double().not_null())
            .col(
                ColumnDef::new(TrackMetrics::CollectedAt)
                    .timestamp_with_time_zone()
                    .not_null(),
            )
            .foreign_key(
                ForeignKey::create()
                    .name("fk_track_metrics_track_id")
                    .from(TrackMetrics::Table, TrackMetrics::TrackId)
                    .to(Tracks::Table, Tracks::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            );

        manager
            .create_table(with_audit_columns(table).to_owned())
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_track_metrics_unique")
                    .table(TrackMetrics::Table)
                    .col(TrackMetrics::TrackId)
                    .col(TrackMetrics::ConnectorName)
                    .col(TrackMetrics::MetricType)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TrackMetrics::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum TrackMetrics {
    Table,
    Id,
    TrackId,
    ConnectorName,
    MetricType,
    Value,
    CollectedAt,
}
