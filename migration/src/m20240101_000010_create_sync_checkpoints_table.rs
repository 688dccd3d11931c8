use sea_orm_migration::prelude::*;

use crate::common::with_audit_columns;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let mut table = Table::create();
        table
            .table(SyncCheckpoints::Table)
            .if_not_exists()
            .col(
                ColumnDef::new(SyncCheckpoints::Id)
                    .integer()
                    .not_null()
                    .auto_increment()
                    .primary_key(),
            )
            .col(
                ColumnDef::new(SyncCheckpoints::UserId)
                    .string_len(255)
                    .not_null(),
            )
            .col(
                ColumnDef::new(SyncCheckpoints::Service)
                    .string_len(50)
                    .not_null(),
            )
            .col(
                ColumnDef::new(SyncCheckpoints::EntityType)
                    .string_len(32)
                    .not_null(),
            )
            .col(ColumnDef::new(SyncCheckpoints::LastTimestamp).timestamp_with_time_zone())
            .col(ColumnDef::new(SyncCheckpoints::Cursor).string_len(500));

        manager
            .create_table(with_audit_columns(table).to_owned())
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_sync_checkpoints_unique")
                    .table(SyncCheckpoints::Table)
                    .col(SyncCheckpoints::UserId)
                    .col(SyncCheckpoints::Service)
                    .col(SyncCheckpoints::EntityType)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SyncCheckpoints::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum SyncCheckpoints {
    Table,
    Id,
    UserId,
    Service,
    EntityType,
    LastTimestamp,
    Cursor,
}
