use sea_orm_migration::prelude::*;

/// Columns every table in this schema carries (Invariant 1: created_at,
/// updated_at, is_deleted, deleted_at on every persisted row).
pub fn with_audit_columns(mut table: TableCreateStatement) -> TableCreateStatement {
    table
        .col(
            ColumnDef::new(Alias::new("is_deleted"))
                .boolean()
                .not_null()
                .default(false),
        )
        .col(ColumnDef::new(Alias::new("deleted_at")).timestamp_with_time_zone())
        .col(
            ColumnDef::new(Alias::new("created_at"))
                .timestamp_with_time_zone()
                .not_null(),
        )
        .col(
            ColumnDef::new(Alias::new("updated_at"))
                .timestamp_with_time_zone()
                .not_null(),
        );
    table
}
