//! Migration to create the sanctions table.
//!
//! Registration approvals, embargoes and retractions share one table discriminated by
//! `kind`. Per-authorizer approval bookkeeping lives in the `approval_state` JSON column.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Sanctions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Sanctions::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Sanctions::Kind).string().not_null())
                    .col(
                        ColumnDef::new(Sanctions::State)
                            .string()
                            .not_null()
                            .default("unapproved"),
                    )
                    .col(
                        ColumnDef::new(Sanctions::Mode)
                            .string()
                            .not_null()
                            .default("unanimous"),
                    )
                    .col(ColumnDef::new(Sanctions::InitiatedBy).string().not_null())
                    .col(ColumnDef::new(Sanctions::ApprovalState).json().not_null())
                    .col(
                        ColumnDef::new(Sanctions::EndDate)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(Sanctions::Justification).text().null())
                    .col(
                        ColumnDef::new(Sanctions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Sanctions::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_sanctions_kind_state")
                    .table(Sanctions::Table)
                    .col(Sanctions::Kind)
                    .col(Sanctions::State)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Sanctions::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Sanctions {
    Table,
    Id,
    Kind,
    State,
    Mode,
    InitiatedBy,
    ApprovalState,
    EndDate,
    Justification,
    CreatedAt,
    UpdatedAt,
}
