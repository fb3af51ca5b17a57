//! Migration to create the nodes and contributors tables.
//!
//! A node is either a project or a registration of a project. Registrations point back
//! at their source through `registered_from_id` and at their pending sanctions through
//! one column per sanction kind.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Nodes::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Nodes::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Nodes::Title).string().not_null())
                    .col(ColumnDef::new(Nodes::CreatorId).string().not_null())
                    .col(
                        ColumnDef::new(Nodes::IsPublic)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Nodes::IsDeleted)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Nodes::IsRegistration)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Nodes::IsRetracted)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Nodes::RegisteredFromId).string().null())
                    .col(ColumnDef::new(Nodes::RegistrationApprovalId).string().null())
                    .col(ColumnDef::new(Nodes::EmbargoId).string().null())
                    .col(ColumnDef::new(Nodes::RetractionId).string().null())
                    .col(
                        ColumnDef::new(Nodes::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Nodes::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        for (name, column) in [
            ("idx_nodes_registration_approval_id", Nodes::RegistrationApprovalId),
            ("idx_nodes_embargo_id", Nodes::EmbargoId),
            ("idx_nodes_retraction_id", Nodes::RetractionId),
        ] {
            manager
                .create_index(
                    Index::create()
                        .name(name)
                        .table(Nodes::Table)
                        .col(column)
                        .to_owned(),
                )
                .await?;
        }

        manager
            .create_table(
                Table::create()
                    .table(Contributors::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Contributors::NodeId).string().not_null())
                    .col(ColumnDef::new(Contributors::UserId).string().not_null())
                    .col(
                        ColumnDef::new(Contributors::Permission)
                            .string()
                            .not_null()
                            .default("read"),
                    )
                    .primary_key(
                        Index::create()
                            .col(Contributors::NodeId)
                            .col(Contributors::UserId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_contributors_node_id")
                            .from(Contributors::Table, Contributors::NodeId)
                            .to(Nodes::Table, Nodes::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Contributors::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Nodes::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Nodes {
    Table,
    Id,
    Title,
    CreatorId,
    IsPublic,
    IsDeleted,
    IsRegistration,
    IsRetracted,
    RegisteredFromId,
    RegistrationApprovalId,
    EmbargoId,
    RetractionId,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Contributors {
    Table,
    NodeId,
    UserId,
    Permission,
}
