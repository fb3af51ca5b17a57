//! Migration to create the api_oauth2_applications table.
//!
//! The CAS server reads this table to build its list of registered clients, so column
//! names must stay in sync with the CAS service registry.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ApiOAuth2Applications::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ApiOAuth2Applications::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ApiOAuth2Applications::ClientId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ApiOAuth2Applications::ClientSecret)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ApiOAuth2Applications::Active)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(ApiOAuth2Applications::OwnerId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ApiOAuth2Applications::Name).string().not_null())
                    .col(
                        ColumnDef::new(ApiOAuth2Applications::Description)
                            .text()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ApiOAuth2Applications::HomeUrl)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ApiOAuth2Applications::CallbackUrl)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ApiOAuth2Applications::DateCreated)
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
                    .name("idx_api_oauth2_applications_client_id")
                    .table(ApiOAuth2Applications::Table)
                    .col(ApiOAuth2Applications::ClientId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_api_oauth2_applications_owner_active")
                    .table(ApiOAuth2Applications::Table)
                    .col(ApiOAuth2Applications::OwnerId)
                    .col(ApiOAuth2Applications::Active)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ApiOAuth2Applications::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ApiOAuth2Applications {
    #[sea_orm(iden = "api_oauth2_applications")]
    Table,
    Id,
    ClientId,
    ClientSecret,
    Active,
    OwnerId,
    Name,
    Description,
    HomeUrl,
    CallbackUrl,
    DateCreated,
}
