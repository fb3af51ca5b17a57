//! Migration to create the external_accounts and user_external_accounts tables.
//!
//! An external account is unique per `(provider, provider_id)` and may be linked to
//! any number of users.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ExternalAccounts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ExternalAccounts::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ExternalAccounts::Provider).string().not_null())
                    .col(
                        ColumnDef::new(ExternalAccounts::ProviderName)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ExternalAccounts::ProviderId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ExternalAccounts::OauthKey).binary().null())
                    .col(ColumnDef::new(ExternalAccounts::OauthSecret).binary().null())
                    .col(ColumnDef::new(ExternalAccounts::RefreshToken).binary().null())
                    .col(
                        ColumnDef::new(ExternalAccounts::ExpiresAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(ExternalAccounts::Scopes).json().not_null())
                    .col(ColumnDef::new(ExternalAccounts::DisplayName).string().null())
                    .col(ColumnDef::new(ExternalAccounts::ProfileUrl).string().null())
                    .col(
                        ColumnDef::new(ExternalAccounts::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(ExternalAccounts::UpdatedAt)
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
                    .name("idx_external_accounts_provider_provider_id")
                    .table(ExternalAccounts::Table)
                    .col(ExternalAccounts::Provider)
                    .col(ExternalAccounts::ProviderId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(UserExternalAccounts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UserExternalAccounts::UserId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(UserExternalAccounts::ExternalAccountId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(UserExternalAccounts::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .primary_key(
                        Index::create()
                            .col(UserExternalAccounts::UserId)
                            .col(UserExternalAccounts::ExternalAccountId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_external_accounts_account_id")
                            .from(
                                UserExternalAccounts::Table,
                                UserExternalAccounts::ExternalAccountId,
                            )
                            .to(ExternalAccounts::Table, ExternalAccounts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UserExternalAccounts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ExternalAccounts::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ExternalAccounts {
    Table,
    Id,
    Provider,
    ProviderName,
    ProviderId,
    OauthKey,
    OauthSecret,
    RefreshToken,
    ExpiresAt,
    Scopes,
    DisplayName,
    ProfileUrl,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum UserExternalAccounts {
    Table,
    UserId,
    ExternalAccountId,
    CreatedAt,
}
