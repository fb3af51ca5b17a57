use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(OAuthState::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OAuthState::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(OAuthState::UserId).string().not_null())
                    .col(ColumnDef::new(OAuthState::Provider).string().not_null())
                    // OAuth2: the CSRF state. OAuth1: the temporary request token.
                    .col(ColumnDef::new(OAuthState::State).string().not_null())
                    // OAuth1 only
                    .col(ColumnDef::new(OAuthState::TokenSecret).string().null())
                    .col(
                        ColumnDef::new(OAuthState::ExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OAuthState::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // One in-flight dance per user and provider
        manager
            .create_index(
                Index::create()
                    .name("idx_oauth_states_user_provider")
                    .table(OAuthState::Table)
                    .col(OAuthState::UserId)
                    .col(OAuthState::Provider)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_oauth_states_expires_at")
                    .table(OAuthState::Table)
                    .col(OAuthState::ExpiresAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(OAuthState::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum OAuthState {
    #[sea_orm(iden = "oauth_states")]
    Table,
    Id,
    UserId,
    Provider,
    State,
    TokenSecret,
    ExpiresAt,
    CreatedAt,
}
