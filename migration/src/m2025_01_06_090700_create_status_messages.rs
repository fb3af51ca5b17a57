use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(StatusMessages::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(StatusMessages::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(StatusMessages::UserId).string().not_null())
                    .col(ColumnDef::new(StatusMessages::Message).text().not_null())
                    .col(ColumnDef::new(StatusMessages::Kind).string().not_null())
                    .col(
                        ColumnDef::new(StatusMessages::Trust)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(StatusMessages::CreatedAt)
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
                    .name("idx_status_messages_user_id")
                    .table(StatusMessages::Table)
                    .col(StatusMessages::UserId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(StatusMessages::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum StatusMessages {
    Table,
    Id,
    UserId,
    Message,
    Kind,
    Trust,
    CreatedAt,
}
