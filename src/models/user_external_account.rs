//! Link between a user and an external account they have connected.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "user_external_accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub external_account_id: String,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::external_account::Entity",
        from = "Column::ExternalAccountId",
        to = "super::external_account::Column::Id",
        on_delete = "Cascade"
    )]
    ExternalAccount,
}

impl Related<super::external_account::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ExternalAccount.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
