//! External account entity: one credential set on a third-party provider.
//!
//! Unique per `(provider, provider_id)`. `oauth_key`, `oauth_secret` and `refresh_token`
//! hold AES-GCM ciphertext produced by [`crate::crypto::seal_credential`].

use sea_orm::entity::prelude::*;
use serde_json::Value as JsonValue;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "external_accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Provider short name, e.g. `github`
    pub provider: String,
    /// Human readable provider name, e.g. `GitHub`
    pub provider_name: String,
    /// Account id on the provider side
    pub provider_id: String,
    pub oauth_key: Option<Vec<u8>>,
    pub oauth_secret: Option<Vec<u8>>,
    pub refresh_token: Option<Vec<u8>>,
    pub expires_at: Option<DateTimeWithTimeZone>,
    /// JSON array of granted scopes
    #[sea_orm(column_type = "Json")]
    pub scopes: JsonValue,
    pub display_name: Option<String>,
    pub profile_url: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::user_external_account::Entity")]
    UserExternalAccount,
}

impl Related<super::user_external_account::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserExternalAccount.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
