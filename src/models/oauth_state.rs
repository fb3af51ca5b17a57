//! # OAuth State Model
//!
//! In-flight OAuth dance for one `(user, provider)` pair. OAuth2 flows keep the CSRF
//! `state`; OAuth1 flows keep the temporary request token in `state` and its secret in
//! `token_secret`.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "oauth_states")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    /// Provider short name
    pub provider: String,
    pub state: String,
    pub token_secret: Option<String>,
    pub expires_at: DateTimeWithTimeZone,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn is_expired(&self, now: chrono::DateTime<chrono::Utc>) -> bool {
        self.expires_at <= now
    }
}
