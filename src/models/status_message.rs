//! Flash messages queued for a user and shown once.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "status_messages")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    #[serde(skip_serializing)]
    pub id: String,
    #[serde(skip_serializing)]
    pub user_id: String,
    #[sea_orm(column_type = "Text")]
    pub message: String,
    /// Bootstrap-style alert class: `success`, `info`, `warning`, `danger`
    pub kind: String,
    /// Whether `message` is trusted markup
    pub trust: bool,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Status message as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StatusMessageResponse {
    pub message: String,
    pub kind: String,
    pub trust: bool,
}

impl From<Model> for StatusMessageResponse {
    fn from(model: Model) -> Self {
        Self {
            message: model.message,
            kind: model.kind,
            trust: model.trust,
        }
    }
}
