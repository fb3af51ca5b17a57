//! Node entity: a project or a registration (frozen copy) of a project.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "nodes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub title: String,
    pub creator_id: String,
    pub is_public: bool,
    pub is_deleted: bool,
    pub is_registration: bool,
    pub is_retracted: bool,
    /// Source project of a registration.
    pub registered_from_id: Option<String>,
    pub registration_approval_id: Option<String>,
    pub embargo_id: Option<String>,
    pub retraction_id: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::contributor::Entity")]
    Contributor,
    #[sea_orm(has_many = "super::comment::Entity")]
    Comment,
}

impl Related<super::contributor::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Contributor.def()
    }
}

impl Related<super::comment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Comment.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
