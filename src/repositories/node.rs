//! Node and contributor repository.

use std::sync::Arc;

use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};

use crate::models::contributor::{self, Entity as Contributor, Permission};
use crate::models::generate_guid;
use crate::models::node::{self, Entity as Node, Model};
use crate::models::sanction::{Entity as Sanction, SanctionState};

#[derive(Debug, Clone)]
pub struct NodeRepository {
    db: Arc<DatabaseConnection>,
}

impl NodeRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<Model>, sea_orm::DbErr> {
        Node::find_by_id(id.to_string()).one(&*self.db).await
    }

    /// Create a project owned by `creator_id`, who becomes its first admin.
    pub async fn create_project(
        &self,
        title: &str,
        creator_id: &str,
        is_public: bool,
    ) -> Result<Model, sea_orm::DbErr> {
        let now = Utc::now();
        let project = node::ActiveModel {
            id: Set(generate_guid()),
            title: Set(title.to_string()),
            creator_id: Set(creator_id.to_string()),
            is_public: Set(is_public),
            is_deleted: Set(false),
            is_registration: Set(false),
            is_retracted: Set(false),
            registered_from_id: Set(None),
            registration_approval_id: Set(None),
            embargo_id: Set(None),
            retraction_id: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(&*self.db)
        .await?;

        self.add_contributor(&project.id, creator_id, Permission::Admin)
            .await?;

        Ok(project)
    }

    /// Add a contributor or change an existing contributor's permission.
    pub async fn add_contributor(
        &self,
        node_id: &str,
        user_id: &str,
        permission: Permission,
    ) -> Result<(), sea_orm::DbErr> {
        let existing = Contributor::find_by_id((node_id.to_string(), user_id.to_string()))
            .one(&*self.db)
            .await?;

        match existing {
            Some(row) => {
                let mut active: contributor::ActiveModel = row.into();
                active.permission = Set(permission);
                active.update(&*self.db).await?;
            }
            None => {
                Contributor::insert(contributor::ActiveModel {
                    node_id: Set(node_id.to_string()),
                    user_id: Set(user_id.to_string()),
                    permission: Set(permission),
                })
                .exec_without_returning(&*self.db)
                .await?;
            }
        }

        Ok(())
    }

    pub async fn permission_for(
        &self,
        node_id: &str,
        user_id: &str,
    ) -> Result<Option<Permission>, sea_orm::DbErr> {
        Ok(
            Contributor::find_by_id((node_id.to_string(), user_id.to_string()))
                .one(&*self.db)
                .await?
                .map(|c| c.permission),
        )
    }

    /// Whether an approved embargo on `node` has reached its end date.
    pub async fn embargo_lifted(&self, node: &Model) -> Result<bool, sea_orm::DbErr> {
        let Some(embargo_id) = &node.embargo_id else {
            return Ok(false);
        };
        let embargo = Sanction::find_by_id(embargo_id.clone()).one(&*self.db).await?;
        Ok(embargo.is_some_and(|embargo| {
            embargo.state == SanctionState::Approved
                && embargo
                    .end_date
                    .is_some_and(|end| end.with_timezone(&Utc) <= Utc::now())
        }))
    }

    /// Public nodes, and registrations whose embargo has ended, are readable by anyone.
    /// Private ones by contributors only.
    pub async fn can_view(&self, node: &Model, user_id: Option<&str>) -> Result<bool, sea_orm::DbErr> {
        if node.is_public || (node.is_registration && self.embargo_lifted(node).await?) {
            return Ok(true);
        }
        match user_id {
            Some(uid) => Ok(self.permission_for(&node.id, uid).await?.is_some()),
            None => Ok(false),
        }
    }
}
