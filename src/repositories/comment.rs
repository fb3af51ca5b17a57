//! Comment repository.
//!
//! Reports live in a JSON column, so changes to them go through [`find_for_update`] and
//! [`save_in`] inside one transaction.

use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};

use crate::models::comment::{self, ActiveModel, Entity as Comment, Model, Reports};
use crate::models::generate_object_id;

#[derive(Debug, Clone)]
pub struct CommentRepository {
    db: Arc<DatabaseConnection>,
}

impl CommentRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<Model>, sea_orm::DbErr> {
        Comment::find_by_id(id.to_string()).one(&*self.db).await
    }

    /// Non-deleted comments on a node, oldest first.
    pub async fn list_for_node(&self, node_id: &str) -> Result<Vec<Model>, sea_orm::DbErr> {
        Comment::find()
            .filter(comment::Column::NodeId.eq(node_id))
            .filter(comment::Column::IsDeleted.eq(false))
            .order_by_asc(comment::Column::CreatedAt)
            .order_by_asc(comment::Column::Id)
            .all(&*self.db)
            .await
    }

    pub async fn create(
        &self,
        node_id: &str,
        user_id: &str,
        content: &str,
    ) -> Result<Model, sea_orm::DbErr> {
        let now = Utc::now();
        ActiveModel {
            id: Set(generate_object_id()),
            node_id: Set(node_id.to_string()),
            user_id: Set(user_id.to_string()),
            content: Set(content.to_string()),
            is_deleted: Set(false),
            modified: Set(false),
            reports: Set(Reports::default()),
            created_at: Set(now.into()),
            modified_at: Set(now.into()),
        }
        .insert(&*self.db)
        .await
    }

    /// Persist every field of an in-memory comment.
    pub async fn save(&self, comment: Model) -> Result<Model, sea_orm::DbErr> {
        save_in(&*self.db, comment).await
    }
}

/// Comment row locked until `conn`'s transaction ends.
pub async fn find_for_update<C: ConnectionTrait>(
    conn: &C,
    id: &str,
) -> Result<Option<Model>, sea_orm::DbErr> {
    Comment::find_by_id(id.to_string())
        .lock_exclusive()
        .one(conn)
        .await
}

pub async fn save_in<C: ConnectionTrait>(conn: &C, comment: Model) -> Result<Model, sea_orm::DbErr> {
    let active: ActiveModel = comment.into();
    active.reset_all().update(conn).await
}
