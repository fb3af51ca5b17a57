//! Status message queue.

use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

use crate::models::generate_object_id;
use crate::models::status_message::{self, ActiveModel, Entity as StatusMessage, Model};

#[derive(Debug, Clone)]
pub struct StatusMessageRepository {
    db: Arc<DatabaseConnection>,
}

impl StatusMessageRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn push(
        &self,
        user_id: &str,
        message: &str,
        kind: &str,
        trust: bool,
    ) -> Result<(), sea_orm::DbErr> {
        push_status(&*self.db, user_id, message, kind, trust).await
    }

    /// Return and delete every queued message for the user, oldest first.
    pub async fn pop_all(&self, user_id: &str) -> Result<Vec<Model>, sea_orm::DbErr> {
        let messages = StatusMessage::find()
            .filter(status_message::Column::UserId.eq(user_id))
            .order_by_asc(status_message::Column::CreatedAt)
            .order_by_asc(status_message::Column::Id)
            .all(&*self.db)
            .await?;

        if !messages.is_empty() {
            StatusMessage::delete_many()
                .filter(status_message::Column::Id.is_in(messages.iter().map(|m| m.id.clone())))
                .exec(&*self.db)
                .await?;
        }

        Ok(messages)
    }
}

/// Queue a message using any connection, including an open transaction.
pub async fn push_status<C: ConnectionTrait>(
    conn: &C,
    user_id: &str,
    message: &str,
    kind: &str,
    trust: bool,
) -> Result<(), sea_orm::DbErr> {
    StatusMessage::insert(ActiveModel {
        id: Set(generate_object_id()),
        user_id: Set(user_id.to_string()),
        message: Set(message.to_string()),
        kind: Set(kind.to_string()),
        trust: Set(trust),
        created_at: Set(Utc::now().into()),
    })
    .exec_without_returning(conn)
    .await?;
    Ok(())
}
