//! User repository.

use std::sync::Arc;

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

use crate::models::generate_guid;
use crate::models::user::{self, ActiveModel, Entity as User, Model};

#[derive(Debug, Clone)]
pub struct UserRepository {
    db: Arc<DatabaseConnection>,
}

impl UserRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn create(
        &self,
        username: &str,
        fullname: &str,
        email: Option<&str>,
        api_token_hash: Option<String>,
    ) -> Result<Model, sea_orm::DbErr> {
        ActiveModel {
            id: Set(generate_guid()),
            username: Set(username.to_string()),
            fullname: Set(fullname.to_string()),
            email: Set(email.map(str::to_string)),
            api_token_hash: Set(api_token_hash),
            created_at: Set(Utc::now().into()),
        }
        .insert(&*self.db)
        .await
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<Model>, sea_orm::DbErr> {
        User::find_by_id(id.to_string()).one(&*self.db).await
    }

    pub async fn find_by_ids(&self, ids: &[String]) -> Result<Vec<Model>, sea_orm::DbErr> {
        User::find()
            .filter(user::Column::Id.is_in(ids.iter().cloned()))
            .all(&*self.db)
            .await
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<Model>, sea_orm::DbErr> {
        User::find()
            .filter(user::Column::Username.eq(username))
            .one(&*self.db)
            .await
    }

    pub async fn find_by_token_hash(&self, hash: &str) -> Result<Option<Model>, sea_orm::DbErr> {
        User::find()
            .filter(user::Column::ApiTokenHash.eq(hash))
            .one(&*self.db)
            .await
    }

    /// Replace the user's personal access token hash.
    pub async fn set_token_hash(&self, user: Model, hash: String) -> Result<Model, sea_orm::DbErr> {
        let mut active: ActiveModel = user.into();
        active.api_token_hash = Set(Some(hash));
        active.update(&*self.db).await
    }
}
