//! Developer application repository.

use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

use crate::models::api_application::{
    self, ActiveModel, Entity as ApiApplication, Model, generate_client_id, generate_client_secret,
};
use crate::models::generate_object_id;

/// Fields a caller may set when registering or editing an application.
#[derive(Debug, Clone, Default)]
pub struct ApplicationChanges {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub home_url: Option<String>,
    pub callback_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ApiApplicationRepository {
    db: Arc<DatabaseConnection>,
}

impl ApiApplicationRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn create(
        &self,
        owner_id: &str,
        name: &str,
        description: Option<String>,
        home_url: &str,
        callback_url: &str,
    ) -> Result<Model, sea_orm::DbErr> {
        ActiveModel {
            id: Set(generate_object_id()),
            client_id: Set(generate_client_id()),
            client_secret: Set(generate_client_secret()),
            active: Set(true),
            owner_id: Set(owner_id.to_string()),
            name: Set(name.to_string()),
            description: Set(description),
            home_url: Set(home_url.to_string()),
            callback_url: Set(callback_url.to_string()),
            date_created: Set(Utc::now().into()),
        }
        .insert(&*self.db)
        .await
    }

    /// Active application by client id, regardless of owner.
    pub async fn find_active(&self, client_id: &str) -> Result<Option<Model>, sea_orm::DbErr> {
        ApiApplication::find()
            .filter(api_application::Column::ClientId.eq(client_id))
            .filter(api_application::Column::Active.eq(true))
            .one(&*self.db)
            .await
    }

    pub async fn list_active_for_owner(&self, owner_id: &str) -> Result<Vec<Model>, sea_orm::DbErr> {
        ApiApplication::find()
            .filter(api_application::Column::OwnerId.eq(owner_id))
            .filter(api_application::Column::Active.eq(true))
            .order_by_asc(api_application::Column::DateCreated)
            .all(&*self.db)
            .await
    }

    pub async fn update(&self, app: Model, changes: ApplicationChanges) -> Result<Model, sea_orm::DbErr> {
        let mut active: ActiveModel = app.into();
        if let Some(name) = changes.name {
            active.name = Set(name);
        }
        if let Some(description) = changes.description {
            active.description = Set(description);
        }
        if let Some(home_url) = changes.home_url {
            active.home_url = Set(home_url);
        }
        if let Some(callback_url) = changes.callback_url {
            active.callback_url = Set(callback_url);
        }
        active.update(&*self.db).await
    }

    pub async fn deactivate(&self, app: Model) -> Result<Model, sea_orm::DbErr> {
        let mut active: ActiveModel = app.into();
        active.active = Set(false);
        active.update(&*self.db).await
    }

    pub async fn rotate_secret(&self, app: Model) -> Result<Model, sea_orm::DbErr> {
        let mut active: ActiveModel = app.into();
        active.client_secret = Set(generate_client_secret());
        active.update(&*self.db).await
    }
}
