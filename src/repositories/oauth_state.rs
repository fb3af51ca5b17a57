//! # OAuth State Repository
//!
//! One pending OAuth dance per `(user, provider)`. Starting a new dance replaces the old
//! one; reading a state consumes it.

use chrono::{Duration, Utc};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use std::sync::Arc;

use crate::models::generate_object_id;
use crate::models::oauth_state::{self, ActiveModel, Entity, Model};

/// Lifetime of an in-flight OAuth dance.
pub const OAUTH_STATE_TTL_MINUTES: i64 = 15;

pub struct OAuthStateRepository {
    db: Arc<DatabaseConnection>,
}

impl OAuthStateRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Store the state for a new dance, discarding any earlier one for the same pair.
    pub async fn replace(
        &self,
        user_id: &str,
        provider: &str,
        state: &str,
        token_secret: Option<String>,
    ) -> Result<Model, sea_orm::DbErr> {
        Entity::delete_many()
            .filter(oauth_state::Column::UserId.eq(user_id))
            .filter(oauth_state::Column::Provider.eq(provider))
            .exec(&*self.db)
            .await?;

        let now = Utc::now();
        let model = Model {
            id: generate_object_id(),
            user_id: user_id.to_string(),
            provider: provider.to_string(),
            state: state.to_string(),
            token_secret,
            expires_at: (now + Duration::minutes(OAUTH_STATE_TTL_MINUTES)).into(),
            created_at: now.into(),
        };

        Entity::insert(ActiveModel {
            id: Set(model.id.clone()),
            user_id: Set(model.user_id.clone()),
            provider: Set(model.provider.clone()),
            state: Set(model.state.clone()),
            token_secret: Set(model.token_secret.clone()),
            expires_at: Set(model.expires_at),
            created_at: Set(model.created_at),
        })
        .exec_without_returning(&*self.db)
        .await?;

        Ok(model)
    }

    /// Fetch and delete the pending state. Expired states are deleted and reported as absent.
    pub async fn take(&self, user_id: &str, provider: &str) -> Result<Option<Model>, sea_orm::DbErr> {
        let found = Entity::find()
            .filter(oauth_state::Column::UserId.eq(user_id))
            .filter(oauth_state::Column::Provider.eq(provider))
            .one(&*self.db)
            .await?;

        let Some(state) = found else {
            return Ok(None);
        };

        Entity::delete_by_id(state.id.clone()).exec(&*self.db).await?;

        if state.is_expired(Utc::now()) {
            tracing::debug!(user_id, provider, "Discarded expired OAuth state");
            return Ok(None);
        }

        Ok(Some(state))
    }
}
