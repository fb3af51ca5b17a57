//! External account repository.
//!
//! Credentials are sealed with the application crypto key on the way in and opened only
//! through [`ExternalAccountRepository::open_credentials`].

use std::sync::Arc;

use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

use crate::crypto::{CryptoKey, open_credential, seal_credential};
use crate::error::is_unique_violation;
use crate::models::external_account::{self, Entity as ExternalAccount, Model};
use crate::models::generate_object_id;
use crate::models::user_external_account::{self, Entity as UserExternalAccount};

/// Plaintext credentials and profile data produced by a completed OAuth dance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccountCredentials {
    pub provider: String,
    pub provider_name: String,
    pub provider_id: String,
    pub oauth_key: Option<String>,
    pub oauth_secret: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub scopes: Vec<String>,
    pub display_name: Option<String>,
    pub profile_url: Option<String>,
}

/// Opened credentials of a stored account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenedCredentials {
    pub oauth_key: Option<String>,
    pub oauth_secret: Option<String>,
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ExternalAccountRepository {
    db: Arc<DatabaseConnection>,
    crypto_key: CryptoKey,
}

impl ExternalAccountRepository {
    pub fn new(db: Arc<DatabaseConnection>, crypto_key: CryptoKey) -> Self {
        Self { db, crypto_key }
    }

    pub async fn find_by_provider_id(
        &self,
        provider: &str,
        provider_id: &str,
    ) -> Result<Option<Model>, sea_orm::DbErr> {
        ExternalAccount::find()
            .filter(external_account::Column::Provider.eq(provider))
            .filter(external_account::Column::ProviderId.eq(provider_id))
            .one(&*self.db)
            .await
    }

    /// Create the account, or refresh the stored credentials when
    /// `(provider, provider_id)` already exists.
    pub async fn upsert(&self, creds: &AccountCredentials) -> Result<Model> {
        let seal = |value: Option<&str>| {
            seal_credential(&self.crypto_key, &creds.provider, &creds.provider_id, value)
                .map_err(|e| anyhow!("Credential encryption failed: {e}"))
        };
        let oauth_key = seal(creds.oauth_key.as_deref())?;
        let oauth_secret = seal(creds.oauth_secret.as_deref())?;
        let refresh_token = seal(creds.refresh_token.as_deref())?;
        let now = Utc::now();
        let scopes = serde_json::to_value(&creds.scopes)?;

        let fresh = external_account::ActiveModel {
            id: Set(generate_object_id()),
            provider: Set(creds.provider.clone()),
            provider_name: Set(creds.provider_name.clone()),
            provider_id: Set(creds.provider_id.clone()),
            oauth_key: Set(oauth_key.clone()),
            oauth_secret: Set(oauth_secret.clone()),
            refresh_token: Set(refresh_token.clone()),
            expires_at: Set(creds.expires_at.map(Into::into)),
            scopes: Set(scopes.clone()),
            display_name: Set(creds.display_name.clone()),
            profile_url: Set(creds.profile_url.clone()),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        match fresh.insert(&*self.db).await {
            Ok(model) => {
                tracing::info!(
                    provider = %creds.provider,
                    provider_id = %creds.provider_id,
                    "Created external account"
                );
                return Ok(model);
            }
            Err(err) if is_unique_violation(&err) => {}
            Err(err) => return Err(err.into()),
        }

        let existing = self
            .find_by_provider_id(&creds.provider, &creds.provider_id)
            .await?
            .ok_or_else(|| anyhow!("External account vanished during upsert"))?;

        let mut active: external_account::ActiveModel = existing.into();
        active.provider_name = Set(creds.provider_name.clone());
        active.oauth_key = Set(oauth_key);
        active.oauth_secret = Set(oauth_secret);
        active.refresh_token = Set(refresh_token);
        active.expires_at = Set(creds.expires_at.map(Into::into));
        active.scopes = Set(scopes);
        active.display_name = Set(creds.display_name.clone());
        active.profile_url = Set(creds.profile_url.clone());
        active.updated_at = Set(now.into());

        let updated = active.update(&*self.db).await?;
        tracing::info!(
            provider = %creds.provider,
            provider_id = %creds.provider_id,
            "Refreshed credentials on existing external account"
        );
        Ok(updated)
    }

    /// Link the account to a user. Returns false if it was already linked.
    pub async fn link_user(&self, user_id: &str, account_id: &str) -> Result<bool, sea_orm::DbErr> {
        let existing = UserExternalAccount::find_by_id((user_id.to_string(), account_id.to_string()))
            .one(&*self.db)
            .await?;
        if existing.is_some() {
            return Ok(false);
        }

        let link = user_external_account::ActiveModel {
            user_id: Set(user_id.to_string()),
            external_account_id: Set(account_id.to_string()),
            created_at: Set(Utc::now().into()),
        };
        match UserExternalAccount::insert(link)
            .exec_without_returning(&*self.db)
            .await
        {
            Ok(_) => Ok(true),
            Err(err) if is_unique_violation(&err) => Ok(false),
            Err(err) => Err(err),
        }
    }

    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<Model>, sea_orm::DbErr> {
        ExternalAccount::find()
            .inner_join(UserExternalAccount)
            .filter(user_external_account::Column::UserId.eq(user_id))
            .order_by_asc(external_account::Column::Provider)
            .order_by_asc(external_account::Column::CreatedAt)
            .all(&*self.db)
            .await
    }

    /// Remove the user's link to an account. Returns false if no link existed.
    pub async fn unlink_user(&self, user_id: &str, account_id: &str) -> Result<bool, sea_orm::DbErr> {
        let result = UserExternalAccount::delete_by_id((user_id.to_string(), account_id.to_string()))
            .exec(&*self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    pub fn open_credentials(&self, account: &Model) -> Result<OpenedCredentials> {
        let open = |sealed: Option<&Vec<u8>>| {
            open_credential(
                &self.crypto_key,
                &account.provider,
                &account.provider_id,
                sealed.map(Vec::as_slice),
            )
            .map_err(|e| {
                tracing::error!(
                    provider = %account.provider,
                    account_id = %account.id,
                    "Credential decryption failed"
                );
                anyhow!("Credential decryption failed: {e}")
            })
        };

        Ok(OpenedCredentials {
            oauth_key: open(account.oauth_key.as_ref())?,
            oauth_secret: open(account.oauth_secret.as_ref())?,
            refresh_token: open(account.refresh_token.as_ref())?,
        })
    }
}
