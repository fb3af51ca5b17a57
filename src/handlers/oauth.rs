//! # External Account Handlers
//!
//! Starting and finishing OAuth dances, and managing the accounts linked to the current user.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State, rejection::QueryRejection},
    http::StatusCode,
    response::{Json, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::CurrentUser;
use crate::error::{ApiError, not_found};
use crate::handlers::types::{ListResponse, found};
use crate::models::external_account;
use crate::providers::OAuthFlow;
use crate::repositories::ExternalAccountRepository;
use crate::server::AppState;

/// Linked account summary. Credentials are never included.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ExternalAccountResponse {
    pub id: String,
    pub provider: String,
    pub provider_name: String,
    pub provider_id: String,
    pub display_name: Option<String>,
    pub profile_url: Option<String>,
    pub scopes: Vec<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<external_account::Model> for ExternalAccountResponse {
    fn from(model: external_account::Model) -> Self {
        let scopes = serde_json::from_value(model.scopes).unwrap_or_default();
        Self {
            id: model.id,
            provider: model.provider,
            provider_name: model.provider_name,
            provider_id: model.provider_id,
            display_name: model.display_name,
            profile_url: model.profile_url,
            scopes,
            expires_at: model.expires_at.map(|at| at.with_timezone(&Utc)),
        }
    }
}

fn flow_for(state: &AppState, service_name: &str) -> Result<OAuthFlow, ApiError> {
    let provider = state.providers.get(service_name)?;
    Ok(OAuthFlow::new(
        provider,
        state.http.clone(),
        state.db_arc(),
        state.crypto_key.clone(),
        Arc::clone(&state.config),
    ))
}

/// Start linking an external account
#[utoipa::path(
    get,
    path = "/oauth/connect/{service_name}",
    security(("bearer_auth" = [])),
    params(("service_name" = String, Path, description = "Provider short name, e.g. `github`")),
    responses(
        (status = 302, description = "Redirect to the provider's authorization page"),
        (status = 401, description = "Not logged in", body = ApiError),
        (status = 404, description = "Unknown provider", body = ApiError),
        (status = 503, description = "Provider unavailable", body = ApiError)
    ),
    tag = "oauth"
)]
pub async fn connect(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(service_name): Path<String>,
) -> Result<Response, ApiError> {
    let flow = flow_for(&state, &service_name)?;
    let url = flow.auth_url(user.id()).await?;
    Ok(found(&url))
}

/// Provider callback that finishes the OAuth dance
#[utoipa::path(
    get,
    path = "/oauth/callback/{service_name}",
    security(("bearer_auth" = [])),
    params(("service_name" = String, Path, description = "Provider short name")),
    responses(
        (status = 200, description = "Linked account", body = ExternalAccountResponse),
        (status = 400, description = "Missing callback parameter", body = ApiError),
        (status = 401, description = "Flow not recognized or token mismatch", body = ApiError),
        (status = 404, description = "Unknown provider", body = ApiError),
        (status = 503, description = "Token exchange failed", body = ApiError)
    ),
    tag = "oauth"
)]
pub async fn callback(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(service_name): Path<String>,
    query: Result<Query<HashMap<String, String>>, QueryRejection>,
) -> Result<Json<ExternalAccountResponse>, ApiError> {
    let Query(params) = query?;
    let flow = flow_for(&state, &service_name)?;
    let account = flow.auth_callback(user.id(), &params).await?;
    Ok(Json(account.into()))
}

/// List your linked external accounts
#[utoipa::path(
    get,
    path = "/v2/users/me/external_accounts",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Linked accounts", body = ListResponse<ExternalAccountResponse>),
        (status = 401, description = "Not logged in", body = ApiError)
    ),
    tag = "oauth"
)]
pub async fn list_external_accounts(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<ListResponse<ExternalAccountResponse>>, ApiError> {
    let accounts = ExternalAccountRepository::new(state.db_arc(), state.crypto_key.clone())
        .list_for_user(user.id())
        .await?;
    Ok(Json(accounts.into_iter().map(Into::into).collect()))
}

/// Unlink an external account from your user
#[utoipa::path(
    delete,
    path = "/v2/users/me/external_accounts/{account_id}",
    security(("bearer_auth" = [])),
    params(("account_id" = String, Path, description = "External account id")),
    responses(
        (status = 204, description = "Account unlinked"),
        (status = 401, description = "Not logged in", body = ApiError),
        (status = 404, description = "Account is not linked to you", body = ApiError)
    ),
    tag = "oauth"
)]
pub async fn unlink_external_account(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(account_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let unlinked = ExternalAccountRepository::new(state.db_arc(), state.crypto_key.clone())
        .unlink_user(user.id(), &account_id)
        .await?;
    if !unlinked {
        return Err(not_found("External account not found"));
    }

    tracing::info!(user_id = %user.id(), account_id = %account_id, "External account unlinked");
    Ok(StatusCode::NO_CONTENT)
}
