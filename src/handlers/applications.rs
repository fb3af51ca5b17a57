//! # Developer Application Handlers
//!
//! OAuth2 client applications registered by users. Deactivation and secret resets revoke
//! every token CAS issued for the application before touching the record.

use axum::{
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use url::Url;
use utoipa::ToSchema;

use crate::auth::CurrentUser;
use crate::config::AppConfig;
use crate::error::{ApiError, forbidden, not_found, validation_error};
use crate::handlers::types::ListResponse;
use crate::models::api_application;
use crate::repositories::{ApiApplicationRepository, api_application::ApplicationChanges};
use crate::server::AppState;

pub const MAX_NAME_LENGTH: usize = 200;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApplicationLinks {
    pub html: String,
    #[serde(rename = "self")]
    pub self_: String,
}

/// Serialized application, including the client secret for its owner.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApplicationResponse {
    pub client_id: String,
    pub client_secret: String,
    pub name: String,
    pub description: Option<String>,
    pub home_url: String,
    pub callback_url: String,
    pub owner: String,
    pub date_created: DateTime<Utc>,
    pub links: ApplicationLinks,
}

impl ApplicationResponse {
    fn new(app: api_application::Model, config: &AppConfig) -> Self {
        let links = ApplicationLinks {
            html: app.absolute_url(config),
            self_: app.absolute_api_v2_url(config),
        };
        Self {
            client_id: app.client_id,
            client_secret: app.client_secret,
            name: app.name,
            description: app.description,
            home_url: app.home_url,
            callback_url: app.callback_url,
            owner: app.owner_id,
            date_created: app.date_created.with_timezone(&Utc),
            links,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateApplicationRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub home_url: String,
    pub callback_url: String,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateApplicationRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub home_url: Option<String>,
    #[serde(default)]
    pub callback_url: Option<String>,
}

fn validate_name(name: &str) -> Result<String, String> {
    let name = name.trim();
    if name.is_empty() {
        Err("This field may not be blank.".to_string())
    } else if name.chars().count() > MAX_NAME_LENGTH {
        Err(format!(
            "Ensure this field has no more than {MAX_NAME_LENGTH} characters."
        ))
    } else {
        Ok(name.to_string())
    }
}

fn validate_http_url(raw: &str) -> Result<String, String> {
    match Url::parse(raw.trim()) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.host().is_some() => {
            Ok(url.to_string())
        }
        _ => Err("Enter a valid URL.".to_string()),
    }
}

/// Collects per-field validation failures into a single 400.
#[derive(Default)]
struct FieldErrors(Map<String, Value>);

impl FieldErrors {
    fn check<T>(&mut self, field: &str, result: Result<T, String>) -> Option<T> {
        result
            .map_err(|message| {
                self.0.insert(field.to_string(), json!(message));
            })
            .ok()
    }

    fn into_result(self) -> Result<(), ApiError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(validation_error("Invalid application", Value::Object(self.0)))
        }
    }
}

fn owned_by(app: Option<api_application::Model>, user: &CurrentUser) -> Result<api_application::Model, ApiError> {
    let app = app.ok_or_else(|| not_found("Application not found"))?;
    if app.owner_id != user.id() {
        return Err(forbidden(None));
    }
    Ok(app)
}

async fn load_owned(
    state: &AppState,
    client_id: &str,
    user: &CurrentUser,
) -> Result<api_application::Model, ApiError> {
    let app = ApiApplicationRepository::new(state.db_arc())
        .find_active(client_id)
        .await?;
    owned_by(app, user)
}

/// List your active applications
#[utoipa::path(
    get,
    path = "/v2/applications",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Applications", body = ListResponse<ApplicationResponse>),
        (status = 401, description = "Not logged in", body = ApiError)
    ),
    tag = "applications"
)]
pub async fn list_applications(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<ListResponse<ApplicationResponse>>, ApiError> {
    let apps = ApiApplicationRepository::new(state.db_arc())
        .list_active_for_owner(user.id())
        .await?;
    Ok(Json(
        apps.into_iter()
            .map(|app| ApplicationResponse::new(app, &state.config))
            .collect(),
    ))
}

/// Register an application
#[utoipa::path(
    post,
    path = "/v2/applications",
    security(("bearer_auth" = [])),
    request_body = CreateApplicationRequest,
    responses(
        (status = 201, description = "Application registered", body = ApplicationResponse),
        (status = 400, description = "Invalid fields", body = ApiError),
        (status = 401, description = "Not logged in", body = ApiError)
    ),
    tag = "applications"
)]
pub async fn create_application(
    State(state): State<AppState>,
    user: CurrentUser,
    payload: Result<Json<CreateApplicationRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApplicationResponse>), ApiError> {
    let Json(body) = payload?;

    let mut errors = FieldErrors::default();
    let name = errors.check("name", validate_name(&body.name));
    let home_url = errors.check("home_url", validate_http_url(&body.home_url));
    let callback_url = errors.check("callback_url", validate_http_url(&body.callback_url));
    errors.into_result()?;

    let (Some(name), Some(home_url), Some(callback_url)) = (name, home_url, callback_url) else {
        return Err(anyhow::anyhow!("validated application fields missing").into());
    };

    let app = ApiApplicationRepository::new(state.db_arc())
        .create(
            user.id(),
            &name,
            body.description.filter(|d| !d.trim().is_empty()),
            &home_url,
            &callback_url,
        )
        .await?;

    tracing::info!(client_id = %app.client_id, owner_id = %user.id(), "Application registered");
    metrics::counter!("applications_created_total").increment(1);

    Ok((
        StatusCode::CREATED,
        Json(ApplicationResponse::new(app, &state.config)),
    ))
}

/// Retrieve one of your applications
#[utoipa::path(
    get,
    path = "/v2/applications/{client_id}",
    security(("bearer_auth" = [])),
    params(("client_id" = String, Path, description = "OAuth2 client id")),
    responses(
        (status = 200, description = "Application", body = ApplicationResponse),
        (status = 403, description = "Not the owner", body = ApiError),
        (status = 404, description = "Unknown or inactive application", body = ApiError)
    ),
    tag = "applications"
)]
pub async fn get_application(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(client_id): Path<String>,
) -> Result<Json<ApplicationResponse>, ApiError> {
    let app = load_owned(&state, &client_id, &user).await?;
    Ok(Json(ApplicationResponse::new(app, &state.config)))
}

/// Edit an application
#[utoipa::path(
    patch,
    path = "/v2/applications/{client_id}",
    security(("bearer_auth" = [])),
    params(("client_id" = String, Path, description = "OAuth2 client id")),
    request_body = UpdateApplicationRequest,
    responses(
        (status = 200, description = "Updated application", body = ApplicationResponse),
        (status = 400, description = "Invalid fields", body = ApiError),
        (status = 403, description = "Not the owner", body = ApiError),
        (status = 404, description = "Unknown or inactive application", body = ApiError)
    ),
    tag = "applications"
)]
pub async fn update_application(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(client_id): Path<String>,
    payload: Result<Json<UpdateApplicationRequest>, JsonRejection>,
) -> Result<Json<ApplicationResponse>, ApiError> {
    let Json(body) = payload?;
    let app = load_owned(&state, &client_id, &user).await?;

    let mut errors = FieldErrors::default();
    let changes = ApplicationChanges {
        name: body
            .name
            .as_deref()
            .and_then(|n| errors.check("name", validate_name(n))),
        description: body
            .description
            .map(|d| Some(d).filter(|d| !d.trim().is_empty())),
        home_url: body
            .home_url
            .as_deref()
            .and_then(|u| errors.check("home_url", validate_http_url(u))),
        callback_url: body
            .callback_url
            .as_deref()
            .and_then(|u| errors.check("callback_url", validate_http_url(u))),
    };
    errors.into_result()?;

    let app = ApiApplicationRepository::new(state.db_arc())
        .update(app, changes)
        .await?;
    tracing::info!(client_id = %app.client_id, "Application updated");
    Ok(Json(ApplicationResponse::new(app, &state.config)))
}

/// Deactivate an application and revoke its tokens
#[utoipa::path(
    delete,
    path = "/v2/applications/{client_id}",
    security(("bearer_auth" = [])),
    params(("client_id" = String, Path, description = "OAuth2 client id")),
    responses(
        (status = 204, description = "Application deactivated"),
        (status = 403, description = "Not the owner", body = ApiError),
        (status = 404, description = "Unknown or inactive application", body = ApiError),
        (status = 502, description = "CAS did not confirm revocation", body = ApiError)
    ),
    tag = "applications"
)]
pub async fn deactivate_application(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(client_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let app = load_owned(&state, &client_id, &user).await?;

    state
        .cas
        .revoke_application_tokens(&app.client_id, &app.client_secret)
        .await?;
    let app = ApiApplicationRepository::new(state.db_arc())
        .deactivate(app)
        .await?;

    tracing::info!(client_id = %app.client_id, owner_id = %user.id(), "Application deactivated");
    metrics::counter!("applications_deactivated_total").increment(1);
    Ok(StatusCode::NO_CONTENT)
}

/// Revoke all tokens and issue a new client secret
#[utoipa::path(
    post,
    path = "/v2/applications/{client_id}/reset_secret",
    security(("bearer_auth" = [])),
    params(("client_id" = String, Path, description = "OAuth2 client id")),
    responses(
        (status = 200, description = "Application with its new secret", body = ApplicationResponse),
        (status = 403, description = "Not the owner", body = ApiError),
        (status = 404, description = "Unknown or inactive application", body = ApiError),
        (status = 502, description = "CAS did not confirm revocation", body = ApiError)
    ),
    tag = "applications"
)]
pub async fn reset_secret(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(client_id): Path<String>,
) -> Result<Json<ApplicationResponse>, ApiError> {
    let app = load_owned(&state, &client_id, &user).await?;

    state
        .cas
        .revoke_application_tokens(&app.client_id, &app.client_secret)
        .await?;
    let app = ApiApplicationRepository::new(state.db_arc())
        .rotate_secret(app)
        .await?;

    tracing::info!(client_id = %app.client_id, "Application secret reset");
    Ok(Json(ApplicationResponse::new(app, &state.config)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_trimmed_and_bounded() {
        assert_eq!(validate_name("  App "), Ok("App".to_string()));
        assert!(validate_name("   ").is_err());
        assert!(validate_name(&"a".repeat(MAX_NAME_LENGTH)).is_ok());
        assert!(validate_name(&"a".repeat(MAX_NAME_LENGTH + 1)).is_err());
    }

    #[test]
    fn only_http_urls_are_accepted() {
        assert!(validate_http_url("https://example.com/cb").is_ok());
        assert!(validate_http_url("http://localhost:3000").is_ok());
        assert_eq!(validate_http_url("ftp://example.com"), Err("Enter a valid URL.".to_string()));
        assert!(validate_http_url("not a url").is_err());
    }

    #[test]
    fn field_errors_collect_every_failure() {
        let mut errors = FieldErrors::default();
        assert_eq!(errors.check("name", validate_name("ok")), Some("ok".to_string()));
        assert_eq!(errors.check("home_url", validate_http_url("nope")), None);
        assert_eq!(errors.check("callback_url", validate_http_url("nope")), None);

        let err = errors.into_result().unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        let details = err.details.unwrap();
        assert_eq!(details["home_url"], "Enter a valid URL.");
        assert_eq!(details["callback_url"], "Enter a valid URL.");
    }
}
