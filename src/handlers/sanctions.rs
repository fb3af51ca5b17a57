//! # Sanction Handlers
//!
//! Starting registrations and retractions. Both create a sanction that the node's admins
//! must approve through the token links mailed to them.

use axum::{
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::handlers::types::NodePath;
use crate::models::{
    node,
    sanction::{self, ApprovalMode, SanctionKind, SanctionState},
};
use crate::server::AppState;

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CreateRegistrationRequest {
    /// Registers under an embargo lifted at this date instead of immediately
    #[serde(default)]
    pub embargo_end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct RetractionRequest {
    #[serde(default)]
    pub justification: Option<String>,
}

/// Sanction summary. Approval tokens are never exposed.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SanctionResponse {
    pub id: String,
    pub kind: SanctionKind,
    pub state: SanctionState,
    pub mode: ApprovalMode,
    pub initiated_by: String,
    /// User ids whose approval is required
    pub authorizers: Vec<String>,
    pub end_date: Option<DateTime<Utc>>,
    pub justification: Option<String>,
    pub date_created: DateTime<Utc>,
}

impl From<sanction::Model> for SanctionResponse {
    fn from(model: sanction::Model) -> Self {
        Self {
            authorizers: model.approval_state.0.keys().cloned().collect(),
            id: model.id,
            kind: model.kind,
            state: model.state,
            mode: model.mode,
            initiated_by: model.initiated_by,
            end_date: model.end_date.map(|d| d.with_timezone(&Utc)),
            justification: model.justification,
            date_created: model.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RegistrationResponse {
    pub id: String,
    pub title: String,
    pub registered_from: Option<String>,
    pub is_public: bool,
    pub sanction: SanctionResponse,
}

impl RegistrationResponse {
    fn new(registration: node::Model, sanction: sanction::Model) -> Self {
        Self {
            id: registration.id,
            title: registration.title,
            registered_from: registration.registered_from_id,
            is_public: registration.is_public,
            sanction: sanction.into(),
        }
    }
}

/// Register a project
#[utoipa::path(
    post,
    path = "/v2/nodes/{node_id}/registrations",
    security(("bearer_auth" = [])),
    params(("node_id" = String, Path, description = "Project to register")),
    request_body = CreateRegistrationRequest,
    responses(
        (status = 201, description = "Registration pending approval", body = RegistrationResponse),
        (status = 400, description = "Invalid embargo date or node is a registration", body = ApiError),
        (status = 401, description = "Not logged in", body = ApiError),
        (status = 403, description = "Not a project admin", body = ApiError),
        (status = 404, description = "Node not found", body = ApiError)
    ),
    tag = "sanctions"
)]
pub async fn create_registration(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(path): Path<NodePath>,
    payload: Result<Json<CreateRegistrationRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RegistrationResponse>), ApiError> {
    let Json(body) = payload?;
    let (registration, sanction) = state
        .sanction_service()
        .create_registration(&path.node_id, user.id(), body.embargo_end_date)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegistrationResponse::new(registration, sanction)),
    ))
}

/// Request that a registration be retracted
#[utoipa::path(
    post,
    path = "/v2/registrations/{registration_id}/retraction",
    security(("bearer_auth" = [])),
    params(("registration_id" = String, Path, description = "Registration to retract")),
    request_body = RetractionRequest,
    responses(
        (status = 201, description = "Retraction pending approval", body = SanctionResponse),
        (status = 400, description = "Not a registration, or already retracted or pending", body = ApiError),
        (status = 401, description = "Not logged in", body = ApiError),
        (status = 403, description = "Not a registration admin", body = ApiError),
        (status = 404, description = "Registration not found", body = ApiError)
    ),
    tag = "sanctions"
)]
pub async fn request_retraction(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(registration_id): Path<String>,
    payload: Result<Json<RetractionRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SanctionResponse>), ApiError> {
    let Json(body) = payload?;
    let justification = body
        .justification
        .map(|j| j.trim().to_string())
        .filter(|j| !j.is_empty());

    let sanction = state
        .sanction_service()
        .request_retraction(&registration_id, user.id(), justification)
        .await?;

    Ok((StatusCode::CREATED, Json(sanction.into())))
}
