//! # Comment Handlers
//!
//! Comments on nodes and the abuse reports embedded in each comment.

use std::sync::Arc;

use axum::{
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sea_orm::TransactionTrait;
use serde_json::json;
use utoipa::ToSchema;

use crate::auth::CurrentUser;
use crate::error::{ApiError, bad_request, forbidden, gone, not_found, validation_error};
use crate::handlers::types::{CommentPath, CommentReportPath, ListResponse, NodePath};
use crate::models::comment::{self, CommentError, ReportCategory};
use crate::repositories::comment as comment_store;
use crate::repositories::{CommentRepository, NodeRepository};
use crate::server::AppState;

/// Serialized comment
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CommentResponse {
    pub id: String,
    pub node_id: String,
    /// Author user id
    pub user_id: String,
    pub content: String,
    pub deleted: bool,
    pub modified: bool,
    pub date_created: DateTime<Utc>,
    pub date_modified: DateTime<Utc>,
}

impl From<comment::Model> for CommentResponse {
    fn from(model: comment::Model) -> Self {
        Self {
            id: model.id,
            node_id: model.node_id,
            user_id: model.user_id,
            content: model.content,
            deleted: model.is_deleted,
            modified: model.modified,
            date_created: model.created_at.with_timezone(&Utc),
            date_modified: model.modified_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CommentCreateRequest {
    pub content: String,
}

/// Partial comment update. `deleted` soft-deletes or restores the comment.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CommentUpdateRequest {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub deleted: Option<bool>,
}

/// One user's abuse report; `id` is the reporter's user id.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CommentReportResponse {
    pub id: String,
    pub category: ReportCategory,
    pub message: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CommentReportRequest {
    /// One of `spam`, `hate`, `violence`
    pub category: String,
    #[serde(default)]
    pub message: Option<String>,
}

impl From<CommentError> for ApiError {
    fn from(error: CommentError) -> Self {
        match error {
            CommentError::EmptyContent | CommentError::ContentTooLong => validation_error(
                "Invalid comment content",
                json!({ "content": error.to_string() }),
            ),
            other => bad_request(&other.to_string()),
        }
    }
}

/// Fetch a comment by id, optionally checking that the viewer may read its node.
async fn get_comment_checked(
    state: &AppState,
    comment_id: &str,
    viewer: Option<&CurrentUser>,
    check_permissions: bool,
) -> Result<comment::Model, ApiError> {
    let db = state.db_arc();
    let comment = CommentRepository::new(Arc::clone(&db))
        .find_by_id(comment_id)
        .await?
        .ok_or_else(|| not_found("Comment not found"))?;

    if check_permissions {
        let nodes = NodeRepository::new(db);
        let node = nodes
            .find_by_id(&comment.node_id)
            .await?
            .ok_or_else(|| not_found("Node not found"))?;
        if !nodes.can_view(&node, viewer.map(CurrentUser::id)).await? {
            return Err(forbidden(None));
        }
    }

    Ok(comment)
}

const REPORT_GONE: &str = "The requested comment report is no longer available.";

/// Re-read the comment under a row lock, apply `change` and save it in one transaction.
async fn update_locked<T>(
    state: &AppState,
    comment_id: &str,
    change: impl FnOnce(&mut comment::Model) -> Result<T, ApiError>,
) -> Result<(comment::Model, T), ApiError> {
    let db = state.db_arc();
    let txn = db.begin().await?;
    let mut comment = comment_store::find_for_update(&txn, comment_id)
        .await?
        .ok_or_else(|| not_found("Comment not found"))?;
    let value = change(&mut comment)?;
    let saved = comment_store::save_in(&txn, comment).await?;
    txn.commit().await?;
    Ok((saved, value))
}

fn parse_category(raw: &str) -> Result<ReportCategory, ApiError> {
    raw.parse::<ReportCategory>()
        .map_err(|message| validation_error("Invalid report", json!({ "category": message })))
}

fn report_response(user_id: &str, report: &comment::Report) -> CommentReportResponse {
    CommentReportResponse {
        id: user_id.to_string(),
        category: report.category,
        message: report.text.clone(),
    }
}

/// Retrieve a comment
#[utoipa::path(
    get,
    path = "/v2/comments/{comment_id}",
    security((), ("bearer_auth" = [])),
    params(("comment_id" = String, Path, description = "Comment id")),
    responses(
        (status = 200, description = "Comment", body = CommentResponse),
        (status = 403, description = "Viewer cannot read the node", body = ApiError),
        (status = 404, description = "Comment not found", body = ApiError)
    ),
    tag = "comments"
)]
pub async fn get_comment(
    State(state): State<AppState>,
    viewer: Option<CurrentUser>,
    Path(path): Path<CommentPath>,
) -> Result<Json<CommentResponse>, ApiError> {
    let comment = get_comment_checked(&state, &path.comment_id, viewer.as_ref(), true).await?;
    Ok(Json(comment.into()))
}

/// Edit, delete or restore a comment (author only)
#[utoipa::path(
    put,
    path = "/v2/comments/{comment_id}",
    security(("bearer_auth" = [])),
    params(("comment_id" = String, Path, description = "Comment id")),
    request_body = CommentUpdateRequest,
    responses(
        (status = 200, description = "Updated comment", body = CommentResponse),
        (status = 400, description = "Invalid content or comment is deleted", body = ApiError),
        (status = 401, description = "Not logged in", body = ApiError),
        (status = 403, description = "Not the author", body = ApiError),
        (status = 404, description = "Comment not found", body = ApiError)
    ),
    tag = "comments"
)]
pub async fn update_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(path): Path<CommentPath>,
    payload: Result<Json<CommentUpdateRequest>, JsonRejection>,
) -> Result<Json<CommentResponse>, ApiError> {
    let Json(body) = payload?;
    let mut comment = get_comment_checked(&state, &path.comment_id, Some(&user), true).await?;

    if comment.user_id != user.id() {
        return Err(forbidden(Some("Only the author may edit this comment.")));
    }

    let now = Utc::now().into();
    if let Some(deleted) = body.deleted {
        comment.is_deleted = deleted;
        comment.modified_at = now;
    }
    if let Some(content) = body.content.as_deref() {
        comment.edit(content, now)?;
    }

    let saved = CommentRepository::new(state.db_arc()).save(comment).await?;
    tracing::info!(comment_id = %saved.id, user_id = %user.id(), deleted = saved.is_deleted, "Comment updated");
    Ok(Json(saved.into()))
}

/// List a node's comments, oldest first
#[utoipa::path(
    get,
    path = "/v2/nodes/{node_id}/comments",
    security((), ("bearer_auth" = [])),
    params(("node_id" = String, Path, description = "Node id")),
    responses(
        (status = 200, description = "Comments on the node", body = ListResponse<CommentResponse>),
        (status = 403, description = "Viewer cannot read the node", body = ApiError),
        (status = 404, description = "Node not found", body = ApiError)
    ),
    tag = "comments"
)]
pub async fn list_node_comments(
    State(state): State<AppState>,
    viewer: Option<CurrentUser>,
    Path(path): Path<NodePath>,
) -> Result<Json<ListResponse<CommentResponse>>, ApiError> {
    let db = state.db_arc();
    let nodes = NodeRepository::new(Arc::clone(&db));
    let node = nodes
        .find_by_id(&path.node_id)
        .await?
        .filter(|n| !n.is_deleted)
        .ok_or_else(|| not_found("Node not found"))?;
    if !nodes.can_view(&node, viewer.as_ref().map(CurrentUser::id)).await? {
        return Err(forbidden(None));
    }

    let comments = CommentRepository::new(db).list_for_node(&node.id).await?;
    Ok(Json(comments.into_iter().map(Into::into).collect()))
}

/// Comment on a node
#[utoipa::path(
    post,
    path = "/v2/nodes/{node_id}/comments",
    security(("bearer_auth" = [])),
    params(("node_id" = String, Path, description = "Node id")),
    request_body = CommentCreateRequest,
    responses(
        (status = 201, description = "Comment created", body = CommentResponse),
        (status = 400, description = "Invalid content", body = ApiError),
        (status = 401, description = "Not logged in", body = ApiError),
        (status = 403, description = "Not a contributor on a private node", body = ApiError),
        (status = 404, description = "Node not found", body = ApiError)
    ),
    tag = "comments"
)]
pub async fn create_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(path): Path<NodePath>,
    payload: Result<Json<CommentCreateRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CommentResponse>), ApiError> {
    let Json(body) = payload?;
    let db = state.db_arc();
    let nodes = NodeRepository::new(Arc::clone(&db));
    let node = nodes
        .find_by_id(&path.node_id)
        .await?
        .filter(|n| !n.is_deleted)
        .ok_or_else(|| not_found("Node not found"))?;

    if !nodes.can_view(&node, Some(user.id())).await? {
        return Err(forbidden(Some(
            "You must be a contributor to comment on this node.",
        )));
    }

    let content = comment::validate_content(&body.content)?;
    let created = CommentRepository::new(db)
        .create(&node.id, user.id(), &content)
        .await?;

    tracing::info!(comment_id = %created.id, node_id = %node.id, user_id = %user.id(), "Comment created");
    Ok((StatusCode::CREATED, Json(created.into())))
}

/// List the abuse reports on a comment
#[utoipa::path(
    get,
    path = "/v2/comments/{comment_id}/reports",
    security(("bearer_auth" = [])),
    params(("comment_id" = String, Path, description = "Comment id")),
    responses(
        (status = 200, description = "Reports", body = ListResponse<CommentReportResponse>),
        (status = 403, description = "Viewer cannot read the node", body = ApiError),
        (status = 404, description = "Comment not found", body = ApiError)
    ),
    tag = "comments"
)]
pub async fn list_reports(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(path): Path<CommentPath>,
) -> Result<Json<ListResponse<CommentReportResponse>>, ApiError> {
    let comment = get_comment_checked(&state, &path.comment_id, Some(&user), true).await?;
    Ok(Json(
        comment
            .reports
            .0
            .iter()
            .map(|(user_id, report)| report_response(user_id, report))
            .collect(),
    ))
}

/// Report a comment as abusive
#[utoipa::path(
    post,
    path = "/v2/comments/{comment_id}/reports",
    security(("bearer_auth" = [])),
    params(("comment_id" = String, Path, description = "Comment id")),
    request_body = CommentReportRequest,
    responses(
        (status = 201, description = "Report recorded", body = CommentReportResponse),
        (status = 400, description = "Invalid category or own comment", body = ApiError),
        (status = 401, description = "Not logged in", body = ApiError),
        (status = 404, description = "Comment not found", body = ApiError)
    ),
    tag = "comments"
)]
pub async fn create_report(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(path): Path<CommentPath>,
    payload: Result<Json<CommentReportRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CommentReportResponse>), ApiError> {
    let Json(body) = payload?;
    let category = parse_category(&body.category)?;
    get_comment_checked(&state, &path.comment_id, Some(&user), true).await?;

    let (saved, ()) = update_locked(&state, &path.comment_id, |comment| {
        comment.report_abuse(user.id(), category, body.message.unwrap_or_default())?;
        Ok(())
    })
    .await?;

    let report = saved
        .reports
        .0
        .get(user.id())
        .map(|report| report_response(user.id(), report))
        .ok_or_else(|| anyhow::anyhow!("report missing after save"))?;

    tracing::info!(comment_id = %saved.id, user_id = %user.id(), category = %category, "Comment reported");
    Ok((StatusCode::CREATED, Json(report)))
}

/// Resolve the report at `path`, or 410 if it is gone.
async fn get_report_checked(
    state: &AppState,
    path: &CommentReportPath,
    user: &CurrentUser,
) -> Result<(comment::Model, CommentReportResponse), ApiError> {
    let comment = get_comment_checked(state, &path.comment_id, Some(user), true).await?;
    let report = comment
        .reports
        .0
        .get(&path.user_id)
        .map(|report| report_response(&path.user_id, report))
        .ok_or_else(|| gone(REPORT_GONE))?;
    Ok((comment, report))
}

/// Retrieve one user's report
#[utoipa::path(
    get,
    path = "/v2/comments/{comment_id}/reports/{user_id}",
    security(("bearer_auth" = [])),
    params(
        ("comment_id" = String, Path, description = "Comment id"),
        ("user_id" = String, Path, description = "Reporter user id")
    ),
    responses(
        (status = 200, description = "Report", body = CommentReportResponse),
        (status = 404, description = "Comment not found", body = ApiError),
        (status = 410, description = "Report no longer available", body = ApiError)
    ),
    tag = "comments"
)]
pub async fn get_report(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(path): Path<CommentReportPath>,
) -> Result<Json<CommentReportResponse>, ApiError> {
    let (_, report) = get_report_checked(&state, &path, &user).await?;
    Ok(Json(report))
}

/// Edit your own report
#[utoipa::path(
    put,
    path = "/v2/comments/{comment_id}/reports/{user_id}",
    security(("bearer_auth" = [])),
    params(
        ("comment_id" = String, Path, description = "Comment id"),
        ("user_id" = String, Path, description = "Reporter user id")
    ),
    request_body = CommentReportRequest,
    responses(
        (status = 200, description = "Updated report", body = CommentReportResponse),
        (status = 400, description = "Invalid category", body = ApiError),
        (status = 403, description = "Not the reporter", body = ApiError),
        (status = 410, description = "Report no longer available", body = ApiError)
    ),
    tag = "comments"
)]
pub async fn update_report(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(path): Path<CommentReportPath>,
    payload: Result<Json<CommentReportRequest>, JsonRejection>,
) -> Result<Json<CommentReportResponse>, ApiError> {
    let Json(body) = payload?;
    get_report_checked(&state, &path, &user).await?;
    if path.user_id != user.id() {
        return Err(forbidden(Some("You may only edit your own report.")));
    }

    let category = parse_category(&body.category)?;
    let (_, text) = update_locked(&state, &path.comment_id, |comment| {
        let text = match body.message {
            Some(text) => text,
            None => comment
                .reports
                .0
                .get(user.id())
                .map(|report| report.text.clone())
                .ok_or_else(|| gone(REPORT_GONE))?,
        };
        comment.report_abuse(user.id(), category, text.clone())?;
        Ok(text)
    })
    .await?;

    Ok(Json(CommentReportResponse {
        id: path.user_id,
        category,
        message: text,
    }))
}

/// Withdraw your own report
#[utoipa::path(
    delete,
    path = "/v2/comments/{comment_id}/reports/{user_id}",
    security(("bearer_auth" = [])),
    params(
        ("comment_id" = String, Path, description = "Comment id"),
        ("user_id" = String, Path, description = "Reporter user id")
    ),
    responses(
        (status = 204, description = "Report withdrawn"),
        (status = 400, description = "Current user has not reported the comment", body = ApiError),
        (status = 403, description = "Not the reporter", body = ApiError),
        (status = 410, description = "Report no longer available", body = ApiError)
    ),
    tag = "comments"
)]
pub async fn delete_report(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(path): Path<CommentReportPath>,
) -> Result<StatusCode, ApiError> {
    get_report_checked(&state, &path, &user).await?;
    if path.user_id != user.id() {
        return Err(forbidden(Some("You may only withdraw your own report.")));
    }

    update_locked(&state, &path.comment_id, |comment| {
        if !comment.reports.0.contains_key(user.id()) {
            return Err(gone(REPORT_GONE));
        }
        comment
            .unreport_abuse(user.id())
            .map_err(|e| bad_request(&e.to_string()))
    })
    .await?;

    tracing::info!(comment_id = %path.comment_id, user_id = %user.id(), "Comment report withdrawn");
    Ok(StatusCode::NO_CONTENT)
}
