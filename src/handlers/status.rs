use axum::{extract::State, response::Json};

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::handlers::types::ListResponse;
use crate::models::status_message::StatusMessageResponse;
use crate::repositories::StatusMessageRepository;
use crate::server::AppState;

/// Pop your queued status messages
///
/// Each message is returned once and then discarded.
#[utoipa::path(
    get,
    path = "/v2/users/me/status_messages",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Queued messages, oldest first", body = ListResponse<StatusMessageResponse>),
        (status = 401, description = "Not logged in", body = ApiError)
    ),
    tag = "status"
)]
pub async fn pop_status_messages(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<ListResponse<StatusMessageResponse>>, ApiError> {
    let messages = StatusMessageRepository::new(state.db_arc())
        .pop_all(user.id())
        .await?;
    Ok(Json(messages.into_iter().map(Into::into).collect()))
}
