use axum::{
    extract::{Path, State},
    response::Response,
};

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::handlers::types::found;
use crate::server::AppState;
use crate::tokens::TokenHandler;

/// Redeem an emailed approve or reject link
///
/// Applies the decision as the logged-in user, queues a status message and redirects to
/// the affected project or registration.
#[utoipa::path(
    get,
    path = "/token_action/{token}",
    security(("bearer_auth" = [])),
    params(("token" = String, Path, description = "Signed sanction token")),
    responses(
        (status = 302, description = "Decision recorded; redirect to the node page"),
        (status = 400, description = "Invalid, expired or unsupported token", body = ApiError),
        (status = 401, description = "Not logged in or not an authorizer", body = ApiError),
        (status = 410, description = "Registration already rejected", body = ApiError)
    ),
    tag = "sanctions"
)]
pub async fn token_action(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(token): Path<String>,
) -> Result<Response, ApiError> {
    let handler = TokenHandler::from_string(&state.token_signer, &token)?;
    tracing::debug!(
        sanction_id = %handler.claims().sanction_id,
        action = %handler.claims().action,
        user_id = %user.id(),
        "Redeeming sanction token"
    );

    let location = handler
        .to_response(&state.db, &state.config, user.id())
        .await?;
    Ok(found(&location))
}
