//! # Token Actions
//!
//! Redeems the signed approve/reject links mailed to sanction authorizers. A token names
//! the sanction and the decision; the logged-in user is the one deciding. The decision,
//! its effects on the registration and the user's status message commit together.

use axum::http::StatusCode;
use sea_orm::{DatabaseConnection, TransactionTrait};
use thiserror::Error;

use crate::config::AppConfig;
use crate::error::ApiError;
use crate::models::node;
use crate::models::sanction::{SanctionKind, SanctionState};
use crate::repositories::sanction as sanction_store;
use crate::repositories::status_message::push_status;
use crate::sanctions::{
    self, SanctionAction, SanctionClaims, SanctionError, TokenSigner, TokenSignerError, Transition,
};

#[derive(Debug, Error)]
pub enum TokenActionError {
    #[error(transparent)]
    Decode(#[from] TokenSignerError),
    #[error("Token action '{0}' is not supported")]
    UnsupportedAction(String),
    #[error(transparent)]
    Sanction(#[from] SanctionError),
    #[error("There is no sanction associated with this token")]
    NoSanction,
    #[error("This registration has been rejected")]
    Rejected,
    #[error(transparent)]
    Database(#[from] sea_orm::DbErr),
}

impl From<TokenActionError> for ApiError {
    fn from(error: TokenActionError) -> Self {
        let message = error.to_string();
        match error {
            TokenActionError::Decode(_) => {
                ApiError::http_error(StatusCode::BAD_REQUEST, "INVALID_TOKEN", "Bad request", &message)
            }
            TokenActionError::UnsupportedAction(_) => {
                ApiError::new(StatusCode::BAD_REQUEST, "UNSUPPORTED_ACTION", message)
            }
            TokenActionError::Sanction(SanctionError::Token {
                message_short,
                message_long,
            }) => ApiError::http_error(
                StatusCode::BAD_REQUEST,
                "INVALID_TOKEN",
                &message_short,
                &message_long,
            ),
            TokenActionError::Sanction(SanctionError::Permissions(long)) => ApiError::http_error(
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "Unauthorized access",
                &long,
            ),
            TokenActionError::Sanction(SanctionError::UnsupportedHandlerKind(_)) => {
                ApiError::new(StatusCode::BAD_REQUEST, "UNSUPPORTED_SANCTION_KIND", message)
            }
            TokenActionError::NoSanction => {
                ApiError::http_error(StatusCode::BAD_REQUEST, "INVALID_TOKEN", "Bad request", &message)
            }
            TokenActionError::Rejected => {
                ApiError::http_error(StatusCode::GONE, "GONE", "Resource deleted", &message)
            }
            TokenActionError::Database(e) => e.into(),
        }
    }
}

/// Split an `action` claim into its decision and the handler name of its sanction kind.
///
/// `approve_registration_approval` gives `(Approve, "registration")`.
pub fn parse_action(action: &str) -> Result<(SanctionAction, &str), TokenActionError> {
    let (decision, rest) = if let Some(rest) = action.strip_prefix("approve_") {
        (SanctionAction::Approve, rest)
    } else if let Some(rest) = action.strip_prefix("reject_") {
        (SanctionAction::Reject, rest)
    } else {
        return Err(TokenActionError::UnsupportedAction(action.to_string()));
    };

    let handler = match rest {
        "registration_approval" => "registration",
        other => other,
    };
    Ok((decision, handler))
}

/// Flash message shown after a decision was accepted.
pub fn status_message(kind: SanctionKind, action: SanctionAction) -> &'static str {
    match (kind, action) {
        (SanctionKind::RegistrationApproval, SanctionAction::Approve) => {
            "Your registration approval has been accepted."
        }
        (SanctionKind::RegistrationApproval, SanctionAction::Reject) => {
            "Your disapproval has been accepted and the registration has been cancelled."
        }
        (SanctionKind::Embargo, SanctionAction::Approve) => "Your embargo approval has been accepted.",
        (SanctionKind::Embargo, SanctionAction::Reject) => {
            "Your disapproval has been accepted and the embargo has been cancelled."
        }
        (SanctionKind::Retraction, SanctionAction::Approve) => {
            "Your retraction approval has been accepted."
        }
        (SanctionKind::Retraction, SanctionAction::Reject) => {
            "Your disapproval has been accepted and the retraction has been cancelled."
        }
    }
}

/// Node the user lands on after a decision.
///
/// Approving a retraction or rejecting a registration/embargo leaves the registration
/// unusable, so those go to the source project. Falls back to the registration.
pub fn redirect_node_id<'a>(
    kind: SanctionKind,
    action: SanctionAction,
    registration: &'a node::Model,
) -> &'a str {
    let to_source = matches!(
        (kind, action),
        (SanctionKind::Retraction, SanctionAction::Approve)
            | (
                SanctionKind::RegistrationApproval | SanctionKind::Embargo,
                SanctionAction::Reject
            )
    );

    if to_source {
        registration
            .registered_from_id
            .as_deref()
            .unwrap_or(&registration.id)
    } else {
        &registration.id
    }
}

/// A decoded token link, ready to be applied.
#[derive(Debug)]
pub struct TokenHandler {
    encoded: String,
    claims: SanctionClaims,
}

impl TokenHandler {
    pub fn from_string(signer: &TokenSigner, encoded: &str) -> Result<Self, TokenActionError> {
        let claims = signer.decode(encoded)?;
        Ok(Self {
            encoded: encoded.to_string(),
            claims,
        })
    }

    pub fn claims(&self) -> &SanctionClaims {
        &self.claims
    }

    /// Apply the token's decision as `user_id` and return the URL to redirect to.
    pub async fn to_response(
        &self,
        db: &DatabaseConnection,
        config: &AppConfig,
        user_id: &str,
    ) -> Result<String, TokenActionError> {
        let (action, handler) = parse_action(&self.claims.action)?;
        let kind = sanctions::kind_from_handler_name(handler)?;
        self.sanction_handler(db, config, kind, action, user_id).await
    }

    async fn sanction_handler(
        &self,
        db: &DatabaseConnection,
        config: &AppConfig,
        kind: SanctionKind,
        action: SanctionAction,
        user_id: &str,
    ) -> Result<String, TokenActionError> {
        let txn = db.begin().await?;

        let mut sanction = sanction_store::find_by_id_and_kind(&txn, &self.claims.sanction_id, kind)
            .await?
            .ok_or(TokenActionError::NoSanction)?;
        if sanction.state == SanctionState::Rejected {
            return Err(TokenActionError::Rejected);
        }

        // A sanction no registration points at is treated as unknown.
        let registration = sanction_store::registration_for(&txn, &sanction)
            .await?
            .ok_or(TokenActionError::NoSanction)?;
        let redirect_to = redirect_node_id(kind, action, &registration).to_string();

        let transition = sanctions::act(&mut sanction, action, user_id, &self.encoded)?;
        let sanction = sanction_store::save(&txn, sanction).await?;
        sanctions::apply_effects(&txn, kind, transition, registration).await?;
        push_status(&txn, user_id, status_message(kind, action), "success", false).await?;

        txn.commit().await?;

        let outcome = match transition {
            Transition::Pending => "pending",
            Transition::Approved => "approved",
            Transition::Rejected => "rejected",
        };
        metrics::counter!(
            "sanction_transitions_total",
            "kind" => kind.short_name(),
            "outcome" => outcome
        )
        .increment(1);
        tracing::info!(
            sanction_id = %sanction.id,
            user_id,
            kind = kind.short_name(),
            action = action.as_str(),
            outcome,
            "Sanction token redeemed"
        );

        Ok(config.web_url(&format!("{redirect_to}/")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn registration(registered_from: Option<&str>) -> node::Model {
        let now = Utc::now();
        node::Model {
            id: "reg01".into(),
            title: "Study".into(),
            creator_id: "u1".into(),
            is_public: false,
            is_deleted: false,
            is_registration: true,
            is_retracted: false,
            registered_from_id: registered_from.map(str::to_string),
            registration_approval_id: None,
            embargo_id: None,
            retraction_id: None,
            created_at: now.into(),
            updated_at: now.into(),
        }
    }

    #[test]
    fn actions_parse_into_decision_and_handler() {
        assert_eq!(
            parse_action("approve_registration_approval").unwrap(),
            (SanctionAction::Approve, "registration")
        );
        assert_eq!(
            parse_action("reject_embargo").unwrap(),
            (SanctionAction::Reject, "embargo")
        );
        assert_eq!(
            parse_action("approve_retraction").unwrap(),
            (SanctionAction::Approve, "retraction")
        );
        assert!(matches!(
            parse_action("delete_embargo"),
            Err(TokenActionError::UnsupportedAction(_))
        ));
    }

    #[test]
    fn unknown_kind_is_unsupported_handler() {
        let (_, handler) = parse_action("approve_widget").unwrap();
        let err: ApiError = TokenActionError::from(
            sanctions::kind_from_handler_name(handler).unwrap_err(),
        )
        .into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.code, Box::from("UNSUPPORTED_SANCTION_KIND"));
    }

    #[test]
    fn redirects_follow_the_decision() {
        let reg = registration(Some("proj1"));
        let cases = [
            (SanctionKind::RegistrationApproval, SanctionAction::Approve, "reg01"),
            (SanctionKind::RegistrationApproval, SanctionAction::Reject, "proj1"),
            (SanctionKind::Embargo, SanctionAction::Approve, "reg01"),
            (SanctionKind::Embargo, SanctionAction::Reject, "proj1"),
            (SanctionKind::Retraction, SanctionAction::Approve, "proj1"),
            (SanctionKind::Retraction, SanctionAction::Reject, "reg01"),
        ];
        for (kind, action, expected) in cases {
            assert_eq!(redirect_node_id(kind, action, &reg), expected, "{kind:?} {action:?}");
        }
    }

    #[test]
    fn redirect_falls_back_to_registration() {
        let reg = registration(None);
        assert_eq!(
            redirect_node_id(SanctionKind::Embargo, SanctionAction::Reject, &reg),
            "reg01"
        );
    }

    #[test]
    fn error_payloads_carry_short_and_long_messages() {
        let err: ApiError = TokenActionError::Decode(TokenSignerError::Expired).into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        let details = err.details.unwrap();
        assert_eq!(details["message_short"], "Bad request");
        assert_eq!(details["message_long"], "Token has expired");

        let err: ApiError =
            TokenActionError::Sanction(SanctionError::Permissions("nope".into())).into();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
        assert_eq!(err.details.unwrap()["message_short"], "Unauthorized access");

        let err: ApiError = TokenActionError::Rejected.into();
        assert_eq!(err.status, StatusCode::GONE);
        assert_eq!(err.message, Box::from("This registration has been rejected"));
    }

    #[test]
    fn status_messages_name_the_kind() {
        assert_eq!(
            status_message(SanctionKind::Embargo, SanctionAction::Reject),
            "Your disapproval has been accepted and the embargo has been cancelled."
        );
        assert_eq!(
            status_message(SanctionKind::RegistrationApproval, SanctionAction::Approve),
            "Your registration approval has been accepted."
        );
    }
}
