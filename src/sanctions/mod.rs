//! # Sanctions
//!
//! Approval gates on registrations. A sanction starts `unapproved` and moves to either
//! `approved` (every authorizer, or any one of them, approved) or `rejected` (one
//! authorizer rejected). Both end states are final.
//!
//! The state machine here works on in-memory models; [`apply_effects`] writes the
//! consequences for the registration node through whatever connection the caller holds.

pub mod lifecycle;
pub mod token;

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ConnectionTrait, EntityTrait, QuerySelect, Set};
use thiserror::Error;

use crate::models::node;
use crate::models::sanction::{
    Approval, ApprovalMode, Entity as SanctionEntity, Model as Sanction, SanctionKind,
    SanctionState,
};
use crate::repositories::sanction as sanction_store;

pub use lifecycle::{LifecycleError, SanctionService};
pub use token::{SanctionClaims, TokenSigner, TokenSignerError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SanctionAction {
    Approve,
    Reject,
}

impl SanctionAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            SanctionAction::Approve => "approve",
            SanctionAction::Reject => "reject",
        }
    }
}

/// Result of a successful approve or reject call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Approval recorded, more approvals needed
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SanctionError {
    #[error("{message_long}")]
    Token {
        message_short: String,
        message_long: String,
    },
    #[error("{0}")]
    Permissions(String),
    #[error("Unsupported sanction handler kind: {0}")]
    UnsupportedHandlerKind(String),
}

impl SanctionError {
    fn token(message_short: &str, message_long: String) -> Self {
        SanctionError::Token {
            message_short: message_short.to_string(),
            message_long,
        }
    }
}

/// Sanction kind for the name used in token actions and routes.
pub fn kind_from_handler_name(name: &str) -> Result<SanctionKind, SanctionError> {
    match name {
        "registration" => Ok(SanctionKind::RegistrationApproval),
        "embargo" => Ok(SanctionKind::Embargo),
        "retraction" => Ok(SanctionKind::Retraction),
        other => Err(SanctionError::UnsupportedHandlerKind(other.to_string())),
    }
}

/// Register `user_id` as an authorizer, issuing their approve and reject tokens.
pub fn add_authorizer(
    sanction: &mut Sanction,
    user_id: &str,
    signer: &TokenSigner,
) -> Result<(), TokenSignerError> {
    let approval_token = signer.issue(user_id, &sanction.id, SanctionAction::Approve, sanction.kind)?;
    let rejection_token = signer.issue(user_id, &sanction.id, SanctionAction::Reject, sanction.kind)?;

    sanction.approval_state.0.insert(
        user_id.to_string(),
        Approval {
            has_approved: false,
            approval_token,
            rejection_token,
        },
    );
    Ok(())
}

fn ensure_authorizer(sanction: &Sanction, user_id: &str) -> Result<(), SanctionError> {
    if sanction.approval_state.0.contains_key(user_id) {
        Ok(())
    } else {
        Err(SanctionError::Permissions(format!(
            "User must be an admin to approve this {}.",
            sanction.kind.display_name()
        )))
    }
}

fn ensure_unapproved(sanction: &Sanction) -> Result<(), SanctionError> {
    let display = sanction.kind.display_name();
    match sanction.state {
        SanctionState::Unapproved => Ok(()),
        SanctionState::Approved => Err(SanctionError::token(
            "Invalid Token",
            format!("This {display} has already been approved."),
        )),
        SanctionState::Rejected => Err(SanctionError::token(
            "Invalid Token",
            format!("This {display} has already been rejected."),
        )),
    }
}

fn approval_complete(sanction: &Sanction) -> bool {
    let mut approvals = sanction.approval_state.0.values();
    match sanction.mode {
        ApprovalMode::Unanimous => approvals.all(|a| a.has_approved),
        ApprovalMode::Any => approvals.any(|a| a.has_approved),
    }
}

/// Record `user_id`'s approval. Each approval token works once.
pub fn approve(
    sanction: &mut Sanction,
    user_id: &str,
    token: &str,
) -> Result<Transition, SanctionError> {
    ensure_authorizer(sanction, user_id)?;
    ensure_unapproved(sanction)?;

    let display = sanction.kind.display_name();
    let Some(approval) = sanction.approval_state.0.get_mut(user_id) else {
        return Err(SanctionError::Permissions(format!(
            "User must be an admin to approve this {display}."
        )));
    };

    if approval.approval_token != token {
        return Err(SanctionError::token(
            "Invalid Token",
            format!(
                "This {display} approval link is invalid. Are you logged into the correct account?"
            ),
        ));
    }
    if approval.has_approved {
        return Err(SanctionError::token(
            "Invalid Token",
            format!("This {display} approval link has already been used."),
        ));
    }
    approval.has_approved = true;

    if approval_complete(sanction) {
        sanction.state = SanctionState::Approved;
        Ok(Transition::Approved)
    } else {
        Ok(Transition::Pending)
    }
}

/// Reject the sanction on behalf of `user_id`.
pub fn reject(
    sanction: &mut Sanction,
    user_id: &str,
    token: &str,
) -> Result<Transition, SanctionError> {
    ensure_authorizer(sanction, user_id)?;
    ensure_unapproved(sanction)?;

    let display = sanction.kind.display_name();
    let matches = sanction
        .approval_state
        .0
        .get(user_id)
        .is_some_and(|approval| approval.rejection_token == token);
    if !matches {
        return Err(SanctionError::token(
            "Invalid Token",
            format!(
                "This {display} disapproval link is invalid. Are you logged into the correct account?"
            ),
        ));
    }

    sanction.state = SanctionState::Rejected;
    Ok(Transition::Rejected)
}

/// Apply a decision to the sanction by action.
pub fn act(
    sanction: &mut Sanction,
    action: SanctionAction,
    user_id: &str,
    token: &str,
) -> Result<Transition, SanctionError> {
    match action {
        SanctionAction::Approve => approve(sanction, user_id, token),
        SanctionAction::Reject => reject(sanction, user_id, token),
    }
}

/// Write the node-level consequences of a completed transition.
pub async fn apply_effects<C: ConnectionTrait>(
    conn: &C,
    kind: SanctionKind,
    transition: Transition,
    registration: node::Model,
) -> Result<(), sea_orm::DbErr> {
    let embargo_id = registration.embargo_id.clone();
    let mut active: node::ActiveModel = registration.into();

    match (kind, transition) {
        (_, Transition::Pending) => return Ok(()),
        (SanctionKind::RegistrationApproval, Transition::Approved) => {
            active.is_public = Set(true);
        }
        // Embargoed registrations stay private until the end date.
        (SanctionKind::Embargo, Transition::Approved) => return Ok(()),
        (SanctionKind::RegistrationApproval | SanctionKind::Embargo, Transition::Rejected) => {
            active.is_deleted = Set(true);
        }
        (SanctionKind::Retraction, Transition::Approved) => {
            active.is_retracted = Set(true);
            active.is_public = Set(true);
            if let Some(embargo_id) = embargo_id {
                cancel_embargo(conn, &embargo_id).await?;
            }
        }
        (SanctionKind::Retraction, Transition::Rejected) => return Ok(()),
    }

    active.updated_at = Set(Utc::now().into());
    active.update(conn).await?;
    Ok(())
}

async fn cancel_embargo<C: ConnectionTrait>(conn: &C, embargo_id: &str) -> Result<(), sea_orm::DbErr> {
    let Some(mut embargo) = SanctionEntity::find_by_id(embargo_id.to_string())
        .lock_exclusive()
        .one(conn)
        .await?
    else {
        return Ok(());
    };
    if embargo.state == SanctionState::Rejected {
        return Ok(());
    }

    embargo.state = SanctionState::Rejected;
    sanction_store::save(conn, embargo).await?;
    tracing::info!(embargo_id, "Cancelled embargo on retracted registration");
    Ok(())
}
