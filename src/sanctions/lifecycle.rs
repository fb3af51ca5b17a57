//! Creating sanctions: registering a project (with approval or embargo) and requesting a
//! retraction of a registration. Authorizers are mailed their token links after commit.

use std::sync::Arc;

use axum::http::StatusCode;
use chrono::{DateTime, Months, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use thiserror::Error;

use super::{TokenSigner, TokenSignerError, add_authorizer};
use crate::config::AppConfig;
use crate::error::ApiError;
use crate::mail::Mailer;
use crate::models::contributor::{self, Entity as Contributor, Permission};
use crate::models::node::{self, Entity as Node};
use crate::models::sanction::{
    ApprovalMode, ApprovalState, Model as Sanction, SanctionKind, SanctionState,
};
use crate::models::{generate_guid, generate_object_id};
use crate::repositories::UserRepository;
use crate::repositories::sanction as sanction_store;

/// Furthest an embargo may be set from today.
const MAX_EMBARGO_MONTHS: u32 = 48;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Node not found")]
    NodeNotFound,
    #[error("Only project administrators may do this.")]
    NotAdmin,
    #[error("Registrations cannot be registered again.")]
    AlreadyRegistration,
    #[error("Node is not a registration.")]
    NotRegistration,
    #[error("{0}")]
    InvalidEmbargoEndDate(&'static str),
    #[error("{0}")]
    RetractionNotAllowed(&'static str),
    #[error(transparent)]
    Token(#[from] TokenSignerError),
    #[error(transparent)]
    Database(#[from] sea_orm::DbErr),
}

impl From<LifecycleError> for ApiError {
    fn from(error: LifecycleError) -> Self {
        let message = error.to_string();
        match error {
            LifecycleError::NodeNotFound => crate::error::not_found(&message),
            LifecycleError::NotAdmin => crate::error::forbidden(Some(&message)),
            LifecycleError::AlreadyRegistration
            | LifecycleError::NotRegistration
            | LifecycleError::InvalidEmbargoEndDate(_)
            | LifecycleError::RetractionNotAllowed(_) => crate::error::bad_request(&message),
            LifecycleError::Token(e) => {
                tracing::error!(error = %e, "Failed to issue sanction tokens");
                ApiError::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_SERVER_ERROR",
                    "An internal error occurred",
                )
            }
            LifecycleError::Database(e) => e.into(),
        }
    }
}

/// Checks an embargo end date against `now`.
pub fn validate_embargo_end_date(
    end_date: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<(), LifecycleError> {
    if end_date <= now {
        return Err(LifecycleError::InvalidEmbargoEndDate(
            "Embargo end date must be in the future.",
        ));
    }
    let latest = now
        .checked_add_months(Months::new(MAX_EMBARGO_MONTHS))
        .unwrap_or(now);
    if end_date > latest {
        return Err(LifecycleError::InvalidEmbargoEndDate(
            "Embargo end date must be at most four years in the future.",
        ));
    }
    Ok(())
}

pub struct SanctionService {
    db: Arc<DatabaseConnection>,
    signer: Arc<TokenSigner>,
    mailer: Arc<dyn Mailer>,
    config: Arc<AppConfig>,
}

impl SanctionService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        signer: Arc<TokenSigner>,
        mailer: Arc<dyn Mailer>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            db,
            signer,
            mailer,
            config,
        }
    }

    /// Register `project_id`, gated by a registration approval, or by an embargo when an
    /// end date is given. Every admin of the project becomes an authorizer.
    pub async fn create_registration(
        &self,
        project_id: &str,
        initiator_id: &str,
        embargo_end_date: Option<DateTime<Utc>>,
    ) -> Result<(node::Model, Sanction), LifecycleError> {
        let now = Utc::now();
        if let Some(end_date) = embargo_end_date {
            validate_embargo_end_date(end_date, now)?;
        }

        let txn = self.db.begin().await?;

        let project = Node::find_by_id(project_id.to_string())
            .one(&txn)
            .await?
            .filter(|n| !n.is_deleted)
            .ok_or(LifecycleError::NodeNotFound)?;
        if project.is_registration {
            return Err(LifecycleError::AlreadyRegistration);
        }

        let contributors = Contributor::find()
            .filter(contributor::Column::NodeId.eq(project.id.as_str()))
            .order_by_asc(contributor::Column::UserId)
            .all(&txn)
            .await?;
        ensure_admin(&contributors, initiator_id)?;

        let kind = if embargo_end_date.is_some() {
            SanctionKind::Embargo
        } else {
            SanctionKind::RegistrationApproval
        };
        let mut sanction = self.new_sanction(kind, initiator_id, &contributors)?;
        sanction.end_date = embargo_end_date.map(Into::into);
        let sanction = sanction_store::insert(&txn, sanction).await?;

        let registration_id = generate_guid();
        let (approval_id, embargo_id) = match kind {
            SanctionKind::Embargo => (None, Some(sanction.id.clone())),
            _ => (Some(sanction.id.clone()), None),
        };
        let registration = node::ActiveModel {
            id: Set(registration_id.clone()),
            title: Set(project.title.clone()),
            creator_id: Set(initiator_id.to_string()),
            is_public: Set(false),
            is_deleted: Set(false),
            is_registration: Set(true),
            is_retracted: Set(false),
            registered_from_id: Set(Some(project.id.clone())),
            registration_approval_id: Set(approval_id),
            embargo_id: Set(embargo_id),
            retraction_id: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(&txn)
        .await?;

        if !contributors.is_empty() {
            Contributor::insert_many(contributors.iter().map(|c| contributor::ActiveModel {
                node_id: Set(registration_id.clone()),
                user_id: Set(c.user_id.clone()),
                permission: Set(c.permission),
            }))
            .exec_without_returning(&txn)
            .await?;
        }

        txn.commit().await?;

        metrics::counter!("sanctions_created_total", "kind" => kind.short_name()).increment(1);
        tracing::info!(
            project_id,
            registration_id = %registration.id,
            sanction_id = %sanction.id,
            kind = kind.short_name(),
            "Registration created pending approval"
        );

        self.notify_authorizers(&registration, &sanction).await;
        Ok((registration, sanction))
    }

    /// Ask the registration's admins to approve a retraction.
    pub async fn request_retraction(
        &self,
        registration_id: &str,
        initiator_id: &str,
        justification: Option<String>,
    ) -> Result<Sanction, LifecycleError> {
        let txn = self.db.begin().await?;

        let registration = Node::find_by_id(registration_id.to_string())
            .one(&txn)
            .await?
            .filter(|n| !n.is_deleted)
            .ok_or(LifecycleError::NodeNotFound)?;
        if !registration.is_registration {
            return Err(LifecycleError::NotRegistration);
        }

        let contributors = Contributor::find()
            .filter(contributor::Column::NodeId.eq(registration.id.as_str()))
            .order_by_asc(contributor::Column::UserId)
            .all(&txn)
            .await?;
        ensure_admin(&contributors, initiator_id)?;

        if registration.is_retracted {
            return Err(LifecycleError::RetractionNotAllowed(
                "This registration has already been retracted.",
            ));
        }
        if let Some(retraction_id) = registration.retraction_id.as_deref() {
            let existing =
                sanction_store::find_by_id_and_kind(&txn, retraction_id, SanctionKind::Retraction)
                    .await?;
            match existing.map(|s| s.state) {
                Some(SanctionState::Unapproved) => {
                    return Err(LifecycleError::RetractionNotAllowed(
                        "A retraction is already pending for this registration.",
                    ));
                }
                Some(SanctionState::Approved) => {
                    return Err(LifecycleError::RetractionNotAllowed(
                        "This registration has already been retracted.",
                    ));
                }
                Some(SanctionState::Rejected) | None => {}
            }
        }

        let mut sanction =
            self.new_sanction(SanctionKind::Retraction, initiator_id, &contributors)?;
        sanction.justification = justification;
        let sanction = sanction_store::insert(&txn, sanction).await?;

        let mut active: node::ActiveModel = registration.into();
        active.retraction_id = Set(Some(sanction.id.clone()));
        active.updated_at = Set(Utc::now().into());
        let registration = active.update(&txn).await?;

        txn.commit().await?;

        metrics::counter!("sanctions_created_total", "kind" => "retraction").increment(1);
        tracing::info!(
            registration_id,
            sanction_id = %sanction.id,
            "Retraction requested"
        );

        self.notify_authorizers(&registration, &sanction).await;
        Ok(sanction)
    }

    fn new_sanction(
        &self,
        kind: SanctionKind,
        initiator_id: &str,
        contributors: &[contributor::Model],
    ) -> Result<Sanction, TokenSignerError> {
        let now = Utc::now();
        let mut sanction = Sanction {
            id: generate_object_id(),
            kind,
            state: SanctionState::Unapproved,
            mode: ApprovalMode::Unanimous,
            initiated_by: initiator_id.to_string(),
            approval_state: ApprovalState::default(),
            end_date: None,
            justification: None,
            created_at: now.into(),
            updated_at: now.into(),
        };

        for admin in contributors
            .iter()
            .filter(|c| c.permission == Permission::Admin)
        {
            add_authorizer(&mut sanction, &admin.user_id, &self.signer)?;
        }
        Ok(sanction)
    }

    /// Mail every authorizer their approve and reject links. Failures are logged.
    async fn notify_authorizers(&self, registration: &node::Model, sanction: &Sanction) {
        let user_ids: Vec<String> = sanction.approval_state.0.keys().cloned().collect();
        let users = match UserRepository::new(Arc::clone(&self.db))
            .find_by_ids(&user_ids)
            .await
        {
            Ok(users) => users,
            Err(e) => {
                tracing::error!(error = %e, sanction_id = %sanction.id, "Failed to load authorizers");
                return;
            }
        };

        let display = sanction.kind.display_name();
        for user in users {
            let (Some(email), Some(approval)) =
                (user.email.as_deref(), sanction.approval_state.0.get(&user.id))
            else {
                tracing::warn!(user_id = %user.id, "Authorizer has no email address");
                continue;
            };

            let approve_url = self
                .config
                .web_url(&format!("token_action/{}", approval.approval_token));
            let reject_url = self
                .config
                .web_url(&format!("token_action/{}", approval.rejection_token));
            let subject = format!("Approval requested: {display} of \"{}\"", registration.title);
            let body = format!(
                "Hello {},\n\n\
                 A {display} of \"{}\" was requested and needs your approval.\n\n\
                 To approve, follow this link:\n{approve_url}\n\n\
                 To cancel it, follow this link:\n{reject_url}\n\n\
                 These links expire in {} hours.\n",
                user.fullname, registration.title, self.config.sanction_token_ttl_hours,
            );

            if let Err(e) = self.mailer.send(email, &subject, &body).await {
                tracing::warn!(
                    error = %e,
                    user_id = %user.id,
                    sanction_id = %sanction.id,
                    "Failed to mail sanction tokens"
                );
            }
        }
    }
}

fn ensure_admin(contributors: &[contributor::Model], user_id: &str) -> Result<(), LifecycleError> {
    let is_admin = contributors
        .iter()
        .any(|c| c.user_id == user_id && c.permission == Permission::Admin);
    if is_admin {
        Ok(())
    } else {
        Err(LifecycleError::NotAdmin)
    }
}
