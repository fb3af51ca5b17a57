//! Sanction entity: registration approvals, embargoes and retractions.

use std::collections::BTreeMap;

use sea_orm::FromJsonQueryResult;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, DeriveActiveEnum, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum SanctionKind {
    #[sea_orm(string_value = "registration_approval")]
    RegistrationApproval,
    #[sea_orm(string_value = "embargo")]
    Embargo,
    #[sea_orm(string_value = "retraction")]
    Retraction,
}

impl SanctionKind {
    /// Name of the node column that points at a sanction of this kind.
    pub fn short_name(&self) -> &'static str {
        match self {
            SanctionKind::RegistrationApproval => "registration_approval",
            SanctionKind::Embargo => "embargo",
            SanctionKind::Retraction => "retraction",
        }
    }

    /// Name shown to people in emails and error messages.
    pub fn display_name(&self) -> &'static str {
        match self {
            SanctionKind::RegistrationApproval => "registration",
            SanctionKind::Embargo => "embargo",
            SanctionKind::Retraction => "retraction",
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum SanctionState {
    #[sea_orm(string_value = "unapproved")]
    Unapproved,
    #[sea_orm(string_value = "approved")]
    Approved,
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

/// How many authorizers must approve before the sanction completes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum ApprovalMode {
    #[sea_orm(string_value = "unanimous")]
    Unanimous,
    #[sea_orm(string_value = "any")]
    Any,
}

/// One authorizer's tokens and decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approval {
    pub has_approved: bool,
    pub approval_token: String,
    pub rejection_token: String,
}

/// Authorizers keyed by user id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct ApprovalState(pub BTreeMap<String, Approval>);

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "sanctions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub kind: SanctionKind,
    pub state: SanctionState,
    pub mode: ApprovalMode,
    pub initiated_by: String,
    #[sea_orm(column_type = "Json")]
    pub approval_state: ApprovalState,
    /// Embargo lift date
    pub end_date: Option<DateTimeWithTimeZone>,
    #[sea_orm(column_type = "Text", nullable)]
    pub justification: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
