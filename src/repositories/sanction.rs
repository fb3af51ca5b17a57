//! Sanction repository.
//!
//! The free functions take any [`ConnectionTrait`] so the token dispatcher and the
//! lifecycle service can run them inside one transaction.

use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QuerySelect, Set,
};

use crate::models::node::{self, Entity as Node};
use crate::models::sanction::{ActiveModel, Entity as Sanction, Model, SanctionKind};

#[derive(Debug, Clone)]
pub struct SanctionRepository {
    db: Arc<DatabaseConnection>,
}

impl SanctionRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<Model>, sea_orm::DbErr> {
        Sanction::find_by_id(id.to_string()).one(&*self.db).await
    }
}

/// Sanction with the given id, only if it is of `kind`.
///
/// The row stays locked (`FOR UPDATE`) until `conn`'s transaction ends, so concurrent
/// decisions on one sanction apply one after the other.
pub async fn find_by_id_and_kind<C: ConnectionTrait>(
    conn: &C,
    id: &str,
    kind: SanctionKind,
) -> Result<Option<Model>, sea_orm::DbErr> {
    Ok(Sanction::find_by_id(id.to_string())
        .lock_exclusive()
        .one(conn)
        .await?
        .filter(|sanction| sanction.kind == kind))
}

/// Node whose column for the sanction's kind points at the sanction.
pub async fn registration_for<C: ConnectionTrait>(
    conn: &C,
    sanction: &Model,
) -> Result<Option<node::Model>, sea_orm::DbErr> {
    let column = match sanction.kind {
        SanctionKind::RegistrationApproval => node::Column::RegistrationApprovalId,
        SanctionKind::Embargo => node::Column::EmbargoId,
        SanctionKind::Retraction => node::Column::RetractionId,
    };

    Node::find()
        .filter(column.eq(sanction.id.as_str()))
        .one(conn)
        .await
}

pub async fn insert<C: ConnectionTrait>(conn: &C, sanction: Model) -> Result<Model, sea_orm::DbErr> {
    let active: ActiveModel = sanction.into();
    active.reset_all().insert(conn).await
}

/// Persist every field of an in-memory sanction and bump `updated_at`.
pub async fn save<C: ConnectionTrait>(conn: &C, sanction: Model) -> Result<Model, sea_orm::DbErr> {
    let mut active: ActiveModel = sanction.into();
    active = active.reset_all();
    active.updated_at = Set(Utc::now().into());
    active.update(conn).await
}
