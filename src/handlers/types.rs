//! # Common API Types
//!
//! Shared wrappers and path parameters used across handlers.

use axum::{
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// `302 Found` to `location`.
pub fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

/// List response wrapper
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ListResponse<T> {
    pub data: Vec<T>,
}

impl<T> ListResponse<T> {
    pub fn new(data: Vec<T>) -> Self {
        Self { data }
    }
}

impl<T> FromIterator<T> for ListResponse<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[derive(Debug, Deserialize)]
pub struct CommentPath {
    pub comment_id: String,
}

#[derive(Debug, Deserialize)]
pub struct CommentReportPath {
    pub comment_id: String,
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct NodePath {
    pub node_id: String,
}
