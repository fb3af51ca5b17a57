//! # Tests for Handlers
//!
//! Unit tests for the handlers that do not need a migrated schema.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::Json};
use sea_orm::Database;
use serde_json::Value;

use crate::config::AppConfig;
use crate::handlers::{healthz, root};
use crate::mail::LogMailer;
use crate::models::ServiceInfo;
use crate::server::AppState;

async fn test_state() -> AppState {
    let config = AppConfig {
        crypto_key: Some(vec![0u8; 32]),
        jwt_secret: Some("handler-test-secret-0123".to_string()),
        ..AppConfig::default()
    };
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite");
    AppState::new(config, db, Arc::new(LogMailer)).expect("valid test state")
}

#[tokio::test]
async fn test_root_handler_returns_expected_service_info() {
    let Json(service_info) = root().await;

    assert_eq!(service_info.service, "osf-web");
    assert_eq!(service_info.version, env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_root_handler_returns_valid_json() {
    let Json(service_info) = root().await;

    let json_value: Value =
        serde_json::to_value(&service_info).expect("Failed to serialize ServiceInfo");
    assert_eq!(json_value["service"], "osf-web");
    assert!(json_value.get("version").is_some());
}

#[test]
fn test_service_info_default() {
    let service_info = ServiceInfo::default();
    assert_eq!(service_info.service, "osf-web");
}

#[tokio::test]
async fn test_healthz_reports_reachable_database() {
    let state = test_state().await;

    let (status, Json(body)) = healthz(State(state)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.status, "ok");
    assert_eq!(body.database, "ok");
}

#[tokio::test]
async fn test_state_rejects_invalid_config() {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    let result = AppState::new(AppConfig::default(), db, Arc::new(LogMailer));
    assert!(result.is_err());
}
