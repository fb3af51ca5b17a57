//! Test utilities for database and router testing.
//!
//! Sets up an in-memory SQLite database with migrations applied, plus fixtures for users,
//! projects and an application state whose mailer records what it sends.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, Response, header},
};
use http_body_util::BodyExt;
use migration::{Migrator, MigratorTrait};
use sea_orm::{Database, DatabaseConnection};
use serde_json::Value;
use tower::ServiceExt;

use osf_web::auth::{generate_api_token, hash_api_token};
use osf_web::config::AppConfig;
use osf_web::mail::{MailError, Mailer};
use osf_web::models::{node, user};
use osf_web::repositories::{NodeRepository, UserRepository};
use osf_web::server::{AppState, create_app};

pub const TEST_JWT_SECRET: &str = "integration-test-jwt-secret";

/// Sets up an in-memory SQLite database with all migrations applied.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = Database::connect("sqlite::memory:").await?;
    Migrator::up(&db, None).await?;
    Ok(db)
}

/// Configuration that passes validation, with no providers configured.
pub fn test_config() -> AppConfig {
    AppConfig {
        profile: "test".to_string(),
        crypto_key: Some(vec![42u8; 32]),
        jwt_secret: Some(TEST_JWT_SECRET.to_string()),
        ..AppConfig::default()
    }
}

/// One message handed to [`RecordingMailer`].
#[derive(Debug, Clone)]
pub struct SentMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Mailer that keeps every message in memory.
#[derive(Debug, Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<SentMail>>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError> {
        self.sent.lock().unwrap().push(SentMail {
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}

pub struct TestApp {
    pub state: AppState,
    pub router: Router,
    pub mailer: Arc<RecordingMailer>,
}

impl TestApp {
    pub async fn new(config: AppConfig) -> Result<Self> {
        let db = setup_test_db().await?;
        let mailer = Arc::new(RecordingMailer::default());
        let state = AppState::new(config, db, mailer.clone())?;
        let router = create_app(state.clone());
        Ok(Self {
            state,
            router,
            mailer,
        })
    }

    pub fn db(&self) -> Arc<DatabaseConnection> {
        self.state.db_arc()
    }

    /// Send a request, authenticated as the holder of `token` when one is given.
    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Response<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn create_user(&self, username: &str) -> Result<(user::Model, String)> {
        let token = generate_api_token();
        let user = UserRepository::new(self.db())
            .create(
                username,
                &format!("{username} Tester"),
                Some(&format!("{username}@example.com")),
                Some(hash_api_token(&token)),
            )
            .await?;
        Ok((user, token))
    }

    pub async fn create_project(&self, creator: &user::Model, is_public: bool) -> Result<node::Model> {
        Ok(NodeRepository::new(self.db())
            .create_project("Test Project", &creator.id, is_public)
            .await?)
    }
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    }
}

pub fn location(response: &Response<Body>) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}
