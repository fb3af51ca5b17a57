//! # External Providers
//!
//! Third-party services a user can link an account from. Each provider describes its
//! OAuth endpoints and turns a token response into profile details; [`flow::OAuthFlow`]
//! runs the dance itself and stores the resulting [`ExternalAccount`].
//!
//! [`ExternalAccount`]: crate::models::external_account::Model

pub mod flow;
pub mod github;
pub mod mendeley;
pub mod oauth1;
pub mod registry;
pub mod trait_;
pub mod zotero;

use axum::http::StatusCode;
use serde_json::Value;
use thiserror::Error;

use crate::error::ApiError;

pub use flow::OAuthFlow;
pub use registry::Registry;
pub use trait_::ExternalProvider;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OAuthVersion {
    OAuth1,
    OAuth2,
}

/// Parsed body of a token endpoint response.
///
/// OAuth 2.0 providers answer with JSON; OAuth 1.0a providers answer with a form-encoded
/// body, which is stored with every value as a JSON string.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenResponse(pub serde_json::Map<String, Value>);

impl TokenResponse {
    /// Parse a JSON object body, falling back to `application/x-www-form-urlencoded`.
    pub fn parse(body: &str) -> Option<Self> {
        if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
            return Some(Self(map));
        }
        let pairs: Vec<(String, String)> = serde_urlencoded::from_str(body).ok()?;
        if pairs.is_empty() {
            return None;
        }
        Some(Self(
            pairs
                .into_iter()
                .map(|(k, v)| (k, Value::String(v)))
                .collect(),
        ))
    }

    pub fn str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
    }

    /// Integer value, accepting numbers and numeric strings.
    pub fn i64(&self, key: &str) -> Option<i64> {
        match self.0.get(key)? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// String value, rendering numbers as well.
    pub fn string(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// Profile details a provider extracts from a completed dance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderInfo {
    pub provider_id: String,
    pub display_name: Option<String>,
    pub profile_url: Option<String>,
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{0}")]
    Permissions(String),
    #[error("Unknown external service '{0}'")]
    UnknownProvider(String),
    #[error("Missing '{0}' in callback")]
    MissingParameter(&'static str),
    #[error("Provider unavailable: {0}")]
    Unavailable(String),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Database(#[from] sea_orm::DbErr),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl From<ProviderError> for ApiError {
    fn from(error: ProviderError) -> Self {
        match error {
            ProviderError::Permissions(message) => crate::error::unauthorized(Some(&message)),
            ProviderError::UnknownProvider(_) => crate::error::not_found(&error.to_string()),
            ProviderError::MissingParameter(_) => crate::error::bad_request(&error.to_string()),
            ProviderError::Unavailable(ref details) => {
                tracing::warn!(details = %details, "External provider unavailable");
                ApiError::new(
                    StatusCode::SERVICE_UNAVAILABLE,
                    "SERVICE_UNAVAILABLE",
                    "The external service could not complete the request",
                )
            }
            ProviderError::Http(e) => {
                tracing::warn!(error = %e, "External provider request failed");
                ApiError::new(
                    StatusCode::SERVICE_UNAVAILABLE,
                    "SERVICE_UNAVAILABLE",
                    "The external service could not complete the request",
                )
            }
            ProviderError::Database(e) => e.into(),
            ProviderError::Storage(e) => e.into(),
        }
    }
}
