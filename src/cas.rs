//! CAS client used to revoke the tokens issued to a developer application.

use axum::http::StatusCode;
use thiserror::Error;

use crate::error::ApiError;

#[derive(Debug, Error)]
pub enum CasError {
    #[error("CAS returned unexpected status {status}")]
    UnexpectedStatus { status: u16 },
    #[error("CAS request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl From<CasError> for ApiError {
    fn from(error: CasError) -> Self {
        tracing::warn!(error = %error, "CAS token revocation failed");
        ApiError::new(
            StatusCode::BAD_GATEWAY,
            "CAS_ERROR",
            "Could not revoke application tokens with the authentication server",
        )
    }
}

#[derive(Debug, Clone)]
pub struct CasClient {
    http: reqwest::Client,
    revoke_url: String,
}

impl CasClient {
    /// `server_url` is the CAS base URL with a trailing slash.
    pub fn new(http: reqwest::Client, server_url: &str) -> Self {
        Self {
            http,
            revoke_url: format!("{}oauth2/revoke", server_url),
        }
    }

    /// Revoke every token CAS has issued for the application. Only `204 No Content`
    /// counts as success.
    pub async fn revoke_application_tokens(
        &self,
        client_id: &str,
        client_secret: &str,
    ) -> Result<(), CasError> {
        let res = self
            .http
            .post(&self.revoke_url)
            .form(&[("client_id", client_id), ("client_secret", client_secret)])
            .send()
            .await?;

        if res.status() == reqwest::StatusCode::NO_CONTENT {
            tracing::info!(client_id, "Revoked application tokens");
            Ok(())
        } else {
            Err(CasError::UnexpectedStatus {
                status: res.status().as_u16(),
            })
        }
    }
}
