//! # OAuth Flow
//!
//! Runs the OAuth 1.0a or 2.0 dance for one provider on behalf of a user. The state of
//! an in-flight dance lives in the `oauth_states` table, one row per `(user, provider)`,
//! and is consumed when the provider calls back.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use sea_orm::DatabaseConnection;
use serde_json::Value;
use url::Url;

use super::oauth1::{OAuth1Params, authorization_header};
use super::{ExternalProvider, OAuthVersion, ProviderError, TokenResponse};
use crate::config::AppConfig;
use crate::crypto::CryptoKey;
use crate::models::external_account::Model as ExternalAccount;
use crate::models::random_alphanumeric;
use crate::repositories::external_account::AccountCredentials;
use crate::repositories::{ExternalAccountRepository, OAuthStateRepository};

const FLOW_NOT_RECOGNIZED: &str = "OAuth flow not recognized.";
const TOKEN_MISMATCH: &str = "Request token does not match";

pub struct OAuthFlow {
    provider: Arc<dyn ExternalProvider>,
    http: reqwest::Client,
    states: OAuthStateRepository,
    accounts: ExternalAccountRepository,
    config: Arc<AppConfig>,
}

impl OAuthFlow {
    pub fn new(
        provider: Arc<dyn ExternalProvider>,
        http: reqwest::Client,
        db: Arc<DatabaseConnection>,
        crypto_key: CryptoKey,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            provider,
            http,
            states: OAuthStateRepository::new(Arc::clone(&db)),
            accounts: ExternalAccountRepository::new(db, crypto_key),
            config,
        }
    }

    /// Where the provider sends the user back to.
    pub fn redirect_uri(&self) -> String {
        self.config
            .web_url(&format!("oauth/callback/{}/", self.provider.short_name()))
    }

    /// Start a dance for `user_id` and return the provider URL to send the user to.
    pub async fn auth_url(&self, user_id: &str) -> Result<String, ProviderError> {
        let short_name = self.provider.short_name();

        let url = match self.provider.oauth_version() {
            OAuthVersion::OAuth2 => {
                let state = generate_secure_state();
                let scope = self.provider.default_scopes().join(" ");
                let redirect_uri = self.redirect_uri();
                let url = Url::parse_with_params(
                    self.provider.auth_url_base(),
                    &[
                        ("response_type", "code"),
                        ("client_id", self.provider.client_id()),
                        ("redirect_uri", redirect_uri.as_str()),
                        ("scope", scope.as_str()),
                        ("state", state.as_str()),
                    ],
                )
                .map_err(|e| ProviderError::Unavailable(format!("invalid auth URL: {e}")))?;

                self.states.replace(user_id, short_name, &state, None).await?;
                url
            }
            OAuthVersion::OAuth1 => {
                let request_token = self.fetch_request_token().await?;
                let token = request_token
                    .str("oauth_token")
                    .ok_or_else(|| ProviderError::Unavailable("no oauth_token in response".into()))?;
                let secret = request_token.string("oauth_token_secret");

                let url = Url::parse_with_params(
                    self.provider.auth_url_base(),
                    &[("oauth_token", token)],
                )
                .map_err(|e| ProviderError::Unavailable(format!("invalid auth URL: {e}")))?;

                self.states.replace(user_id, short_name, token, secret).await?;
                url
            }
        };

        tracing::info!(user_id, provider = short_name, "OAuth flow started");
        Ok(url.to_string())
    }

    /// Finish the dance: verify the callback against the stored state, exchange it for
    /// credentials, store the account and link it to the user.
    pub async fn auth_callback(
        &self,
        user_id: &str,
        query: &HashMap<String, String>,
    ) -> Result<ExternalAccount, ProviderError> {
        let short_name = self.provider.short_name();

        let cached = self
            .states
            .take(user_id, short_name)
            .await?
            .ok_or_else(|| ProviderError::Permissions(FLOW_NOT_RECOGNIZED.to_string()))?;

        let version = self.provider.oauth_version();
        let response = match version {
            OAuthVersion::OAuth1 => {
                if query.get("oauth_token") != Some(&cached.state) {
                    return Err(ProviderError::Permissions(TOKEN_MISMATCH.to_string()));
                }
                let verifier = query
                    .get("oauth_verifier")
                    .ok_or(ProviderError::MissingParameter("oauth_verifier"))?;
                self.fetch_access_token(&cached.state, cached.token_secret.as_deref(), verifier)
                    .await?
            }
            OAuthVersion::OAuth2 => {
                if query.get("state") != Some(&cached.state) {
                    return Err(ProviderError::Permissions(TOKEN_MISMATCH.to_string()));
                }
                let code = query
                    .get("code")
                    .ok_or(ProviderError::MissingParameter("code"))?;
                self.exchange_code(code).await?
            }
        };

        let mut credentials = default_credentials(version, &response, self.provider.default_scopes());
        let info = self.provider.handle_callback(&self.http, &response).await?;
        credentials.provider = short_name.to_string();
        credentials.provider_name = self.provider.name().to_string();
        credentials.provider_id = info.provider_id;
        credentials.display_name = info.display_name;
        credentials.profile_url = info.profile_url;

        let account = self.accounts.upsert(&credentials).await?;
        let linked = self.accounts.link_user(user_id, &account.id).await?;

        metrics::counter!("oauth_callbacks_total", "provider" => short_name.to_string())
            .increment(1);
        tracing::info!(
            user_id,
            provider = short_name,
            account_id = %account.id,
            newly_linked = linked,
            "OAuth flow completed"
        );

        Ok(account)
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenResponse, ProviderError> {
        let redirect_uri = self.redirect_uri();
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", self.provider.client_id()),
            ("client_secret", self.provider.client_secret()),
            ("redirect_uri", redirect_uri.as_str()),
        ];

        let res = self
            .http
            .post(self.provider.callback_url())
            .header("Accept", "application/json")
            .form(&params)
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;
        if !status.is_success() {
            return Err(ProviderError::Unavailable(format!(
                "token exchange failed: {} - {}",
                status.as_u16(),
                body
            )));
        }

        let response = TokenResponse::parse(&body)
            .ok_or_else(|| ProviderError::Unavailable("unreadable token response".into()))?;
        if response.str("access_token").is_none() {
            return Err(ProviderError::Unavailable(
                "token response has no access_token".into(),
            ));
        }
        Ok(response)
    }

    async fn fetch_request_token(&self) -> Result<TokenResponse, ProviderError> {
        let endpoint = self.provider.request_token_url().ok_or_else(|| {
            ProviderError::Unavailable("provider has no request token URL".into())
        })?;
        let redirect_uri = self.redirect_uri();

        self.signed_post(
            endpoint,
            OAuth1Params {
                consumer_key: self.provider.client_id(),
                consumer_secret: self.provider.client_secret(),
                callback: Some(redirect_uri.as_str()),
                ..Default::default()
            },
        )
        .await
    }

    async fn fetch_access_token(
        &self,
        token: &str,
        token_secret: Option<&str>,
        verifier: &str,
    ) -> Result<TokenResponse, ProviderError> {
        self.signed_post(
            self.provider.callback_url(),
            OAuth1Params {
                consumer_key: self.provider.client_id(),
                consumer_secret: self.provider.client_secret(),
                token: Some(token),
                token_secret,
                verifier: Some(verifier),
                ..Default::default()
            },
        )
        .await
    }

    async fn signed_post(
        &self,
        endpoint: &str,
        params: OAuth1Params<'_>,
    ) -> Result<TokenResponse, ProviderError> {
        let url = Url::parse(endpoint)
            .map_err(|e| ProviderError::Unavailable(format!("invalid endpoint {endpoint}: {e}")))?;
        let header = authorization_header(
            "POST",
            &url,
            &params,
            &random_alphanumeric(32),
            Utc::now().timestamp(),
        )
        .map_err(|e| ProviderError::Unavailable(e.to_string()))?;

        let res = self
            .http
            .post(url)
            .header("Authorization", header)
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;
        if !status.is_success() {
            return Err(ProviderError::Unavailable(format!(
                "OAuth 1.0a request failed: {} - {}",
                status.as_u16(),
                body
            )));
        }

        let response = TokenResponse::parse(&body)
            .ok_or_else(|| ProviderError::Unavailable("unreadable token response".into()))?;
        if response.str("oauth_token").is_none() {
            return Err(ProviderError::Unavailable(
                "token response has no oauth_token".into(),
            ));
        }
        Ok(response)
    }
}

/// URL-safe random state for OAuth 2.0 dances.
fn generate_secure_state() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill(&mut bytes);
    base64_url::encode(&bytes)
}

/// Credentials every provider of a given OAuth version reports the same way.
pub fn default_credentials(
    version: OAuthVersion,
    response: &TokenResponse,
    default_scopes: &[String],
) -> AccountCredentials {
    match version {
        OAuthVersion::OAuth1 => AccountCredentials {
            oauth_key: response.string("oauth_token"),
            oauth_secret: response.string("oauth_token_secret"),
            ..Default::default()
        },
        OAuthVersion::OAuth2 => AccountCredentials {
            oauth_key: response.string("access_token"),
            refresh_token: response.string("refresh_token"),
            expires_at: expires_at(response, Utc::now()),
            scopes: scopes(response).unwrap_or_else(|| default_scopes.to_vec()),
            ..Default::default()
        },
    }
}

fn expires_at(response: &TokenResponse, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    if let Some(timestamp) = response.i64("expires_at") {
        return DateTime::from_timestamp(timestamp, 0);
    }
    response
        .i64("expires_in")
        .map(|seconds| now + Duration::seconds(seconds))
}

fn scopes(response: &TokenResponse) -> Option<Vec<String>> {
    match response.0.get("scope")? {
        Value::String(s) => Some(
            s.split([' ', ','])
                .filter(|scope| !scope.is_empty())
                .map(str::to_string)
                .collect(),
        ),
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
        ),
        _ => None,
    }
}
