//! ExternalProvider trait definition

use async_trait::async_trait;

use super::{OAuthVersion, ProviderError, ProviderInfo, TokenResponse};

/// A third-party service users can link accounts from.
///
/// Endpoint accessors return absolute URLs. For OAuth 2.0 `callback_url` is the token
/// exchange endpoint; for OAuth 1.0a it is the access token endpoint.
#[async_trait]
pub trait ExternalProvider: Send + Sync {
    /// Human readable name, e.g. "GitHub"
    fn name(&self) -> &str;

    /// Identifier used in routes and as `ExternalAccount.provider`
    fn short_name(&self) -> &str;

    fn oauth_version(&self) -> OAuthVersion;

    fn auth_url_base(&self) -> &str;

    fn callback_url(&self) -> &str;

    /// Temporary credential endpoint (OAuth 1.0a only)
    fn request_token_url(&self) -> Option<&str> {
        None
    }

    fn client_id(&self) -> &str;

    fn client_secret(&self) -> &str;

    fn default_scopes(&self) -> &[String];

    /// Extract the account identity from the token response. May call the provider's
    /// profile API with the fresh credentials.
    async fn handle_callback(
        &self,
        http: &reqwest::Client,
        response: &TokenResponse,
    ) -> Result<ProviderInfo, ProviderError>;
}
