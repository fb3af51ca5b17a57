//! Mendeley (OAuth 2.0 with refresh tokens).

use async_trait::async_trait;
use serde::Deserialize;

use super::{ExternalProvider, OAuthVersion, ProviderError, ProviderInfo, TokenResponse};

const DEFAULT_BASE: &str = "https://api.mendeley.com";

pub struct MendeleyProvider {
    client_id: String,
    client_secret: String,
    auth_url_base: String,
    callback_url: String,
    api_base: String,
    scopes: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct MendeleyProfile {
    id: String,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    link: Option<String>,
}

impl MendeleyProvider {
    pub fn new(
        client_id: String,
        client_secret: String,
        oauth_base: Option<String>,
        api_base: Option<String>,
    ) -> Self {
        let oauth_base = oauth_base.unwrap_or_else(|| DEFAULT_BASE.to_string());
        let oauth_base = oauth_base.trim_end_matches('/');
        Self {
            client_id,
            client_secret,
            auth_url_base: format!("{oauth_base}/oauth/authorize"),
            callback_url: format!("{oauth_base}/oauth/token"),
            api_base: api_base
                .unwrap_or_else(|| DEFAULT_BASE.to_string())
                .trim_end_matches('/')
                .to_string(),
            scopes: vec!["all".to_string()],
        }
    }
}

#[async_trait]
impl ExternalProvider for MendeleyProvider {
    fn name(&self) -> &str {
        "Mendeley"
    }

    fn short_name(&self) -> &str {
        "mendeley"
    }

    fn oauth_version(&self) -> OAuthVersion {
        OAuthVersion::OAuth2
    }

    fn auth_url_base(&self) -> &str {
        &self.auth_url_base
    }

    fn callback_url(&self) -> &str {
        &self.callback_url
    }

    fn client_id(&self) -> &str {
        &self.client_id
    }

    fn client_secret(&self) -> &str {
        &self.client_secret
    }

    fn default_scopes(&self) -> &[String] {
        &self.scopes
    }

    async fn handle_callback(
        &self,
        http: &reqwest::Client,
        response: &TokenResponse,
    ) -> Result<ProviderInfo, ProviderError> {
        let access_token = response.str("access_token").ok_or_else(|| {
            ProviderError::Unavailable("Mendeley returned no access token".into())
        })?;

        let res = http
            .get(format!("{}/profiles/me", self.api_base))
            .bearer_auth(access_token)
            .header("Accept", "application/vnd.mendeley-profiles.1+json")
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            return Err(ProviderError::Unavailable(format!(
                "Mendeley profile lookup failed with status {status}"
            )));
        }

        let profile: MendeleyProfile = res.json().await?;
        Ok(ProviderInfo {
            provider_id: profile.id,
            display_name: profile.display_name,
            profile_url: profile.link,
        })
    }
}
