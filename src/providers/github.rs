//! GitHub (OAuth 2.0).

use async_trait::async_trait;
use serde::Deserialize;

use super::{ExternalProvider, OAuthVersion, ProviderError, ProviderInfo, TokenResponse};

const DEFAULT_OAUTH_BASE: &str = "https://github.com";
const DEFAULT_API_BASE: &str = "https://api.github.com";

pub struct GitHubProvider {
    client_id: String,
    client_secret: String,
    auth_url_base: String,
    callback_url: String,
    api_base: String,
    scopes: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct GitHubUser {
    id: i64,
    login: String,
    #[serde(default)]
    html_url: Option<String>,
}

impl GitHubProvider {
    pub fn new(
        client_id: String,
        client_secret: String,
        oauth_base: Option<String>,
        api_base: Option<String>,
    ) -> Self {
        let oauth_base = oauth_base.unwrap_or_else(|| DEFAULT_OAUTH_BASE.to_string());
        let oauth_base = oauth_base.trim_end_matches('/');
        Self {
            client_id,
            client_secret,
            auth_url_base: format!("{oauth_base}/login/oauth/authorize"),
            callback_url: format!("{oauth_base}/login/oauth/access_token"),
            api_base: api_base
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
                .trim_end_matches('/')
                .to_string(),
            scopes: vec!["repo".to_string()],
        }
    }
}

#[async_trait]
impl ExternalProvider for GitHubProvider {
    fn name(&self) -> &str {
        "GitHub"
    }

    fn short_name(&self) -> &str {
        "github"
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
        let access_token = response
            .str("access_token")
            .ok_or_else(|| ProviderError::Unavailable("GitHub returned no access token".into()))?;

        let res = http
            .get(format!("{}/user", self.api_base))
            .bearer_auth(access_token)
            .header("User-Agent", "osf-web")
            .header("Accept", "application/vnd.github+json")
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(ProviderError::Unavailable(format!(
                "GitHub user lookup failed: {status} - {body}"
            )));
        }

        let user: GitHubUser = res.json().await?;
        Ok(ProviderInfo {
            provider_id: user.id.to_string(),
            display_name: Some(user.login),
            profile_url: user.html_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_follow_oauth_base_override() {
        let provider = GitHubProvider::new(
            "id".into(),
            "secret".into(),
            Some("http://127.0.0.1:9999/".into()),
            None,
        );
        assert_eq!(
            provider.auth_url_base(),
            "http://127.0.0.1:9999/login/oauth/authorize"
        );
        assert_eq!(
            provider.callback_url(),
            "http://127.0.0.1:9999/login/oauth/access_token"
        );
        assert_eq!(provider.default_scopes(), ["repo".to_string()]);
    }
}
