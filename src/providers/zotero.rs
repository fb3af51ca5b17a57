//! Zotero (OAuth 1.0a). The access token response already names the account.

use async_trait::async_trait;

use super::{ExternalProvider, OAuthVersion, ProviderError, ProviderInfo, TokenResponse};

const DEFAULT_OAUTH_BASE: &str = "https://www.zotero.org";

pub struct ZoteroProvider {
    client_id: String,
    client_secret: String,
    auth_url_base: String,
    callback_url: String,
    request_token_url: String,
    scopes: Vec<String>,
}

impl ZoteroProvider {
    pub fn new(client_id: String, client_secret: String, oauth_base: Option<String>) -> Self {
        let oauth_base = oauth_base.unwrap_or_else(|| DEFAULT_OAUTH_BASE.to_string());
        let oauth_base = oauth_base.trim_end_matches('/');
        Self {
            client_id,
            client_secret,
            auth_url_base: format!("{oauth_base}/oauth/authorize"),
            callback_url: format!("{oauth_base}/oauth/access"),
            request_token_url: format!("{oauth_base}/oauth/request"),
            scopes: Vec::new(),
        }
    }
}

#[async_trait]
impl ExternalProvider for ZoteroProvider {
    fn name(&self) -> &str {
        "Zotero"
    }

    fn short_name(&self) -> &str {
        "zotero"
    }

    fn oauth_version(&self) -> OAuthVersion {
        OAuthVersion::OAuth1
    }

    fn auth_url_base(&self) -> &str {
        &self.auth_url_base
    }

    fn callback_url(&self) -> &str {
        &self.callback_url
    }

    fn request_token_url(&self) -> Option<&str> {
        Some(&self.request_token_url)
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
        _http: &reqwest::Client,
        response: &TokenResponse,
    ) -> Result<ProviderInfo, ProviderError> {
        let provider_id = response
            .string("userID")
            .ok_or_else(|| ProviderError::Unavailable("Zotero returned no userID".into()))?;

        Ok(ProviderInfo {
            provider_id,
            display_name: response.string("username"),
            profile_url: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn identity_comes_from_access_token_response() {
        let provider = ZoteroProvider::new("key".into(), "secret".into(), None);
        let response = TokenResponse::parse(
            "oauth_token=tok&oauth_token_secret=sec&userID=475425&username=jdoe",
        )
        .unwrap();

        let info = provider
            .handle_callback(&reqwest::Client::new(), &response)
            .await
            .unwrap();
        assert_eq!(info.provider_id, "475425");
        assert_eq!(info.display_name.as_deref(), Some("jdoe"));
    }

    #[test]
    fn request_token_url_is_exposed() {
        let provider = ZoteroProvider::new("key".into(), "secret".into(), None);
        assert_eq!(
            provider.request_token_url(),
            Some("https://www.zotero.org/oauth/request")
        );
    }
}
