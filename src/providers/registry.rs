//! Provider registry
//!
//! Maps short names to configured providers. Built once at startup and shared through
//! `AppState`.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

use super::github::GitHubProvider;
use super::mendeley::MendeleyProvider;
use super::zotero::ZoteroProvider;
use super::{ExternalProvider, ProviderError};
use crate::config::AppConfig;

#[derive(Clone, Default)]
pub struct Registry {
    providers: HashMap<String, Arc<dyn ExternalProvider>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every provider with client credentials in `config`.
    pub fn from_config(config: &AppConfig) -> Self {
        let mut registry = Self::new();

        match config.github.pair() {
            Some((id, secret)) => registry.register(Arc::new(GitHubProvider::new(
                id,
                secret,
                config.github.oauth_base.clone(),
                config.github.api_base.clone(),
            ))),
            None => warn!("GitHub provider not registered: missing client credentials"),
        }

        match config.mendeley.pair() {
            Some((id, secret)) => registry.register(Arc::new(MendeleyProvider::new(
                id,
                secret,
                config.mendeley.oauth_base.clone(),
                config.mendeley.api_base.clone(),
            ))),
            None => warn!("Mendeley provider not registered: missing client credentials"),
        }

        match config.zotero.pair() {
            Some((id, secret)) => registry.register(Arc::new(ZoteroProvider::new(
                id,
                secret,
                config.zotero.oauth_base.clone(),
            ))),
            None => warn!("Zotero provider not registered: missing client credentials"),
        }

        registry
    }

    pub fn register(&mut self, provider: Arc<dyn ExternalProvider>) {
        self.providers
            .insert(provider.short_name().to_string(), provider);
    }

    pub fn get(&self, short_name: &str) -> Result<Arc<dyn ExternalProvider>, ProviderError> {
        self.providers
            .get(short_name)
            .cloned()
            .ok_or_else(|| ProviderError::UnknownProvider(short_name.to_string()))
    }

    /// Registered short names, sorted.
    pub fn short_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderCredentials;

    fn credentials() -> ProviderCredentials {
        ProviderCredentials {
            client_id: Some("id".into()),
            client_secret: Some("secret".into()),
            ..Default::default()
        }
    }

    #[test]
    fn registers_only_configured_providers() {
        let config = AppConfig {
            github: credentials(),
            zotero: credentials(),
            ..Default::default()
        };

        let registry = Registry::from_config(&config);
        assert_eq!(registry.short_names(), vec!["github", "zotero"]);
    }

    #[test]
    fn unknown_provider_is_an_error() {
        let registry = Registry::new();
        assert!(matches!(
            registry.get("dropbox"),
            Err(ProviderError::UnknownProvider(name)) if name == "dropbox"
        ));
    }

    #[test]
    fn provider_without_secret_is_skipped() {
        let config = AppConfig {
            mendeley: ProviderCredentials {
                client_id: Some("id".into()),
                ..Default::default()
            },
            ..Default::default()
        };

        assert!(Registry::from_config(&config).short_names().is_empty());
    }
}
