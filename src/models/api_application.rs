//! Developer-registered OAuth2 client application.
//!
//! The CAS server issues tokens for these clients, so deactivating one must revoke its
//! tokens there first.

use sea_orm::entity::prelude::*;

use crate::config::AppConfig;

/// Length of a generated client secret.
pub const CLIENT_SECRET_LENGTH: usize = 40;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "api_oauth2_applications")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub client_id: String,
    pub client_secret: String,
    pub active: bool,
    pub owner_id: String,
    pub name: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    pub home_url: String,
    pub callback_url: String,
    pub date_created: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Relative settings-page path.
    pub fn url(&self) -> String {
        format!("/settings/applications/{}/", self.client_id)
    }

    pub fn absolute_url(&self, config: &AppConfig) -> String {
        config.web_url(&self.url())
    }

    pub fn absolute_api_v2_url(&self, config: &AppConfig) -> String {
        config.api_url(&format!("v2/applications/{}/", self.client_id))
    }
}

/// New client id: a uuid4 rendered as 32 hex characters.
pub fn generate_client_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

pub fn generate_client_secret() -> String {
    super::random_alphanumeric(CLIENT_SECRET_LENGTH)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Model {
        Model {
            id: "app1".into(),
            client_id: "0123456789abcdef0123456789abcdef".into(),
            client_secret: generate_client_secret(),
            active: true,
            owner_id: "u1".into(),
            name: "My App".into(),
            description: None,
            home_url: "https://example.com".into(),
            callback_url: "https://example.com/cb".into(),
            date_created: chrono::Utc::now().into(),
        }
    }

    #[test]
    fn derived_urls() {
        let config = AppConfig::default();
        let app = sample();

        assert_eq!(
            app.url(),
            "/settings/applications/0123456789abcdef0123456789abcdef/"
        );
        assert_eq!(
            app.absolute_url(&config),
            "http://localhost:5000/settings/applications/0123456789abcdef0123456789abcdef/"
        );
        assert_eq!(
            app.absolute_api_v2_url(&config),
            "http://localhost:8000/v2/applications/0123456789abcdef0123456789abcdef/"
        );
    }

    #[test]
    fn generated_credentials_shape() {
        let id = generate_client_id();
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(generate_client_secret().len(), CLIENT_SECRET_LENGTH);
    }
}
