//! # Data Models
//!
//! SeaORM entities for every table, plus small shared response types.

use rand::{Rng, distributions::Alphanumeric};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod api_application;
pub mod comment;
pub mod contributor;
pub mod external_account;
pub mod node;
pub mod oauth_state;
pub mod sanction;
pub mod status_message;
pub mod user;
pub mod user_external_account;

pub use api_application::Entity as ApiApplication;
pub use comment::Entity as Comment;
pub use contributor::Entity as Contributor;
pub use external_account::Entity as ExternalAccount;
pub use node::Entity as Node;
pub use oauth_state::Entity as OAuthState;
pub use sanction::Entity as Sanction;
pub use status_message::Entity as StatusMessage;
pub use user::Entity as User;
pub use user_external_account::Entity as UserExternalAccount;

/// Basic service information response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    /// The name of the service
    pub service: String,
    /// The version of the service
    pub version: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            service: "osf-web".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Short public identifier used in URLs for users and nodes (e.g. `abc12`).
pub fn generate_guid() -> String {
    const ALPHABET: &[u8] = b"23456789abcdefghjkmnpqrstuvwxyz";
    let mut rng = rand::thread_rng();
    (0..5)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

/// 24-character hex identifier for internal records.
pub fn generate_object_id() -> String {
    let bytes: [u8; 12] = rand::thread_rng().r#gen();
    hex::encode(bytes)
}

/// Random alphanumeric string of `len` characters.
pub fn random_alphanumeric(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guid_shape() {
        let guid = generate_guid();
        assert_eq!(guid.len(), 5);
        assert!(guid.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }

    #[test]
    fn object_id_is_24_hex_chars() {
        let id = generate_object_id();
        assert_eq!(id.len(), 24);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(id, generate_object_id());
    }

    #[test]
    fn random_alphanumeric_length() {
        let s = random_alphanumeric(40);
        assert_eq!(s.len(), 40);
        assert!(s.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
