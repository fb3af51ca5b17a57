//! Signed sanction tokens.
//!
//! Each authorizer gets one approve and one reject token per sanction. Tokens are HS256
//! JWTs whose `action` claim names both the decision and the sanction kind, e.g.
//! `approve_embargo` or `reject_registration_approval`.

use chrono::{Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::SanctionAction;
use crate::models::sanction::SanctionKind;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SanctionClaims {
    pub user_id: String,
    pub sanction_id: String,
    pub action: String,
    /// Expiry as a unix timestamp
    pub exp: i64,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenSignerError {
    #[error("Token has expired")]
    Expired,
    #[error("Could not decode token")]
    Invalid,
    #[error("Could not encode token: {0}")]
    Encode(String),
}

/// Value of the `action` claim for a decision on a sanction kind.
pub fn action_name(action: SanctionAction, kind: SanctionKind) -> String {
    format!("{}_{}", action.as_str(), kind.short_name())
}

/// Issues and verifies sanction tokens with a shared secret.
#[derive(Clone)]
pub struct TokenSigner {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner")
            .field("ttl_hours", &self.ttl.num_hours())
            .finish_non_exhaustive()
    }
}

impl TokenSigner {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            ttl,
        }
    }

    pub fn issue(
        &self,
        user_id: &str,
        sanction_id: &str,
        action: SanctionAction,
        kind: SanctionKind,
    ) -> Result<String, TokenSignerError> {
        self.encode_claims(&SanctionClaims {
            user_id: user_id.to_string(),
            sanction_id: sanction_id.to_string(),
            action: action_name(action, kind),
            exp: (Utc::now() + self.ttl).timestamp(),
        })
    }

    pub fn encode_claims(&self, claims: &SanctionClaims) -> Result<String, TokenSignerError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| TokenSignerError::Encode(e.to_string()))
    }

    pub fn decode(&self, encoded: &str) -> Result<SanctionClaims, TokenSignerError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        decode::<SanctionClaims>(encoded, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenSignerError::Expired,
                _ => TokenSignerError::Invalid,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> TokenSigner {
        TokenSigner::new(b"sanction-test-secret-0123456789", Duration::hours(48))
    }

    #[test]
    fn issued_token_decodes_to_claims() {
        let signer = signer();
        let token = signer
            .issue("user1", "sanction1", SanctionAction::Approve, SanctionKind::Embargo)
            .unwrap();

        let claims = signer.decode(&token).unwrap();
        assert_eq!(claims.user_id, "user1");
        assert_eq!(claims.sanction_id, "sanction1");
        assert_eq!(claims.action, "approve_embargo");
        assert!(claims.exp > Utc::now().timestamp());
    }

    #[test]
    fn action_names_use_kind_short_names() {
        assert_eq!(
            action_name(SanctionAction::Reject, SanctionKind::RegistrationApproval),
            "reject_registration_approval"
        );
        assert_eq!(
            action_name(SanctionAction::Approve, SanctionKind::Retraction),
            "approve_retraction"
        );
    }

    #[test]
    fn expired_token_is_reported_as_expired() {
        let signer = signer();
        let token = signer
            .encode_claims(&SanctionClaims {
                user_id: "user1".into(),
                sanction_id: "sanction1".into(),
                action: "approve_embargo".into(),
                exp: Utc::now().timestamp() - 120,
            })
            .unwrap();

        assert_eq!(signer.decode(&token), Err(TokenSignerError::Expired));
    }

    #[test]
    fn token_signed_with_other_secret_is_invalid() {
        let other = TokenSigner::new(b"a-completely-different-secret", Duration::hours(1));
        let token = other
            .issue("user1", "sanction1", SanctionAction::Reject, SanctionKind::Embargo)
            .unwrap();

        assert_eq!(signer().decode(&token), Err(TokenSignerError::Invalid));
    }

    #[test]
    fn garbage_is_invalid() {
        assert_eq!(signer().decode("not-a-token"), Err(TokenSignerError::Invalid));
    }
}
