//! # Authentication
//!
//! Users authenticate with a personal access token sent as `Authorization: Bearer <token>`.
//! Only the sha256 digest of a token is stored. The middleware resolves the token to a
//! user and places a [`CurrentUser`] in the request extensions; handlers that need a user
//! take the `CurrentUser` extractor, which rejects anonymous requests with 401.

use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts, Request, State},
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::error::{ApiError, unauthorized};
use crate::models::{random_alphanumeric, user};
use crate::repositories::UserRepository;
use crate::server::AppState;

const API_TOKEN_LENGTH: usize = 40;

/// The authenticated user of a request.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub user::Model);

impl CurrentUser {
    pub fn id(&self) -> &str {
        &self.0.id
    }
}

/// Fresh personal access token. Shown once; only its hash is stored.
pub fn generate_api_token() -> String {
    random_alphanumeric(API_TOKEN_LENGTH)
}

pub fn hash_api_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Resolve a bearer token to a user when one is presented.
///
/// Requests without an `Authorization` header pass through anonymously. A header that is
/// malformed or carries an unknown token is rejected with 401.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(token) = extract_bearer_token(request.headers())? else {
        return Ok(next.run(request).await);
    };

    let token_hash = hash_api_token(token);
    let user = UserRepository::new(Arc::new(state.db.clone()))
        .find_by_token_hash(&token_hash)
        .await?
        .filter(|user| {
            user.api_token_hash
                .as_deref()
                .is_some_and(|stored| stored.as_bytes().ct_eq(token_hash.as_bytes()).into())
        })
        .ok_or_else(|| unauthorized(Some("Invalid bearer token")))?;

    tracing::debug!(user_id = %user.id, "Authenticated request");
    request.extensions_mut().insert(CurrentUser(user));

    Ok(next.run(request).await)
}

fn extract_bearer_token(headers: &HeaderMap) -> Result<Option<&str>, ApiError> {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };

    let header = value
        .to_str()
        .map_err(|_| unauthorized(Some("Invalid Authorization header")))?;

    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(Some)
        .ok_or_else(|| unauthorized(Some("Authorization header must use Bearer scheme")))
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| unauthorized(Some("You must be logged in to access this resource.")))
    }
}

impl<S> OptionalFromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(parts.extensions.get::<CurrentUser>().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, StatusCode};

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn token_hash_is_sha256_hex() {
        assert_eq!(
            hash_api_token("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn generated_tokens_are_unique_and_long() {
        let token = generate_api_token();
        assert_eq!(token.len(), API_TOKEN_LENGTH);
        assert_ne!(token, generate_api_token());
    }

    #[test]
    fn missing_header_is_anonymous() {
        assert!(matches!(extract_bearer_token(&HeaderMap::new()), Ok(None)));
    }

    #[test]
    fn bearer_token_is_extracted() {
        let headers = headers("Bearer tok123");
        assert_eq!(extract_bearer_token(&headers).unwrap(), Some("tok123"));
    }

    #[test]
    fn other_schemes_are_rejected() {
        let err = extract_bearer_token(&headers("Basic dGVzdDoxMjM=")).unwrap_err();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);

        let err = extract_bearer_token(&headers("Bearer ")).unwrap_err();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
    }
}
