//! Resolution of request credentials to user identities.
//!
//! Each protected route group is bound to exactly one validator at router
//! composition time: API keys for server-to-server callers, signed bearer
//! tokens for interactive sessions. Both return the same `User` shape.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::db::{Store, User};
use crate::services::token::{TokenError, TokenService};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing Authorization header")]
    MissingHeader,

    #[error("Invalid Authorization header format")]
    MalformedHeader,

    #[error("Credential not found")]
    CredentialNotFound,

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Database(err.to_string())
    }
}

/// A strategy for turning the raw credential from the Authorization header
/// into an authenticated user.
#[async_trait]
pub trait CredentialValidator: Send + Sync {
    async fn validate(&self, credential: &str) -> Result<User, AuthError>;
}

/// Equality lookup against stored API keys. Keys are server-generated
/// 64-char hex strings, so the keyspace is not enumerable.
pub struct ApiKeyValidator {
    store: Store,
}

impl ApiKeyValidator {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }
}

#[async_trait]
impl CredentialValidator for ApiKeyValidator {
    async fn validate(&self, credential: &str) -> Result<User, AuthError> {
        self.store
            .get_user_by_api_key(credential)
            .await?
            .ok_or(AuthError::CredentialNotFound)
    }
}

/// Verifies a signed bearer token, then resolves the claimed user id.
/// A valid token for a deleted account still fails resolution.
pub struct BearerTokenValidator {
    store: Store,
    tokens: Arc<TokenService>,
}

impl BearerTokenValidator {
    #[must_use]
    pub fn new(store: Store, tokens: Arc<TokenService>) -> Self {
        Self { store, tokens }
    }
}

#[async_trait]
impl CredentialValidator for BearerTokenValidator {
    async fn validate(&self, credential: &str) -> Result<User, AuthError> {
        let claims = self.tokens.verify(credential)?;

        self.store
            .get_user_by_id(claims.user_id)
            .await?
            .ok_or(AuthError::CredentialNotFound)
    }
}
