//! Signed bearer tokens for interactive API access.
//!
//! Tokens are HS256 JWTs carrying the user id and an expiry 24 hours after
//! issuance. The signing secret is loaded once at startup and held immutably
//! for the life of the process; it is never derived from request data.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Bearer tokens live exactly this long after issuance.
const TOKEN_TTL_HOURS: i64 = 24;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Token expired")]
    Expired,

    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Malformed token")]
    Malformed,

    #[error("Failed to create token: {0}")]
    Creation(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i32,
    pub exp: i64,
}

pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenService {
    #[must_use]
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry comparisons must agree exactly with issuance; no grace window.
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Issue a signed token for a user, expiring 24 hours from now.
    pub fn issue(&self, user_id: i32) -> Result<String, TokenError> {
        self.issue_at(user_id, Utc::now())
    }

    fn issue_at(&self, user_id: i32, issued_at: DateTime<Utc>) -> Result<String, TokenError> {
        let claims = Claims {
            user_id,
            exp: (issued_at + Duration::hours(TOKEN_TTL_HOURS)).timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| TokenError::Creation(e.to_string()))
    }

    /// Verify signature and expiry, returning the embedded claims.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                _ => TokenError::Malformed,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new("test-secret-at-least-32-bytes-long!!")
    }

    #[test]
    fn verify_roundtrips_issued_token() {
        let tokens = service();
        let token = tokens.issue(42).unwrap();
        let claims = tokens.verify(&token).unwrap();
        assert_eq!(claims.user_id, 42);
    }

    #[test]
    fn expired_token_fails_with_expired_kind() {
        let tokens = service();
        // Issued 25 hours ago, so the embedded expiry passed an hour ago.
        let token = tokens
            .issue_at(7, Utc::now() - Duration::hours(25))
            .unwrap();
        assert!(matches!(tokens.verify(&token), Err(TokenError::Expired)));
    }

    #[test]
    fn token_signed_with_other_secret_fails_signature_check() {
        let token = TokenService::new("another-secret-entirely-0123456789")
            .issue(7)
            .unwrap();
        assert!(matches!(
            service().verify(&token),
            Err(TokenError::InvalidSignature)
        ));
    }

    #[test]
    fn garbage_input_is_malformed() {
        let tokens = service();
        assert!(matches!(
            tokens.verify("not-a-token"),
            Err(TokenError::Malformed)
        ));
        assert!(matches!(
            tokens.verify("a.b.c"),
            Err(TokenError::Malformed)
        ));
    }
}
