//! Self-service password reset.
//!
//! Each user holds at most one active reset token, stored alongside its
//! expiry on the user row. Issuing overwrites any prior token; consuming
//! clears the token and persists the new password hash in one conditional
//! UPDATE keyed on the token value, so two concurrent consumers can never
//! both succeed.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use thiserror::Error;
use tokio::task;
use tracing::{debug, info};

use crate::config::SecurityConfig;
use crate::db::{Store, hash_password};
use crate::services::mailer::Mailer;

/// Reset tokens live exactly this long after issuance.
const RESET_TOKEN_TTL_MINUTES: i64 = 60;

#[derive(Debug, Error)]
pub enum ResetError {
    #[error("Reset token not found")]
    TokenNotFound,

    #[error("Reset token expired")]
    TokenExpired,

    #[error("Failed to hash password: {0}")]
    Hash(String),

    #[error("Failed to dispatch reset notification: {0}")]
    Notification(String),

    #[error("Database error: {0}")]
    Persistence(String),
}

pub struct PasswordResetService {
    store: Store,
    mailer: Arc<dyn Mailer>,
    security: SecurityConfig,
    reset_link_base: String,
}

impl PasswordResetService {
    #[must_use]
    pub fn new(
        store: Store,
        mailer: Arc<dyn Mailer>,
        security: SecurityConfig,
        reset_link_base: String,
    ) -> Self {
        Self {
            store,
            mailer,
            security,
            reset_link_base,
        }
    }

    /// Issue a reset token for the account behind an email address and
    /// dispatch the reset link.
    ///
    /// An unknown address is deliberately indistinguishable from a known one
    /// at the HTTP layer; the miss is only visible in the logs. A
    /// [`ResetError::Notification`] error means the token was stored but the
    /// link could not be sent; the caller logs it and leaves the response
    /// unchanged.
    pub async fn request_reset(&self, email: &str) -> Result<(), ResetError> {
        let user = self
            .store
            .get_user_by_email(email)
            .await
            .map_err(|e| ResetError::Persistence(e.to_string()))?;

        let Some(user) = user else {
            debug!("password reset requested for unknown email");
            return Ok(());
        };

        let token = generate_reset_token();
        let expiry = (Utc::now() + Duration::minutes(RESET_TOKEN_TTL_MINUTES)).to_rfc3339();

        self.store
            .set_reset_token(user.id, &token, &expiry)
            .await
            .map_err(|e| ResetError::Persistence(e.to_string()))?;

        let link = format!(
            "{}/reset-password?token={}",
            self.reset_link_base.trim_end_matches('/'),
            urlencoding::encode(&token)
        );

        self.mailer
            .send_password_reset(email, &link)
            .await
            .map_err(|e| ResetError::Notification(e.to_string()))?;

        info!(user_id = user.id, "password reset token issued");
        Ok(())
    }

    /// Consume a reset token and set the new password.
    ///
    /// An expired token is rejected but left in place until a new request
    /// overwrites it. The final UPDATE is conditional on the token still
    /// being stored, so a concurrent consumer that lost the race observes
    /// [`ResetError::TokenNotFound`].
    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), ResetError> {
        let found = self
            .store
            .get_user_by_reset_token(token)
            .await
            .map_err(|e| ResetError::Persistence(e.to_string()))?;

        let Some((user, expiry)) = found else {
            return Err(ResetError::TokenNotFound);
        };

        let expiry = DateTime::parse_from_rfc3339(&expiry)
            .map_err(|e| ResetError::Persistence(format!("stored expiry unreadable: {e}")))?
            .with_timezone(&Utc);

        if Utc::now() > expiry {
            return Err(ResetError::TokenExpired);
        }

        let security = self.security.clone();
        let password = new_password.to_string();
        let hash = task::spawn_blocking(move || hash_password(&password, Some(&security)))
            .await
            .map_err(|e| ResetError::Hash(format!("hashing task panicked: {e}")))?
            .map_err(|e| ResetError::Hash(e.to_string()))?;

        let consumed = self
            .store
            .consume_reset_token(token, &hash)
            .await
            .map_err(|e| ResetError::Persistence(e.to_string()))?;

        if !consumed {
            return Err(ResetError::TokenNotFound);
        }

        info!(user_id = user.id, "password reset completed");
        Ok(())
    }
}

/// Generate a random reset token (64 character hex, 256 bits of entropy)
fn generate_reset_token() -> String {
    use rand::Rng;

    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();

    bytes.iter().fold(String::with_capacity(64), |mut acc, b| {
        use std::fmt::Write;
        let _ = write!(acc, "{b:02x}");
        acc
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::users;
    use async_trait::async_trait;
    use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

    const SEED_EMAIL: &str = "admin@example.com";

    struct OkMailer;

    #[async_trait]
    impl Mailer for OkMailer {
        async fn send_password_reset(&self, _to: &str, _link: &str) -> anyhow::Result<()> {
            Ok(())
        }
    }

    struct FailingMailer;

    #[async_trait]
    impl Mailer for FailingMailer {
        async fn send_password_reset(&self, _to: &str, _link: &str) -> anyhow::Result<()> {
            anyhow::bail!("smtp relay unreachable")
        }
    }

    fn fast_security() -> SecurityConfig {
        // Minimal Argon2 work so the suite stays quick.
        SecurityConfig {
            argon2_memory_cost_kib: 1024,
            argon2_time_cost: 1,
            argon2_parallelism: 1,
        }
    }

    async fn service_with(mailer: Arc<dyn Mailer>) -> (PasswordResetService, Store) {
        let store = Store::new("sqlite::memory:").await.unwrap();
        let service = PasswordResetService::new(
            store.clone(),
            mailer,
            fast_security(),
            "http://localhost:8081".to_string(),
        );
        (service, store)
    }

    async fn seeded_user(store: &Store) -> users::Model {
        users::Entity::find()
            .filter(users::Column::Email.eq(SEED_EMAIL))
            .one(&store.conn)
            .await
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn request_reset_stores_token_and_expiry() {
        let (service, store) = service_with(Arc::new(OkMailer)).await;

        service.request_reset(SEED_EMAIL).await.unwrap();

        let user = seeded_user(&store).await;
        let token = user.reset_token.expect("token stored");
        assert_eq!(token.len(), 64);
        assert!(user.reset_token_expiry.is_some());
    }

    #[tokio::test]
    async fn unknown_email_succeeds_without_storing_anything() {
        let (service, store) = service_with(Arc::new(OkMailer)).await;

        service.request_reset("nobody@example.com").await.unwrap();

        let user = seeded_user(&store).await;
        assert!(user.reset_token.is_none());
    }

    #[tokio::test]
    async fn notification_failure_leaves_token_stored() {
        let (service, store) = service_with(Arc::new(FailingMailer)).await;

        let err = service.request_reset(SEED_EMAIL).await.unwrap_err();
        assert!(matches!(err, ResetError::Notification(_)));

        let user = seeded_user(&store).await;
        assert!(user.reset_token.is_some());
    }

    #[tokio::test]
    async fn reset_consumes_token_exactly_once() {
        let (service, store) = service_with(Arc::new(OkMailer)).await;

        service.request_reset(SEED_EMAIL).await.unwrap();
        let token = seeded_user(&store).await.reset_token.unwrap();

        service.reset_password(&token, "Brand-New-Pass1").await.unwrap();

        let user = seeded_user(&store).await;
        assert!(user.reset_token.is_none());
        assert!(user.reset_token_expiry.is_none());

        let err = service
            .reset_password(&token, "Another-Pass2")
            .await
            .unwrap_err();
        assert!(matches!(err, ResetError::TokenNotFound));
    }

    #[tokio::test]
    async fn second_request_overwrites_prior_token() {
        let (service, store) = service_with(Arc::new(OkMailer)).await;

        service.request_reset(SEED_EMAIL).await.unwrap();
        let first = seeded_user(&store).await.reset_token.unwrap();

        service.request_reset(SEED_EMAIL).await.unwrap();
        let second = seeded_user(&store).await.reset_token.unwrap();
        assert_ne!(first, second);

        let err = service
            .reset_password(&first, "Brand-New-Pass1")
            .await
            .unwrap_err();
        assert!(matches!(err, ResetError::TokenNotFound));

        service.reset_password(&second, "Brand-New-Pass1").await.unwrap();
    }

    #[tokio::test]
    async fn expired_token_is_rejected_and_password_unchanged() {
        let (service, store) = service_with(Arc::new(OkMailer)).await;

        let user = seeded_user(&store).await;
        let hash_before = user.password_hash.clone();

        // Issued an hour and a minute ago, so it lapsed a minute ago.
        let expiry = (Utc::now() - Duration::minutes(1)).to_rfc3339();
        store
            .set_reset_token(user.id, "a".repeat(64).as_str(), &expiry)
            .await
            .unwrap();

        let err = service
            .reset_password(&"a".repeat(64), "Secret123")
            .await
            .unwrap_err();
        assert!(matches!(err, ResetError::TokenExpired));

        let user = seeded_user(&store).await;
        assert_eq!(user.password_hash, hash_before);
        // The token stays stored until it is overwritten.
        assert!(user.reset_token.is_some());
    }

    #[tokio::test]
    async fn concurrent_consumption_has_a_single_winner() {
        let (service, store) = service_with(Arc::new(OkMailer)).await;

        service.request_reset(SEED_EMAIL).await.unwrap();
        let token = seeded_user(&store).await.reset_token.unwrap();

        let service = Arc::new(service);
        let a = {
            let service = service.clone();
            let token = token.clone();
            tokio::spawn(async move { service.reset_password(&token, "Winner-Pass1").await })
        };
        let b = {
            let service = service.clone();
            let token = token.clone();
            tokio::spawn(async move { service.reset_password(&token, "Winner-Pass2").await })
        };

        let (a, b) = (a.await.unwrap(), b.await.unwrap());
        let successes = [&a, &b].iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1, "exactly one consumer may win: {a:?} / {b:?}");

        for result in [a, b] {
            if let Err(err) = result {
                assert!(matches!(
                    err,
                    ResetError::TokenNotFound | ResetError::TokenExpired
                ));
            }
        }
    }
}
