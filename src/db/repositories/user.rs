use anyhow::{Context, Result};
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use tokio::task;

use crate::config::SecurityConfig;
use crate::entities::users;

/// User data returned from the repository (without the password hash or
/// reset-token fields)
#[derive(Debug, Clone)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub api_key: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            email: model.email,
            api_key: model.api_key,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Get user by id
    pub async fn get_by_id(&self, id: i32) -> Result<Option<User>> {
        let user = users::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user by id")?;

        Ok(user.map(User::from))
    }

    /// Get user by email
    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.conn)
            .await
            .context("Failed to query user by email")?;

        Ok(user.map(User::from))
    }

    /// Verify a password for the account behind an email address.
    /// Returns `Ok(None)` when no such account exists so the caller can
    /// collapse both outcomes into one response.
    ///
    /// Note: Argon2 verification runs in `spawn_blocking` because it is
    /// CPU-intensive and would stall the async runtime if run directly.
    pub async fn verify_password(&self, email: &str, password: &str) -> Result<Option<(User, bool)>> {
        let user = users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.conn)
            .await
            .context("Failed to query user for password verification")?;

        let Some(user) = user else {
            return Ok(None);
        };

        let password_hash = user.password_hash.clone();
        let password = password.to_string();

        let is_valid = task::spawn_blocking(move || {
            let parsed_hash = PasswordHash::new(&password_hash)
                .map_err(|e| anyhow::anyhow!("Invalid password hash format: {e}"))?;

            let argon2 = Argon2::default();
            Ok::<bool, anyhow::Error>(
                argon2
                    .verify_password(password.as_bytes(), &parsed_hash)
                    .is_ok(),
            )
        })
        .await
        .context("Password verification task panicked")??;

        Ok(Some((User::from(user), is_valid)))
    }

    /// Find the user whose API key equals the given string
    pub async fn get_by_api_key(&self, api_key: &str) -> Result<Option<User>> {
        let user = users::Entity::find()
            .filter(users::Column::ApiKey.eq(api_key))
            .one(&self.conn)
            .await
            .context("Failed to query user by API key")?;

        Ok(user.map(User::from))
    }

    /// Update profile fields (username, email) for a user
    pub async fn update_profile(&self, id: i32, username: &str, email: &str) -> Result<Option<User>> {
        let user = users::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user for profile update")?;

        let Some(user) = user else {
            return Ok(None);
        };

        let mut active: users::ActiveModel = user.into();
        active.username = Set(username.to_string());
        active.email = Set(email.to_string());
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());
        let updated = active.update(&self.conn).await?;

        Ok(Some(User::from(updated)))
    }

    /// Delete a user account
    pub async fn delete(&self, id: i32) -> Result<bool> {
        let result = users::Entity::delete_by_id(id)
            .exec(&self.conn)
            .await
            .context("Failed to delete user")?;

        Ok(result.rows_affected == 1)
    }

    /// Store a reset token and its expiry on a user, overwriting any active
    /// token. Exactly one token survives per user.
    pub async fn set_reset_token(&self, id: i32, token: &str, expiry: &str) -> Result<()> {
        let user = users::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user for reset token storage")?
            .ok_or_else(|| anyhow::anyhow!("User not found: {id}"))?;

        let mut active: users::ActiveModel = user.into();
        active.reset_token = Set(Some(token.to_string()));
        active.reset_token_expiry = Set(Some(expiry.to_string()));
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());
        active.update(&self.conn).await?;

        Ok(())
    }

    /// Look up the user holding a reset token. Returns the user and the
    /// stored expiry; a row without an expiry never matches.
    pub async fn get_by_reset_token(&self, token: &str) -> Result<Option<(User, String)>> {
        let user = users::Entity::find()
            .filter(users::Column::ResetToken.eq(token))
            .one(&self.conn)
            .await
            .context("Failed to query user by reset token")?;

        Ok(user.and_then(|u| {
            let expiry = u.reset_token_expiry.clone()?;
            Some((User::from(u), expiry))
        }))
    }

    /// Consume a reset token: persist the new password hash and clear the
    /// token and expiry in one conditional UPDATE keyed on the token value.
    /// Returns false when the token was already consumed or overwritten,
    /// which makes concurrent consumption single-winner.
    pub async fn consume_reset_token(&self, token: &str, new_hash: &str) -> Result<bool> {
        let now = chrono::Utc::now().to_rfc3339();

        let result = users::Entity::update_many()
            .col_expr(users::Column::PasswordHash, Expr::value(new_hash))
            .col_expr(users::Column::ResetToken, Expr::value(Option::<String>::None))
            .col_expr(
                users::Column::ResetTokenExpiry,
                Expr::value(Option::<String>::None),
            )
            .col_expr(users::Column::UpdatedAt, Expr::value(now))
            .filter(users::Column::ResetToken.eq(token))
            .exec(&self.conn)
            .await
            .context("Failed to consume reset token")?;

        Ok(result.rows_affected == 1)
    }

    /// Regenerate the API key for a user
    pub async fn regenerate_api_key(&self, id: i32) -> Result<String> {
        let user = users::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user for API key regeneration")?
            .ok_or_else(|| anyhow::anyhow!("User not found: {id}"))?;

        let new_api_key = generate_api_key();

        let mut active: users::ActiveModel = user.into();
        active.api_key = Set(Some(new_api_key.clone()));
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());
        active.update(&self.conn).await?;

        Ok(new_api_key)
    }
}

/// Hash a password using Argon2id with optional custom params.
/// If config is None, uses default params.
pub fn hash_password(password: &str, config: Option<&SecurityConfig>) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let argon2 = if let Some(cfg) = config {
        let params = Params::new(
            cfg.argon2_memory_cost_kib,
            cfg.argon2_time_cost,
            cfg.argon2_parallelism,
            None, // output length (use default)
        )
        .map_err(|e| anyhow::anyhow!("Invalid Argon2 params: {e}"))?;
        Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
    } else {
        Argon2::default()
    };

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;

    Ok(hash.to_string())
}

/// Generate a random credential string (64 character hex, 256 bits of entropy).
/// Used for both API keys and password-reset tokens.
#[must_use]
pub fn generate_api_key() -> String {
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
    use super::generate_api_key;

    #[test]
    fn generated_keys_are_64_hex_chars() {
        let key = generate_api_key();
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn generated_keys_are_unique() {
        assert_ne!(generate_api_key(), generate_api_key());
    }
}
