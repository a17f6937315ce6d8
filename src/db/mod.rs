use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub mod migrator;
pub mod repositories;

pub use repositories::esp::EspInput;
pub use repositories::user::{User, hash_password};

use crate::entities::{esps, events, sessions};

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        // In-memory SQLite is one database per connection; a larger pool
        // would hand out connections that never saw the migrations.
        let (max_connections, min_connections) = if db_url.contains(":memory:") {
            (1, 1)
        } else {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
            (max_connections, min_connections)
        };

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    fn session_repo(&self) -> repositories::session::SessionRepository {
        repositories::session::SessionRepository::new(self.conn.clone())
    }

    fn esp_repo(&self) -> repositories::esp::EspRepository {
        repositories::esp::EspRepository::new(self.conn.clone())
    }

    fn event_repo(&self) -> repositories::event::EventRepository {
        repositories::event::EventRepository::new(self.conn.clone())
    }

    // ========== Users ==========

    pub async fn get_user_by_id(&self, id: i32) -> Result<Option<User>> {
        self.user_repo().get_by_id(id).await
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.user_repo().get_by_email(email).await
    }

    pub async fn verify_user_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<(User, bool)>> {
        self.user_repo().verify_password(email, password).await
    }

    pub async fn get_user_by_api_key(&self, api_key: &str) -> Result<Option<User>> {
        self.user_repo().get_by_api_key(api_key).await
    }

    pub async fn update_user_profile(
        &self,
        id: i32,
        username: &str,
        email: &str,
    ) -> Result<Option<User>> {
        self.user_repo().update_profile(id, username, email).await
    }

    pub async fn delete_user(&self, id: i32) -> Result<bool> {
        self.user_repo().delete(id).await
    }

    pub async fn regenerate_user_api_key(&self, id: i32) -> Result<String> {
        self.user_repo().regenerate_api_key(id).await
    }

    // ========== Reset credentials ==========

    pub async fn set_reset_token(&self, id: i32, token: &str, expiry: &str) -> Result<()> {
        self.user_repo().set_reset_token(id, token, expiry).await
    }

    pub async fn get_user_by_reset_token(&self, token: &str) -> Result<Option<(User, String)>> {
        self.user_repo().get_by_reset_token(token).await
    }

    pub async fn consume_reset_token(&self, token: &str, new_hash: &str) -> Result<bool> {
        self.user_repo().consume_reset_token(token, new_hash).await
    }

    // ========== Sessions ==========

    pub async fn record_session(&self, user_id: i32, token: &str) -> Result<sessions::Model> {
        self.session_repo().record(user_id, token).await
    }

    pub async fn list_sessions_for_user(&self, user_id: i32) -> Result<Vec<sessions::Model>> {
        self.session_repo().list_for_user(user_id).await
    }

    // ========== Providers ==========

    pub async fn list_esps_for_user(&self, user_id: i32) -> Result<Vec<esps::Model>> {
        self.esp_repo().list_for_user(user_id).await
    }

    pub async fn create_esp(&self, user_id: i32, input: &EspInput) -> Result<esps::Model> {
        self.esp_repo().create(user_id, input).await
    }

    pub async fn update_esp(
        &self,
        esp_id: i32,
        user_id: i32,
        input: &EspInput,
    ) -> Result<Option<esps::Model>> {
        self.esp_repo().update(esp_id, user_id, input).await
    }

    pub async fn delete_esp(&self, esp_id: i32, user_id: i32) -> Result<bool> {
        self.esp_repo().delete(esp_id, user_id).await
    }

    // ========== Events ==========

    pub async fn list_events_for_user(
        &self,
        user_id: i32,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<events::Model>> {
        self.event_repo().list_for_user(user_id, limit, offset).await
    }
}
