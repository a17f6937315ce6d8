use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, NotSet, QueryFilter, Set};

use crate::entities::sessions;

/// Sessions live exactly this long after creation.
const SESSION_TTL_HOURS: i64 = 24;

pub struct SessionRepository {
    conn: DatabaseConnection,
}

impl SessionRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Record a successful login. Both timestamps derive from the same
    /// instant so expires_at is always created_at + 24h.
    pub async fn record(&self, user_id: i32, token: &str) -> Result<sessions::Model> {
        let created = Utc::now();
        let expires = created + Duration::hours(SESSION_TTL_HOURS);

        let session = sessions::ActiveModel {
            session_id: NotSet,
            user_id: Set(user_id),
            token: Set(token.to_string()),
            created_at: Set(created.to_rfc3339()),
            expires_at: Set(expires.to_rfc3339()),
        };

        session
            .insert(&self.conn)
            .await
            .context("Failed to record session")
    }

    /// List sessions for a user, most recent first
    pub async fn list_for_user(&self, user_id: i32) -> Result<Vec<sessions::Model>> {
        use sea_orm::QueryOrder;

        let rows = sessions::Entity::find()
            .filter(sessions::Column::UserId.eq(user_id))
            .order_by_desc(sessions::Column::SessionId)
            .all(&self.conn)
            .await
            .context("Failed to list sessions")?;

        Ok(rows)
    }
}
