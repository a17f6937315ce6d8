use anyhow::{Context, Result};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect};

use crate::entities::events;

pub struct EventRepository {
    conn: DatabaseConnection,
}

impl EventRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn list_for_user(
        &self,
        user_id: i32,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<events::Model>> {
        let rows = events::Entity::find()
            .filter(events::Column::UserId.eq(user_id))
            .order_by_desc(events::Column::OccurredAt)
            .limit(limit)
            .offset(offset)
            .all(&self.conn)
            .await
            .context("Failed to list events")?;

        Ok(rows)
    }
}
