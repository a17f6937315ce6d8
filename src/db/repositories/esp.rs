use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, NotSet, QueryFilter,
    QueryOrder, Set,
};

use crate::entities::esps;

/// Fields accepted when creating or updating a provider record.
#[derive(Debug, Clone)]
pub struct EspInput {
    pub provider_name: String,
    pub sending_domains: Vec<String>,
    pub weight: i32,
}

pub struct EspRepository {
    conn: DatabaseConnection,
}

impl EspRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn list_for_user(&self, user_id: i32) -> Result<Vec<esps::Model>> {
        let rows = esps::Entity::find()
            .filter(esps::Column::UserId.eq(user_id))
            .order_by_asc(esps::Column::ProviderName)
            .all(&self.conn)
            .await
            .context("Failed to list providers")?;

        Ok(rows)
    }

    pub async fn create(&self, user_id: i32, input: &EspInput) -> Result<esps::Model> {
        let now = chrono::Utc::now().to_rfc3339();

        let esp = esps::ActiveModel {
            esp_id: NotSet,
            user_id: Set(user_id),
            provider_name: Set(input.provider_name.clone()),
            sending_domains: Set(serde_json::to_string(&input.sending_domains)?),
            weight: Set(input.weight),
            created_at: Set(now.clone()),
            updated_at: Set(now),
        };

        esp.insert(&self.conn)
            .await
            .context("Failed to create provider")
    }

    /// Update a provider record, scoped to its owner. Returns None when the
    /// record does not exist or belongs to another user.
    pub async fn update(
        &self,
        esp_id: i32,
        user_id: i32,
        input: &EspInput,
    ) -> Result<Option<esps::Model>> {
        let esp = esps::Entity::find_by_id(esp_id)
            .filter(esps::Column::UserId.eq(user_id))
            .one(&self.conn)
            .await
            .context("Failed to query provider for update")?;

        let Some(esp) = esp else {
            return Ok(None);
        };

        let mut active: esps::ActiveModel = esp.into();
        active.provider_name = Set(input.provider_name.clone());
        active.sending_domains = Set(serde_json::to_string(&input.sending_domains)?);
        active.weight = Set(input.weight);
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());
        let updated = active.update(&self.conn).await?;

        Ok(Some(updated))
    }

    /// Delete a provider record, scoped to its owner
    pub async fn delete(&self, esp_id: i32, user_id: i32) -> Result<bool> {
        let result = esps::Entity::delete_many()
            .filter(esps::Column::EspId.eq(esp_id))
            .filter(esps::Column::UserId.eq(user_id))
            .exec(&self.conn)
            .await
            .context("Failed to delete provider")?;

        Ok(result.rows_affected == 1)
    }
}
