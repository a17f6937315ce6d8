use sea_orm::entity::prelude::*;

/// Upstream email service provider registered by a tenant.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "email_service_providers")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub esp_id: i32,

    pub user_id: i32,

    pub provider_name: String,

    /// JSON array of sending domains
    pub sending_domains: String,

    /// Relative routing weight across the tenant's providers
    pub weight: i32,

    pub created_at: String,

    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
