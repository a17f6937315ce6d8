use sea_orm::entity::prelude::*;

/// Delivery event reported by an upstream provider for a relayed message.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "events")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub user_id: i32,

    pub message_id: String,

    pub provider: String,

    pub event_type: String,

    pub occurred_at: String,

    /// Raw provider payload, when one was kept
    pub metadata: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
