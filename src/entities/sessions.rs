use sea_orm::entity::prelude::*;

/// Durable record of a successful login. Sessions are an audit trail,
/// not an authorization mechanism; they lapse 24h after creation and
/// there is no revocation path.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "sessions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub session_id: i32,

    pub user_id: i32,

    pub token: String,

    pub created_at: String,

    pub expires_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
