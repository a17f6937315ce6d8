use serde::{Deserialize, Serialize};

use crate::db::User;
use crate::entities::{esps, events};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct UserDto {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub api_key: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<User> for UserDto {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            api_key: user.api_key,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub username: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct ApiKeyResponse {
    pub api_key: String,
}

#[derive(Debug, Serialize)]
pub struct EspDto {
    pub esp_id: i32,
    pub provider_name: String,
    pub sending_domains: Vec<String>,
    pub weight: i32,
    pub created_at: String,
    pub updated_at: String,
}

impl From<esps::Model> for EspDto {
    fn from(model: esps::Model) -> Self {
        let sending_domains = serde_json::from_str(&model.sending_domains).unwrap_or_default();
        Self {
            esp_id: model.esp_id,
            provider_name: model.provider_name,
            sending_domains,
            weight: model.weight,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct EspRequest {
    pub provider_name: String,
    #[serde(default)]
    pub sending_domains: Vec<String>,
    #[serde(default = "default_weight")]
    pub weight: i32,
}

const fn default_weight() -> i32 {
    1
}

#[derive(Debug, Serialize)]
pub struct EventDto {
    pub id: i32,
    pub message_id: String,
    pub provider: String,
    pub event_type: String,
    pub occurred_at: String,
    pub metadata: Option<String>,
}

impl From<events::Model> for EventDto {
    fn from(model: events::Model) -> Self {
        Self {
            id: model.id,
            message_id: model.message_id,
            provider: model.provider,
            event_type: model.event_type,
            occurred_at: model.occurred_at,
            metadata: model.metadata,
        }
    }
}
