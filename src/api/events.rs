use axum::{
    Extension, Json,
    extract::{Query, State},
};
use serde::Deserialize;
use std::sync::Arc;

use super::auth::AuthUser;
use super::{ApiError, ApiResponse, AppState, EventDto};

/// Event kinds reported by upstream providers.
const EVENT_TYPES: &[&str] = &[
    "processed",
    "delivered",
    "bounce",
    "deferred",
    "open",
    "unique_open",
    "dropped",
];

#[derive(Debug, Deserialize)]
pub struct EventQuery {
    #[serde(default = "default_limit")]
    pub limit: u64,
    #[serde(default)]
    pub offset: u64,
}

const fn default_limit() -> u64 {
    50
}

/// GET /api/v1/events
pub async fn list_events(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(auth_user)): Extension<AuthUser>,
    Query(query): Query<EventQuery>,
) -> Result<Json<ApiResponse<Vec<EventDto>>>, ApiError> {
    let limit = query.limit.min(500);

    let events = state
        .store
        .list_events_for_user(auth_user.id, limit, query.offset)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to list events: {e}")))?;

    Ok(Json(ApiResponse::success(
        events.into_iter().map(EventDto::from).collect(),
    )))
}

/// GET /api/v1/events/types
pub async fn list_event_types() -> Json<ApiResponse<Vec<&'static str>>> {
    Json(ApiResponse::success(EVENT_TYPES.to_vec()))
}
