use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;

use super::auth::AuthUser;
use super::{ApiError, ApiResponse, AppState, EspDto, EspRequest};
use crate::db::EspInput;

fn to_input(payload: &EspRequest) -> Result<EspInput, ApiError> {
    if payload.provider_name.is_empty() {
        return Err(ApiError::validation("Provider name is required"));
    }

    Ok(EspInput {
        provider_name: payload.provider_name.clone(),
        sending_domains: payload.sending_domains.clone(),
        weight: payload.weight,
    })
}

/// GET /api/v1/esps
pub async fn list_esps(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(auth_user)): Extension<AuthUser>,
) -> Result<Json<ApiResponse<Vec<EspDto>>>, ApiError> {
    let esps = state
        .store
        .list_esps_for_user(auth_user.id)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to list providers: {e}")))?;

    Ok(Json(ApiResponse::success(
        esps.into_iter().map(EspDto::from).collect(),
    )))
}

/// POST /api/v1/esps
pub async fn create_esp(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(auth_user)): Extension<AuthUser>,
    Json(payload): Json<EspRequest>,
) -> Result<Json<ApiResponse<EspDto>>, ApiError> {
    let input = to_input(&payload)?;

    let esp = state
        .store
        .create_esp(auth_user.id, &input)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to create provider: {e}")))?;

    Ok(Json(ApiResponse::success(EspDto::from(esp))))
}

/// PUT /api/v1/esps/{id}
pub async fn update_esp(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(auth_user)): Extension<AuthUser>,
    Path(id): Path<i32>,
    Json(payload): Json<EspRequest>,
) -> Result<Json<ApiResponse<EspDto>>, ApiError> {
    let input = to_input(&payload)?;

    let esp = state
        .store
        .update_esp(id, auth_user.id, &input)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to update provider: {e}")))?
        .ok_or_else(|| ApiError::not_found("Provider", id))?;

    Ok(Json(ApiResponse::success(EspDto::from(esp))))
}

/// DELETE /api/v1/esps/{id}
pub async fn delete_esp(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(auth_user)): Extension<AuthUser>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    let deleted = state
        .store
        .delete_esp(id, auth_user.id)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to delete provider: {e}")))?;

    if !deleted {
        return Err(ApiError::not_found("Provider", id));
    }

    Ok(StatusCode::NO_CONTENT)
}
