use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;

use super::auth::AuthUser;
use super::{ApiError, ApiKeyResponse, ApiResponse, AppState, UpdateUserRequest, UserDto};

/// GET /api/v1/users
/// Returns the authenticated user's record (as a single-element list, the
/// shape API clients already consume).
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(auth_user)): Extension<AuthUser>,
) -> Result<Json<ApiResponse<Vec<UserDto>>>, ApiError> {
    let user = state
        .store
        .get_user_by_id(auth_user.id)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to get user: {e}")))?
        .ok_or_else(|| ApiError::Unauthorized("User not found".to_string()))?;

    Ok(Json(ApiResponse::success(vec![UserDto::from(user)])))
}

/// GET /api/v1/users/{id}
/// Users can only read their own record.
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(auth_user)): Extension<AuthUser>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    if auth_user.id != id {
        return Err(ApiError::Forbidden(
            "You can only access your own data".to_string(),
        ));
    }

    let user = state
        .store
        .get_user_by_id(id)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to get user: {e}")))?
        .ok_or_else(|| ApiError::not_found("User", id))?;

    Ok(Json(ApiResponse::success(UserDto::from(user))))
}

/// PUT /api/v1/users/{id}
/// Users can only update their own record.
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(auth_user)): Extension<AuthUser>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    if auth_user.id != id {
        return Err(ApiError::Forbidden(
            "You can only update your own data".to_string(),
        ));
    }

    if payload.username.is_empty() {
        return Err(ApiError::validation("Username is required"));
    }
    if payload.email.is_empty() {
        return Err(ApiError::validation("Email is required"));
    }

    let user = state
        .store
        .update_user_profile(id, &payload.username, &payload.email)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to update user: {e}")))?
        .ok_or_else(|| ApiError::not_found("User", id))?;

    Ok(Json(ApiResponse::success(UserDto::from(user))))
}

/// POST /api/v1/users/{id}/api-key
/// Rotate the API key for the authenticated user's own account. The old key
/// stops resolving as soon as the new one is stored.
pub async fn regenerate_api_key(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(auth_user)): Extension<AuthUser>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<ApiKeyResponse>>, ApiError> {
    if auth_user.id != id {
        return Err(ApiError::Forbidden(
            "You can only rotate your own API key".to_string(),
        ));
    }

    let api_key = state
        .store
        .regenerate_user_api_key(id)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to regenerate API key: {e}")))?;

    tracing::info!(user_id = id, "API key regenerated");

    Ok(Json(ApiResponse::success(ApiKeyResponse { api_key })))
}

/// DELETE /api/v1/users/{id}
/// Users can only delete their own account.
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(auth_user)): Extension<AuthUser>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    if auth_user.id != id {
        return Err(ApiError::Forbidden(
            "You can only delete your own account".to_string(),
        ));
    }

    let deleted = state
        .store
        .delete_user(id)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to delete user: {e}")))?;

    if !deleted {
        return Err(ApiError::not_found("User", id));
    }

    tracing::info!(user_id = id, "account deleted");

    Ok(StatusCode::NO_CONTENT)
}
