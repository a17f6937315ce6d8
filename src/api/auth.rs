use axum::{
    Json,
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

use super::{ApiError, AppState, MessageResponse};
use crate::db::User;
use crate::services::{AuthError, CredentialValidator, ResetError};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub email: String,
    pub username: String,
}

#[derive(Deserialize)]
pub struct RequestResetRequest {
    pub email: String,
}

#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    pub reset_token: String,
    pub new_password: String,
}

// ============================================================================
// Middleware
// ============================================================================

/// The authenticated identity for the current request. Inserted into the
/// request extensions by the auth middleware; this type is the only context
/// key, shared by every consumer.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

/// Pull the credential out of `Authorization: Bearer <value>`. The header
/// must contain exactly two whitespace-separated tokens, the first being the
/// literal `Bearer`.
fn extract_bearer(headers: &HeaderMap) -> Result<String, AuthError> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or(AuthError::MissingHeader)?;

    let value = header.to_str().map_err(|_| AuthError::MalformedHeader)?;

    let mut parts = value.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(credential), None) => Ok(credential.to_string()),
        _ => Err(AuthError::MalformedHeader),
    }
}

async fn authenticate<V: CredentialValidator>(
    validator: &V,
    headers: &HeaderMap,
) -> Result<User, AuthError> {
    let credential = extract_bearer(headers)?;
    validator.validate(&credential).await
}

/// Auth gate for the interactive route group: signed bearer tokens only.
pub async fn bearer_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = authenticate(&state.bearer, request.headers()).await?;

    tracing::Span::current().record("user_id", user.id);
    request.extensions_mut().insert(AuthUser(user));

    Ok(next.run(request).await)
}

/// Auth gate for the server-to-server route group: API keys only.
pub async fn api_key_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = authenticate(&state.api_keys, request.headers()).await?;

    tracing::Span::current().record("user_id", user.id);
    request.extensions_mut().insert(AuthUser(user));

    Ok(next.run(request).await)
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /login
/// Authenticate with email and password; returns a bearer token and records
/// a session. Unknown email and wrong password get the same response.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let outcome = state
        .store
        .verify_user_password(&payload.email, &payload.password)
        .await
        .map_err(|e| ApiError::internal(format!("Authentication error: {e}")))?;

    let user = match outcome {
        Some((user, true)) => user,
        _ => return Err(ApiError::Unauthorized("Invalid email or password".to_string())),
    };

    let token = state
        .tokens
        .issue(user.id)
        .map_err(|e| ApiError::internal(format!("Error generating token: {e}")))?;

    state
        .store
        .record_session(user.id, &token)
        .await
        .map_err(|e| ApiError::internal(format!("Error creating session: {e}")))?;

    tracing::info!(user_id = user.id, "login succeeded");

    Ok(Json(LoginResponse {
        token,
        email: user.email,
        username: user.username,
    }))
}

/// POST /request-password-reset
/// Issue a reset token and send the reset link. Responds 200 whether or not
/// the email matches an account, and also when the token was stored but the
/// notification could not be dispatched.
pub async fn request_password_reset(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RequestResetRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    match state.password_resets.request_reset(&payload.email).await {
        Ok(()) => {}
        Err(ResetError::Notification(e)) => {
            // The token is already durably stored at this point.
            warn!("failed to send reset email: {e}");
        }
        Err(other) => return Err(other.into()),
    }

    Ok(Json(MessageResponse {
        message: "Password reset requested. Check your email for instructions.".to_string(),
    }))
}

/// POST /reset-password
/// Consume a reset token and set the new password.
pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .password_resets
        .reset_password(&payload.reset_token, &payload.new_password)
        .await?;

    Ok(Json(MessageResponse {
        message: "Password reset successfully".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::extract_bearer;
    use crate::services::AuthError;
    use axum::http::{HeaderMap, HeaderValue};

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("Authorization", HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn missing_header_is_its_own_error() {
        assert!(matches!(
            extract_bearer(&HeaderMap::new()),
            Err(AuthError::MissingHeader)
        ));
    }

    #[test]
    fn well_formed_header_yields_credential() {
        let credential = extract_bearer(&headers_with("Bearer abc123")).unwrap();
        assert_eq!(credential, "abc123");
    }

    #[test]
    fn wrong_scheme_is_malformed() {
        assert!(matches!(
            extract_bearer(&headers_with("Token abc")),
            Err(AuthError::MalformedHeader)
        ));
    }

    #[test]
    fn extra_or_missing_parts_are_malformed() {
        for value in ["Bearer", "Bearer a b", "bearer abc", ""] {
            assert!(
                matches!(
                    extract_bearer(&headers_with(value)),
                    Err(AuthError::MalformedHeader)
                ),
                "expected malformed for {value:?}"
            );
        }
    }
}
