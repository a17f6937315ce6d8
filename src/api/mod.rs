use axum::{
    Json, Router,
    extract::State,
    http::{HeaderValue, StatusCode},
    middleware,
    response::IntoResponse,
    routing::{delete, get, post, put},
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::db::Store;
use crate::services::{
    ApiKeyValidator, BearerTokenValidator, Mailer, PasswordResetService, TokenService,
};

pub mod auth;
mod error;
mod esps;
mod events;
mod observability;
mod types;
mod users;

pub use error::ApiError;
pub use types::*;

use metrics_exporter_prometheus::PrometheusHandle;

pub struct AppState {
    pub config: Arc<Config>,

    pub store: Store,

    pub tokens: Arc<TokenService>,

    pub api_keys: ApiKeyValidator,

    pub bearer: BearerTokenValidator,

    pub password_resets: PasswordResetService,

    pub prometheus_handle: Option<PrometheusHandle>,
}

pub async fn create_app_state(
    config: Config,
    jwt_secret: &str,
    mailer: Arc<dyn Mailer>,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let store = Store::with_pool_options(
        &config.general.database_path,
        config.general.max_db_connections,
        config.general.min_db_connections,
    )
    .await?;

    let tokens = Arc::new(TokenService::new(jwt_secret));
    let api_keys = ApiKeyValidator::new(store.clone());
    let bearer = BearerTokenValidator::new(store.clone(), tokens.clone());
    let password_resets = PasswordResetService::new(
        store.clone(),
        mailer,
        config.security.clone(),
        config.mail.reset_link_base.clone(),
    );

    Ok(Arc::new(AppState {
        config: Arc::new(config),
        store,
        tokens,
        api_keys,
        bearer,
        password_resets,
        prometheus_handle,
    }))
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors_origins = state.config.server.cors_allowed_origins.clone();

    // Interactive account access: short-lived signed tokens.
    let bearer_routes = Router::new()
        .route("/users", get(users::list_users))
        .route("/users/{id}", get(users::get_user))
        .route("/users/{id}", put(users::update_user))
        .route("/users/{id}", delete(users::delete_user))
        .route("/users/{id}/api-key", post(users::regenerate_api_key))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::bearer_auth,
        ));

    // Server-to-server access: long-lived API keys.
    let api_key_routes = Router::new()
        .route("/esps", get(esps::list_esps))
        .route("/esps", post(esps::create_esp))
        .route("/esps/{id}", put(esps::update_esp))
        .route("/esps/{id}", delete(esps::delete_esp))
        .route("/events", get(events::list_events))
        .route("/events/types", get(events::list_event_types))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::api_key_auth,
        ));

    let api_router = Router::new().merge(bearer_routes).merge(api_key_routes);

    let cors_layer = if cors_origins.contains(&"*".to_string()) {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new()
        .route("/health", get(health))
        .route("/login", post(auth::login))
        .route("/request-password-reset", post(auth::request_password_reset))
        .route("/reset-password", post(auth::reset_password))
        .route("/metrics", get(observability::get_metrics))
        .nest("/api/v1", api_router)
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(observability::logging_middleware))
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    database: &'static str,
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "healthy",
                database: "connected",
            }),
        ),
        Err(e) => {
            tracing::error!("health check database ping failed: {e}");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "unhealthy",
                    database: "disconnected",
                }),
            )
        }
    }
}
