use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use chrono::{DateTime, Utc};
use esprelay::api::AppState;
use esprelay::config::Config;
use esprelay::entities::users;
use esprelay::services::DisabledMailer;
use http_body_util::BodyExt;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use std::sync::Arc;
use tower::ServiceExt;

/// Default API key seeded by the initial migration
const DEFAULT_API_KEY: &str = "esprelay_default_api_key_please_regenerate";

const SEED_EMAIL: &str = "admin@example.com";
const SEED_PASSWORD: &str = "password";

const TEST_JWT_SECRET: &str = "integration-test-secret-0123456789abcdef";

async fn spawn_app() -> (Router, Arc<AppState>) {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();

    let state = esprelay::api::create_app_state(
        config,
        TEST_JWT_SECRET,
        Arc::new(DisabledMailer),
        None,
    )
    .await
    .expect("Failed to create app state");

    (esprelay::api::router(state.clone()), state)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn get_with_auth(uri: &str, auth: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("Authorization", auth)
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(serde_json::to_string(body).unwrap()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn seeded_user(state: &AppState) -> users::Model {
    users::Entity::find()
        .filter(users::Column::Email.eq(SEED_EMAIL))
        .one(&state.store.conn)
        .await
        .unwrap()
        .unwrap()
}

async fn login_token(app: &Router) -> String {
    let response = app
        .clone()
        .oneshot(post_json(
            "/login",
            &serde_json::json!({ "email": SEED_EMAIL, "password": SEED_PASSWORD }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    json_body(response).await["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn protected_routes_reject_bad_headers() {
    let (app, _state) = spawn_app().await;

    // No Authorization header at all
    let response = app.clone().oneshot(get("/api/v1/esps")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Wrong scheme keyword
    let response = app
        .clone()
        .oneshot(get_with_auth("/api/v1/esps", "Token abc"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Too many parts
    let response = app
        .clone()
        .oneshot(get_with_auth("/api/v1/esps", "Bearer abc def"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Key that is not in storage
    let response = app
        .clone()
        .oneshot(get_with_auth("/api/v1/esps", "Bearer wrong-key"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn api_key_authenticates_server_routes_only() {
    let (app, _state) = spawn_app().await;
    let auth = format!("Bearer {DEFAULT_API_KEY}");

    let response = app
        .clone()
        .oneshot(get_with_auth("/api/v1/esps", &auth))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // The interactive group only accepts signed tokens; an API key is not one.
    let response = app
        .clone()
        .oneshot(get_with_auth("/api/v1/users", &auth))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_issues_token_and_records_session() {
    let (app, state) = spawn_app().await;

    // Wrong password and unknown email produce the same rejection.
    for body in [
        serde_json::json!({ "email": SEED_EMAIL, "password": "nope" }),
        serde_json::json!({ "email": "ghost@example.com", "password": SEED_PASSWORD }),
    ] {
        let response = app.clone().oneshot(post_json("/login", &body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    let response = app
        .clone()
        .oneshot(post_json(
            "/login",
            &serde_json::json!({ "email": SEED_EMAIL, "password": SEED_PASSWORD }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));
    assert_eq!(body["email"], SEED_EMAIL);
    assert_eq!(body["username"], "admin");

    let user = seeded_user(&state).await;
    let sessions = state.store.list_sessions_for_user(user.id).await.unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].token, body["token"].as_str().unwrap());

    let created = DateTime::parse_from_rfc3339(&sessions[0].created_at).unwrap();
    let expires = DateTime::parse_from_rfc3339(&sessions[0].expires_at).unwrap();
    let lifetime = (expires - created).num_seconds();
    assert!(
        (lifetime - 24 * 3600).abs() <= 1,
        "session lifetime was {lifetime}s"
    );
}

#[tokio::test]
async fn bearer_token_authenticates_interactive_routes() {
    let (app, _state) = spawn_app().await;
    let token = login_token(&app).await;

    let response = app
        .clone()
        .oneshot(get_with_auth("/api/v1/users", &format!("Bearer {token}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["data"][0]["email"], SEED_EMAIL);
    // The hash never appears in any response shape.
    assert!(body["data"][0].get("password_hash").is_none());
}

#[tokio::test]
async fn expired_bearer_token_is_rejected() {
    let (app, state) = spawn_app().await;
    let user = seeded_user(&state).await;

    // A structurally valid token whose embedded expiry already passed.
    let claims = serde_json::json!({
        "user_id": user.id,
        "exp": (Utc::now() - chrono::Duration::hours(1)).timestamp(),
    });
    let token = jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
    )
    .unwrap();

    let response = app
        .clone()
        .oneshot(get_with_auth("/api/v1/users", &format!("Bearer {token}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn users_can_only_touch_their_own_record() {
    let (app, state) = spawn_app().await;
    let token = login_token(&app).await;
    let user = seeded_user(&state).await;

    let response = app
        .clone()
        .oneshot(get_with_auth(
            &format!("/api/v1/users/{}", user.id + 1),
            &format!("Bearer {token}"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .clone()
        .oneshot(get_with_auth(
            &format!("/api/v1/users/{}", user.id),
            &format!("Bearer {token}"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn password_reset_flow_end_to_end() {
    let (app, state) = spawn_app().await;

    // Unknown email gets the same 200 and stores nothing.
    let response = app
        .clone()
        .oneshot(post_json(
            "/request-password-reset",
            &serde_json::json!({ "email": "ghost@example.com" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(seeded_user(&state).await.reset_token.is_none());

    // Known email: 200 even though the test mailer refuses to send.
    let response = app
        .clone()
        .oneshot(post_json(
            "/request-password-reset",
            &serde_json::json!({ "email": SEED_EMAIL }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let token = seeded_user(&state).await.reset_token.expect("token stored");

    let response = app
        .clone()
        .oneshot(post_json(
            "/reset-password",
            &serde_json::json!({ "reset_token": token, "new_password": "Secret123" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // The token was cleared; replaying it fails.
    let response = app
        .clone()
        .oneshot(post_json(
            "/reset-password",
            &serde_json::json!({ "reset_token": token, "new_password": "Secret456" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Old password no longer works, the new one does.
    let response = app
        .clone()
        .oneshot(post_json(
            "/login",
            &serde_json::json!({ "email": SEED_EMAIL, "password": SEED_PASSWORD }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(post_json(
            "/login",
            &serde_json::json!({ "email": SEED_EMAIL, "password": "Secret123" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn unknown_reset_token_is_a_bad_request() {
    let (app, _state) = spawn_app().await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/reset-password",
            &serde_json::json!({ "reset_token": "f".repeat(64), "new_password": "Secret123" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn esp_crud_roundtrip() {
    let (app, _state) = spawn_app().await;
    let auth = format!("Bearer {DEFAULT_API_KEY}");

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/esps")
                .header("Authorization", &auth)
                .header("Content-Type", "application/json")
                .body(Body::from(
                    serde_json::json!({
                        "provider_name": "sendgrid",
                        "sending_domains": ["mail.example.com"],
                        "weight": 10
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let created = json_body(response).await;
    let esp_id = created["data"]["esp_id"].as_i64().unwrap();

    let response = app
        .clone()
        .oneshot(get_with_auth("/api/v1/esps", &auth))
        .await
        .unwrap();
    let body = json_body(response).await;
    assert_eq!(body["data"][0]["provider_name"], "sendgrid");
    assert_eq!(body["data"][0]["sending_domains"][0], "mail.example.com");

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/v1/esps/{esp_id}"))
                .header("Authorization", &auth)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn rotating_the_api_key_invalidates_the_old_one() {
    let (app, state) = spawn_app().await;
    let token = login_token(&app).await;
    let user = seeded_user(&state).await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/v1/users/{}/api-key", user.id))
                .header("Authorization", format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let new_key = json_body(response).await["data"]["api_key"]
        .as_str()
        .unwrap()
        .to_string();
    assert_ne!(new_key, DEFAULT_API_KEY);

    let response = app
        .clone()
        .oneshot(get_with_auth(
            "/api/v1/esps",
            &format!("Bearer {DEFAULT_API_KEY}"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(get_with_auth("/api/v1/esps", &format!("Bearer {new_key}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn health_endpoint_is_public() {
    let (app, _state) = spawn_app().await;

    let response = app.clone().oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "connected");
}
