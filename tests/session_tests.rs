//! End-to-end session lifecycle tests: login, refresh rotation, logout
//! revocation, and replay handling through the full HTTP stack.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use careerchat::{
    ServerConfig, create_app,
    db::{Database, UserRole},
    default_allow_list,
    jwt::JwtConfig,
    store::TokenStore,
};
use serde_json::{Value, json};
use tower::ServiceExt;

const TEST_SECRET: &[u8] = b"test-jwt-secret-0123456789abcdef";

async fn create_test_app() -> (Router, Database, Arc<TokenStore>) {
    let db = Database::open(":memory:")
        .await
        .expect("Failed to open test database");
    let store = Arc::new(TokenStore::new());
    let config = ServerConfig {
        db: db.clone(),
        store: store.clone(),
        jwt_secret: TEST_SECRET.to_vec(),
        allow_origin: None,
        allow_list: default_allow_list(),
    };
    (create_app(&config), db, store)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    }
}

async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    (status, body_json(response).await)
}

async fn post_authed(app: &Router, uri: &str, token: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    (status, body_json(response).await)
}

async fn get_me(app: &Router, token: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/users/me")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    (status, body_json(response).await)
}

/// Sign up a user and return (access_token, refresh_token).
async fn signup(app: &Router, login_id: &str, password: &str) -> (String, String) {
    let (status, body) = post_json(
        app,
        "/auth/signup",
        json!({ "login_id": login_id, "password": password, "user_name": "Tester" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    (
        body["access_token"].as_str().unwrap().to_string(),
        body["refresh_token"].as_str().unwrap().to_string(),
    )
}

async fn login(app: &Router, login_id: &str, password: &str) -> (String, String) {
    let (status, body) = post_json(
        app,
        "/auth/login",
        json!({ "login_id": login_id, "password": password }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    (
        body["access_token"].as_str().unwrap().to_string(),
        body["refresh_token"].as_str().unwrap().to_string(),
    )
}

#[tokio::test]
async fn test_full_session_lifecycle() {
    let (app, _db, _store) = create_test_app().await;
    signup(&app, "alice", "P@ssw0rd1").await;

    let (access1, refresh1) = login(&app, "alice", "P@ssw0rd1").await;

    // Access token works.
    let (status, body) = get_me(&app, &access1).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["login_id"], "alice");

    // Rotate the pair.
    let (status, body) = post_json(&app, "/auth/refresh", json!({ "refresh_token": refresh1 })).await;
    assert_eq!(status, StatusCode::OK);
    let access2 = body["access_token"].as_str().unwrap().to_string();
    let refresh2 = body["refresh_token"].as_str().unwrap().to_string();
    assert_ne!(access2, access1);
    assert_ne!(refresh2, refresh1);

    // The old access token stays valid until it expires naturally.
    let (status, _) = get_me(&app, &access1).await;
    assert_eq!(status, StatusCode::OK);

    // Logout with the current access token.
    let (status, body) = post_authed(&app, "/auth/logout", &access2).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    // The logged-out token is now blacklisted.
    let (status, body) = get_me(&app, &access2).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "BlacklistedToken");

    // Logout dropped the refresh record too.
    let (status, body) = post_json(&app, "/auth/refresh", json!({ "refresh_token": refresh2 })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "RefreshTokenNotFound");
}

#[tokio::test]
async fn test_refresh_replay_tears_down_session() {
    let (app, _db, _store) = create_test_app().await;
    let (_, refresh1) = signup(&app, "alice", "P@ssw0rd1").await;

    let (status, body) = post_json(&app, "/auth/refresh", json!({ "refresh_token": refresh1 })).await;
    assert_eq!(status, StatusCode::OK);
    let refresh2 = body["refresh_token"].as_str().unwrap().to_string();

    // Replaying the rotated-out token is treated as theft.
    let (status, body) = post_json(&app, "/auth/refresh", json!({ "refresh_token": refresh1 })).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "RefreshTokenMismatch");

    // The replay invalidated the whole session, including the new token.
    let (status, body) = post_json(&app, "/auth/refresh", json!({ "refresh_token": refresh2 })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "RefreshTokenNotFound");
}

#[tokio::test]
async fn test_second_login_rotates_out_previous_refresh_token() {
    let (app, _db, _store) = create_test_app().await;
    signup(&app, "alice", "P@ssw0rd1").await;

    let (_, refresh1) = login(&app, "alice", "P@ssw0rd1").await;
    let (_, refresh2) = login(&app, "alice", "P@ssw0rd1").await;

    let (status, body) = post_json(&app, "/auth/refresh", json!({ "refresh_token": refresh1 })).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "RefreshTokenMismatch");

    // The replay invalidated the session, so the second login's token is gone.
    let (status, _) = post_json(&app, "/auth/refresh", json!({ "refresh_token": refresh2 })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_logout_without_refresh_record_is_already_logged_out() {
    let (app, _db, _store) = create_test_app().await;
    signup(&app, "alice", "P@ssw0rd1").await;

    let (access1, _) = login(&app, "alice", "P@ssw0rd1").await;
    let (access2, _) = login(&app, "alice", "P@ssw0rd1").await;

    let (status, _) = post_authed(&app, "/auth/logout", &access2).await;
    assert_eq!(status, StatusCode::OK);

    // access1 is not blacklisted, but the refresh record is already gone.
    let (status, body) = post_authed(&app, "/auth/logout", &access1).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "AlreadyLoggedOut");
}

#[tokio::test]
async fn test_logout_with_blacklisted_token_is_rejected_at_the_door() {
    let (app, _db, _store) = create_test_app().await;
    let (access, _) = signup(&app, "alice", "P@ssw0rd1").await;

    let (status, _) = post_authed(&app, "/auth/logout", &access).await;
    assert_eq!(status, StatusCode::OK);

    // The same token cannot authenticate a second logout.
    let (status, body) = post_authed(&app, "/auth/logout", &access).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "BlacklistedToken");
}

#[tokio::test]
async fn test_expired_access_token_is_anonymous() {
    let (app, db, _store) = create_test_app().await;
    signup(&app, "alice", "P@ssw0rd1").await;
    let user = db.users().get_by_login_id("alice").await.unwrap().unwrap();

    // Zero ttl: expired the moment it is minted.
    let jwt = JwtConfig::new(TEST_SECRET);
    let expired = jwt
        .issue_access_token(user.user_id, UserRole::User, 0)
        .unwrap();

    let (status, body) = get_me(&app, &expired.token).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Unauthorized");
}

#[tokio::test]
async fn test_expired_token_is_expired_even_when_blacklisted() {
    let (app, db, store) = create_test_app().await;
    signup(&app, "alice", "P@ssw0rd1").await;
    let user = db.users().get_by_login_id("alice").await.unwrap().unwrap();

    let jwt = JwtConfig::new(TEST_SECRET);
    let expired = jwt
        .issue_access_token(user.user_id, UserRole::User, 0)
        .unwrap();
    store.revoke(&expired.jti, expired.expires_at + 3600);

    // Expiry is checked before the blacklist: the request is anonymous,
    // not a blacklist rejection.
    let (status, body) = get_me(&app, &expired.token).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Unauthorized");
}

#[tokio::test]
async fn test_refresh_token_cannot_authenticate_requests() {
    let (app, _db, _store) = create_test_app().await;
    let (_, refresh) = signup(&app, "alice", "P@ssw0rd1").await;

    let (status, body) = get_me(&app, &refresh).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Unauthorized");
}

#[tokio::test]
async fn test_access_token_cannot_be_used_as_refresh_token() {
    let (app, _db, _store) = create_test_app().await;
    let (access, _) = signup(&app, "alice", "P@ssw0rd1").await;

    let (status, body) = post_json(&app, "/auth/refresh", json!({ "refresh_token": access })).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "InvalidRefreshToken");
}

#[tokio::test]
async fn test_allowlisted_route_ignores_bad_authorization_header() {
    let (app, _db, _store) = create_test_app().await;
    signup(&app, "alice", "P@ssw0rd1").await;

    // A stale or garbage token must not block login itself.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/auth/login")
                .header("content-type", "application/json")
                .header(header::AUTHORIZATION, "Bearer not-a-jwt")
                .body(Body::from(
                    json!({ "login_id": "alice", "password": "P@ssw0rd1" }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_wrong_signing_key_is_anonymous() {
    let (app, db, _store) = create_test_app().await;
    signup(&app, "alice", "P@ssw0rd1").await;
    let user = db.users().get_by_login_id("alice").await.unwrap().unwrap();

    let other = JwtConfig::new(b"another-secret-key-for-testing!!");
    let forged = other
        .issue_access_token(user.user_id, UserRole::Admin, 900)
        .unwrap();

    let (status, body) = get_me(&app, &forged.token).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Unauthorized");
}
