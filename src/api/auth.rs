//! Session lifecycle endpoints.
//!
//! - POST `/signup` - Create an account and log it in immediately
//! - POST `/login` - Exchange credentials for a token pair
//! - POST `/refresh` - Exchange a refresh token for a rotated pair
//! - POST `/logout` - Revoke the current access token and refresh record

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware,
    response::IntoResponse,
    routing::post,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::error::{ApiError, ResultExt};
use super::users::UserResponse;
use crate::auth::{Auth, AuthError, AuthService, bearer_token, password};
use crate::db::Database;
use crate::jwt::TokenError;
use crate::rate_limit::{RateLimitConfig, rate_limit_login, rate_limit_signup};

const MAX_LOGIN_ID_LEN: usize = 20;
const MAX_USER_NAME_LEN: usize = 12;
const MIN_PASSWORD_LEN: usize = 8;

#[derive(Clone)]
pub struct AuthApiState {
    pub db: Database,
    pub service: AuthService,
}

pub fn router(state: AuthApiState, rate_limits: Arc<RateLimitConfig>) -> Router {
    let signup_routes = Router::new()
        .route("/signup", post(signup))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(
            rate_limits.clone(),
            rate_limit_signup,
        ));

    let login_routes = Router::new()
        .route("/login", post(login))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(rate_limits, rate_limit_login));

    let session_routes = Router::new()
        .route("/refresh", post(refresh))
        .route("/logout", post(logout))
        .with_state(state);

    Router::new()
        .merge(signup_routes)
        .merge(login_routes)
        .merge(session_routes)
}

#[derive(Deserialize)]
struct SignupRequest {
    login_id: String,
    password: String,
    user_name: String,
}

#[derive(Serialize)]
struct SessionResponse {
    user: UserResponse,
    access_token: String,
    refresh_token: String,
}

async fn signup(
    State(state): State<AuthApiState>,
    Json(payload): Json<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let login_id = payload.login_id.trim();
    let user_name = payload.user_name.trim();

    if login_id.is_empty() || login_id.len() > MAX_LOGIN_ID_LEN {
        return Err(ApiError::bad_request(format!(
            "Login id must be 1-{} characters",
            MAX_LOGIN_ID_LEN
        )));
    }
    if !login_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(ApiError::bad_request(
            "Login id can only contain letters, numbers, and underscores",
        ));
    }
    if user_name.is_empty() || user_name.chars().count() > MAX_USER_NAME_LEN {
        return Err(ApiError::bad_request(format!(
            "User name must be 1-{} characters",
            MAX_USER_NAME_LEN
        )));
    }
    if payload.password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::bad_request(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }

    let available = state
        .db
        .users()
        .is_login_id_available(login_id)
        .await
        .db_err("Failed to check login id availability")?;
    if !available {
        return Err(ApiError::conflict("Login id is already taken"));
    }

    let hash = password::hash_password(&payload.password)
        .map_err(|e| ApiError::internal_error("Failed to hash password", e))?;

    state
        .db
        .users()
        .create(login_id, &hash, user_name)
        .await
        .db_err("Failed to create user")?;

    // Log the fresh account in so the client gets tokens right away.
    let (pair, user) = state
        .service
        .login(login_id, &payload.password)
        .await
        .map_err(|e| ApiError::internal_error("Post-signup login failed", e))?;

    Ok((
        StatusCode::CREATED,
        Json(SessionResponse {
            user: UserResponse::from(user),
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
        }),
    ))
}

#[derive(Deserialize)]
struct LoginRequest {
    login_id: String,
    password: String,
}

async fn login(
    State(state): State<AuthApiState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let (pair, user) = state
        .service
        .login(payload.login_id.trim(), &payload.password)
        .await?;

    Ok(Json(SessionResponse {
        user: UserResponse::from(user),
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
    }))
}

#[derive(Deserialize)]
struct RefreshRequest {
    refresh_token: String,
}

#[derive(Serialize)]
struct RefreshResponse {
    access_token: String,
    refresh_token: String,
}

async fn refresh(
    State(state): State<AuthApiState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let pair = state.service.refresh(&payload.refresh_token).await?;

    Ok(Json(RefreshResponse {
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
    }))
}

async fn logout(
    State(state): State<AuthApiState>,
    Auth(principal): Auth,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AuthError> {
    // The principal came from this header, so it is present; the guard only
    // covers a malformed re-read.
    let token = bearer_token(&headers).ok_or(AuthError::Token(TokenError::Malformed))?;

    state.service.logout(token, principal.user_id)?;

    Ok((StatusCode::OK, Json(serde_json::json!({ "success": true }))))
}
