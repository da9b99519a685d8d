//! User account endpoints.
//!
//! - GET `/me` - Current user's profile
//! - DELETE `/me` - Delete the account after re-verifying the password
//! - GET `/` - List all users (admin only)

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::get,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::error::{ApiError, ResultExt};
use crate::auth::{AdminOnly, Auth, AuthError, AuthService, bearer_token, password};
use crate::db::{Database, User};

#[derive(Clone)]
pub struct UsersState {
    pub db: Database,
    pub service: AuthService,
}

pub fn router(state: UsersState) -> Router {
    Router::new()
        .route("/me", get(me).delete(delete_me))
        .route("/", get(list_users))
        .with_state(state)
}

/// Public view of a user. Never includes the password hash.
#[derive(Serialize)]
pub struct UserResponse {
    pub user_id: i64,
    pub login_id: String,
    pub user_name: String,
    pub role: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            user_id: user.user_id,
            login_id: user.login_id,
            user_name: user.user_name,
            role: user.role.as_str().to_string(),
        }
    }
}

async fn me(
    State(state): State<UsersState>,
    Auth(principal): Auth,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state
        .db
        .users()
        .get_by_id(principal.user_id)
        .await
        .db_err("Failed to fetch user")?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(UserResponse::from(user)))
}

#[derive(Deserialize)]
struct DeleteAccountRequest {
    password: String,
}

async fn delete_me(
    State(state): State<UsersState>,
    Auth(principal): Auth,
    headers: HeaderMap,
    Json(payload): Json<DeleteAccountRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .db
        .users()
        .get_by_id(principal.user_id)
        .await
        .db_err("Failed to fetch user")?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let verified = password::verify_password(&payload.password, &user.password_hash)
        .map_err(|e| ApiError::internal_error("Failed to verify password", e))?;
    if !verified {
        return Err(ApiError::bad_request("Password does not match"));
    }

    // Tear the session down before the row goes away. A concurrent logout
    // may have beaten us to the refresh record; that is fine.
    if let Some(token) = bearer_token(&headers) {
        match state.service.logout(token, principal.user_id) {
            Ok(()) | Err(AuthError::AlreadyLoggedOut) => {}
            Err(e) => return Err(ApiError::internal_error("Failed to end session", e)),
        }
    }

    state
        .db
        .users()
        .delete(principal.user_id)
        .await
        .db_err("Failed to delete user")?;

    info!(user_id = principal.user_id, "User account deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn list_users(
    State(state): State<UsersState>,
    AdminOnly(_admin): AdminOnly,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let users = state
        .db
        .users()
        .list()
        .await
        .db_err("Failed to list users")?;

    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}
