//! HTTP API surface.
//!
//! Each submodule owns its state struct and a `router(state)` function;
//! this module wires them together under their path prefixes.

pub mod auth;
pub mod error;
pub mod users;

use axum::Router;
use std::sync::Arc;

use crate::auth::AuthService;
use crate::db::Database;
use crate::rate_limit::RateLimitConfig;

/// Build the API router. Mounted at the application root, so the full
/// paths are `/auth/*` and `/users/*`.
pub fn create_api_router(
    db: Database,
    service: AuthService,
    rate_limits: Arc<RateLimitConfig>,
) -> Router {
    let auth_state = auth::AuthApiState {
        db: db.clone(),
        service: service.clone(),
    };
    let users_state = users::UsersState { db, service };

    Router::new()
        .nest("/auth", auth::router(auth_state, rate_limits))
        .nest("/users/", users::router(users_state))
}
