//! Per-request authentication layer.
//!
//! Runs once for every inbound request, before any handler. The outcome is
//! an [`AuthSession`] request extension; the only terminal response it
//! produces itself is the 401 for a blacklisted token. Every other failure
//! mode downgrades the request to anonymous and lets endpoint-level
//! authorization reject it.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, Method, StatusCode},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use super::bearer::bearer_token;
use super::errors::error_response;
use super::service::AuthService;
use super::types::{AuthSession, Principal};
use crate::jwt::JwtConfig;

/// Paths that never require authentication.
///
/// Entries ending in `/` match as prefixes, everything else matches
/// exactly, mirroring how the routes themselves are declared.
#[derive(Debug, Clone)]
pub struct AllowList {
    entries: Vec<String>,
}

impl AllowList {
    pub fn new(entries: Vec<String>) -> Self {
        Self { entries }
    }

    pub fn matches(&self, path: &str) -> bool {
        self.entries.iter().any(|entry| {
            if entry.ends_with('/') {
                path.starts_with(entry.as_str())
            } else {
                path == entry
            }
        })
    }
}

/// State for the authentication layer.
#[derive(Clone)]
pub struct AuthLayerState {
    pub jwt: Arc<JwtConfig>,
    pub service: AuthService,
    pub allow_list: Arc<AllowList>,
}

/// Authentication middleware, applied to the whole router with
/// `middleware::from_fn_with_state`.
pub async fn authenticate(
    State(state): State<AuthLayerState>,
    mut request: Request,
    next: Next,
) -> Response {
    // CORS preflight and allow-listed paths skip authentication entirely.
    if request.method() == Method::OPTIONS || state.allow_list.matches(request.uri().path()) {
        return next.run(request).await;
    }

    let session = match resolve_session(&state, request.headers()) {
        Ok(session) => session,
        Err(rejection) => return rejection,
    };

    request.extensions_mut().insert(session);
    next.run(request).await
}

/// Turn the Authorization header into an [`AuthSession`].
///
/// A missing or invalid token is not an error here: the request proceeds
/// anonymous and downstream authorization decides. The only hard stop is a
/// revoked token, which gets its own 401 so a logged-out client can tell it
/// apart from an expired one.
fn resolve_session(state: &AuthLayerState, headers: &HeaderMap) -> Result<AuthSession, Response> {
    let Some(token) = bearer_token(headers) else {
        return Ok(AuthSession::Anonymous);
    };

    let claims = match state.jwt.validate_access_token(token) {
        Ok(claims) => claims,
        Err(e) => {
            debug!(error = %e, "Access token rejected");
            return Ok(AuthSession::Anonymous);
        }
    };

    if state.service.is_jti_revoked(&claims.jti) {
        debug!(user_id = claims.sub, "Blacklisted access token presented");
        return Err(error_response(
            StatusCode::UNAUTHORIZED,
            "BlacklistedToken",
            "Token has been revoked by logout",
        ));
    }

    Ok(AuthSession::Authenticated(Principal {
        user_id: claims.sub,
        role: claims.role,
    }))
}
