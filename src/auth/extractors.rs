//! Axum extractors for the request's authentication state.

use axum::{extract::FromRequestParts, http::request::Parts};

use super::errors::{ForbiddenError, UnauthorizedError};
use super::types::{AuthSession, Principal};
use crate::db::UserRole;

/// Extractor for endpoints that require an authenticated principal.
/// Rejects with 401 when the request is anonymous.
pub struct Auth(pub Principal);

impl<S> FromRequestParts<S> for Auth
where
    S: Send + Sync,
{
    type Rejection = UnauthorizedError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<AuthSession>() {
            Some(AuthSession::Authenticated(principal)) => Ok(Auth(principal.clone())),
            _ => Err(UnauthorizedError),
        }
    }
}

/// Optional authentication extractor - never fails.
/// For endpoints that work both authenticated and unauthenticated.
pub struct MaybeAuth(pub Option<Principal>);

impl<S> FromRequestParts<S> for MaybeAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let principal = parts
            .extensions
            .get::<AuthSession>()
            .and_then(|session| session.principal().cloned());
        Ok(MaybeAuth(principal))
    }
}

/// Extractor for admin-only endpoints. 401 when anonymous, 403 when
/// authenticated without the admin role.
pub struct AdminOnly(pub Principal);

#[derive(Debug)]
pub enum AdminRejection {
    Unauthorized(UnauthorizedError),
    Forbidden(ForbiddenError),
}

impl axum::response::IntoResponse for AdminRejection {
    fn into_response(self) -> axum::response::Response {
        match self {
            AdminRejection::Unauthorized(e) => e.into_response(),
            AdminRejection::Forbidden(e) => e.into_response(),
        }
    }
}

impl<S> FromRequestParts<S> for AdminOnly
where
    S: Send + Sync,
{
    type Rejection = AdminRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Auth(principal) = Auth::from_request_parts(parts, state)
            .await
            .map_err(AdminRejection::Unauthorized)?;

        if principal.role != UserRole::Admin {
            return Err(AdminRejection::Forbidden(ForbiddenError));
        }

        Ok(AdminOnly(principal))
    }
}
