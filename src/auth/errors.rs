//! Authentication error types and their HTTP mappings.
//!
//! Every auth failure surfaces as a small stable JSON body
//! `{"error": <code>, "message": <text>}` with no internal detail.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

use crate::jwt::TokenError;

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: &'static str,
}

/// Build the standard auth error response.
pub(crate) fn error_response(
    status: StatusCode,
    code: &'static str,
    message: &'static str,
) -> Response {
    (status, Json(ErrorBody { error: code, message })).into_response()
}

/// Errors surfaced by the auth service. The API layer maps these to HTTP
/// statuses; the service itself never touches HTTP.
#[derive(Debug)]
pub enum AuthError {
    /// Unknown user or wrong password. Deliberately a single variant so the
    /// response cannot be used for account enumeration.
    InvalidCredentials,
    /// Presented refresh token failed codec validation
    InvalidRefreshToken,
    /// No stored refresh record for the token's subject
    RefreshTokenNotFound,
    /// Presented refresh token is not the stored one (rotated-out reuse)
    RefreshTokenMismatch,
    /// Logout with no live refresh record; idempotency signal
    AlreadyLoggedOut,
    /// Access token subject does not match the requesting principal
    SubjectMismatch,
    /// Access or refresh token failed validation in a non-refresh flow
    Token(TokenError),
    /// Underlying user-store failure
    Database(sqlx::Error),
}

impl AuthError {
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::InvalidCredentials => "InvalidCredentials",
            AuthError::InvalidRefreshToken => "InvalidRefreshToken",
            AuthError::RefreshTokenNotFound => "RefreshTokenNotFound",
            AuthError::RefreshTokenMismatch => "RefreshTokenMismatch",
            AuthError::AlreadyLoggedOut => "AlreadyLoggedOut",
            AuthError::SubjectMismatch => "InvalidToken",
            AuthError::Token(_) => "InvalidToken",
            AuthError::Database(_) => "InternalError",
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AuthError::InvalidRefreshToken => StatusCode::UNAUTHORIZED,
            AuthError::RefreshTokenNotFound => StatusCode::NOT_FOUND,
            AuthError::RefreshTokenMismatch => StatusCode::UNAUTHORIZED,
            AuthError::AlreadyLoggedOut => StatusCode::BAD_REQUEST,
            AuthError::SubjectMismatch | AuthError::Token(_) => StatusCode::BAD_REQUEST,
            AuthError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> &'static str {
        match self {
            AuthError::InvalidCredentials => "Invalid login id or password",
            AuthError::InvalidRefreshToken => "Invalid or expired refresh token",
            AuthError::RefreshTokenNotFound => "No refresh token on record",
            AuthError::RefreshTokenMismatch => "Refresh token has been superseded",
            AuthError::AlreadyLoggedOut => "Already logged out",
            AuthError::SubjectMismatch | AuthError::Token(_) => "Invalid token",
            AuthError::Database(_) => "Internal error",
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::Token(e) => write!(f, "{}: {}", self.message(), e),
            AuthError::Database(e) => write!(f, "{}: {}", self.message(), e),
            _ => f.write_str(self.message()),
        }
    }
}

impl std::error::Error for AuthError {}

impl From<sqlx::Error> for AuthError {
    fn from(e: sqlx::Error) -> Self {
        AuthError::Database(e)
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        if let AuthError::Database(e) = &self {
            error!(error = %e, "User store failure in auth path");
        }
        error_response(self.status_code(), self.code(), self.message())
    }
}

/// Rejection for endpoints that require a principal when the request is
/// anonymous.
#[derive(Debug)]
pub struct UnauthorizedError;

impl IntoResponse for UnauthorizedError {
    fn into_response(self) -> Response {
        error_response(
            StatusCode::UNAUTHORIZED,
            "Unauthorized",
            "Authentication required",
        )
    }
}

/// Rejection for endpoints that require the admin role.
#[derive(Debug)]
pub struct ForbiddenError;

impl IntoResponse for ForbiddenError {
    fn into_response(self) -> Response {
        error_response(
            StatusCode::FORBIDDEN,
            "Forbidden",
            "Insufficient permissions",
        )
    }
}
