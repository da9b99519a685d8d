//! Bearer token extraction from the Authorization header.

use axum::http::{HeaderMap, header};

/// Extract the bearer token from the Authorization header, if present and
/// well-formed. Anything else is treated as "no token", never an error.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() { None } else { Some(token) }
}
