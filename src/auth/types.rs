//! Request-scoped authentication types.

use crate::db::UserRole;

/// The authenticated identity attached to a request.
/// Derived from a validated access token; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: i64,
    pub role: UserRole,
}

/// Authentication outcome for the current request, installed as a request
/// extension by the authentication layer. Downstream authorization checks
/// this explicitly instead of catching errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthSession {
    Authenticated(Principal),
    Anonymous,
}

impl AuthSession {
    pub fn principal(&self) -> Option<&Principal> {
        match self {
            AuthSession::Authenticated(principal) => Some(principal),
            AuthSession::Anonymous => None,
        }
    }
}
