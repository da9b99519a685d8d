//! JWT authentication with refresh-token rotation and logout revocation.
//!
//! Dual-token system: short-lived access tokens (15 min, revocable by jti)
//! and long-lived refresh tokens (7 days, tracked in the token store and
//! rotated on every use). A single middleware layer authenticates each
//! request and installs an [`AuthSession`] extension; extractors turn that
//! into per-endpoint authorization.

mod bearer;
mod errors;
mod extractors;
mod layer;
pub mod password;
mod service;
mod types;

pub use bearer::bearer_token;
pub use errors::{AuthError, ForbiddenError, UnauthorizedError};
pub use extractors::{AdminOnly, Auth, MaybeAuth};
pub use layer::{AllowList, AuthLayerState, authenticate};
pub use service::{AuthService, TokenPair};
pub use types::{AuthSession, Principal};
