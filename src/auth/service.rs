//! Auth service: login, refresh-token rotation, logout, revocation checks.
//!
//! The service is the only writer of token-store state. Handlers call it
//! and map its typed errors to HTTP; the authentication layer only reads
//! the blacklist through it.

use std::sync::Arc;

use tracing::{debug, warn};

use super::errors::AuthError;
use super::password;
use crate::db::{Database, User};
use crate::jwt::{
    ACCESS_TOKEN_DURATION_SECS, JwtConfig, REFRESH_TOKEN_DURATION_SECS, TokenError,
};
use crate::store::{RefreshRecord, RotateError, TokenStore};

/// A freshly minted access/refresh token pair.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Clone)]
pub struct AuthService {
    db: Database,
    store: Arc<TokenStore>,
    jwt: Arc<JwtConfig>,
}

impl AuthService {
    pub fn new(db: Database, store: Arc<TokenStore>, jwt: Arc<JwtConfig>) -> Self {
        Self { db, store, jwt }
    }

    /// Verify credentials and start a session: mint a token pair and store
    /// the refresh record, replacing any previous one for this user.
    ///
    /// Unknown login id and wrong password return the identical error, and
    /// the unknown-user path still runs a hash verification so the two are
    /// not distinguishable by timing either.
    pub async fn login(&self, login_id: &str, password: &str) -> Result<(TokenPair, User), AuthError> {
        let user = match self.db.users().get_by_login_id(login_id).await? {
            Some(user) => user,
            None => {
                let _ = password::verify_password(password, password::DUMMY_HASH);
                return Err(AuthError::InvalidCredentials);
            }
        };

        match password::verify_password(password, &user.password_hash) {
            Ok(true) => {}
            Ok(false) => return Err(AuthError::InvalidCredentials),
            Err(e) => {
                warn!(user_id = user.user_id, error = %e, "Stored password hash is unreadable");
                return Err(AuthError::InvalidCredentials);
            }
        }

        let pair = self.issue_pair(user.user_id, user.role)?;
        Ok((pair, user))
    }

    /// Exchange a refresh token for a new pair, rotating the stored record.
    /// The presented token becomes unusable even though it has not expired.
    pub async fn refresh(&self, presented: &str) -> Result<TokenPair, AuthError> {
        let claims = self
            .jwt
            .validate_refresh_token(presented)
            .map_err(|e| {
                debug!(error = %e, "Refresh token failed validation");
                AuthError::InvalidRefreshToken
            })?;

        // The subject must still exist; its current role goes into the new
        // pair so a role change takes effect at the next rotation.
        let user = self
            .db
            .users()
            .get_by_id(claims.sub)
            .await?
            .ok_or(AuthError::InvalidRefreshToken)?;

        let access = self
            .jwt
            .issue_access_token(user.user_id, user.role, ACCESS_TOKEN_DURATION_SECS)
            .map_err(AuthError::Token)?;
        let next_refresh = self
            .jwt
            .issue_refresh_token(user.user_id, user.role, REFRESH_TOKEN_DURATION_SECS)
            .map_err(AuthError::Token)?;

        let next_record = RefreshRecord {
            jti: next_refresh.jti.clone(),
            expires_at: next_refresh.expires_at,
        };

        match self.store.rotate(user.user_id, &claims.jti, next_record) {
            Ok(()) => Ok(TokenPair {
                access_token: access.token,
                refresh_token: next_refresh.token,
            }),
            Err(RotateError::NotFound) => Err(AuthError::RefreshTokenNotFound),
            Err(RotateError::Mismatch) => {
                warn!(
                    user_id = user.user_id,
                    "Rotated-out refresh token replayed; session invalidated"
                );
                Err(AuthError::RefreshTokenMismatch)
            }
        }
    }

    /// End the session: blacklist the presented access token until its
    /// natural expiry and drop the refresh record.
    ///
    /// Decoding tolerates an expired token, since logout only needs its
    /// jti and an expired entry in the blacklist is harmless.
    /// `AlreadyLoggedOut` means there was no refresh record to drop; the
    /// access token is still revoked first, so a repeated logout stays safe.
    pub fn logout(&self, access_token: &str, user_id: i64) -> Result<(), AuthError> {
        let claims = self
            .jwt
            .validate_access_token_allow_expired(access_token)
            .map_err(AuthError::Token)?;

        if claims.sub != user_id {
            return Err(AuthError::SubjectMismatch);
        }

        self.store.revoke(&claims.jti, claims.exp);

        if !self.store.delete_refresh(user_id) {
            return Err(AuthError::AlreadyLoggedOut);
        }
        Ok(())
    }

    /// Check whether an access token has been revoked by logout.
    pub fn is_blacklisted(&self, access_token: &str) -> Result<bool, TokenError> {
        let claims = self.jwt.validate_access_token(access_token)?;
        Ok(self.store.is_revoked(&claims.jti))
    }

    /// Blacklist lookup by jti, for callers that already hold validated
    /// claims (the authentication layer).
    pub fn is_jti_revoked(&self, jti: &str) -> bool {
        self.store.is_revoked(jti)
    }

    fn issue_pair(&self, user_id: i64, role: crate::db::UserRole) -> Result<TokenPair, AuthError> {
        let access = self
            .jwt
            .issue_access_token(user_id, role, ACCESS_TOKEN_DURATION_SECS)
            .map_err(AuthError::Token)?;
        let refresh = self
            .jwt
            .issue_refresh_token(user_id, role, REFRESH_TOKEN_DURATION_SECS)
            .map_err(AuthError::Token)?;

        self.store.put_refresh(
            user_id,
            RefreshRecord {
                jti: refresh.jti,
                expires_at: refresh.expires_at,
            },
        );

        Ok(TokenPair {
            access_token: access.token,
            refresh_token: refresh.token,
        })
    }
}
