//! JWT token generation and validation.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::db::UserRole;

/// Token type for distinguishing access vs refresh tokens.
///
/// The `typ` claim keeps the two signing contexts apart: an access token can
/// never be presented where a refresh token is expected, and vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    /// Short-lived access token (15 minutes), revocable by jti
    Access,
    /// Long-lived refresh token (7 days), tracked in the token store
    Refresh,
}

/// JWT claims for access tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// JWT ID (unique per token, blacklist key)
    pub jti: String,
    /// Subject (user id)
    pub sub: i64,
    /// User role
    pub role: UserRole,
    /// Token type
    #[serde(rename = "typ")]
    pub token_type: TokenType,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// JWT claims for refresh tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    /// JWT ID (unique per token, rotation tracking key)
    pub jti: String,
    /// Subject (user id)
    pub sub: i64,
    /// User role
    pub role: UserRole,
    /// Token type
    #[serde(rename = "typ")]
    pub token_type: TokenType,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// Access token duration: 15 minutes
pub const ACCESS_TOKEN_DURATION_SECS: u64 = 15 * 60;

/// Refresh token duration: 7 days
pub const REFRESH_TOKEN_DURATION_SECS: u64 = 7 * 24 * 60 * 60;

/// Configuration for JWT operations.
#[derive(Clone)]
pub struct JwtConfig {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

/// Result of minting a token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// The JWT token string
    pub token: String,
    /// JWT ID (unique identifier for store tracking)
    pub jti: String,
    /// Issued at timestamp (Unix seconds)
    pub issued_at: u64,
    /// Expiration timestamp (Unix seconds)
    pub expires_at: u64,
}

impl JwtConfig {
    /// Create a new JWT configuration with the given secret.
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
        }
    }

    /// Mint an access token for a user.
    /// Each call produces a fresh jti, so two tokens for the same user are
    /// independently revocable.
    pub fn issue_access_token(
        &self,
        user_id: i64,
        role: UserRole,
        ttl_secs: u64,
    ) -> Result<IssuedToken, TokenError> {
        let now = unix_now()?;
        let claims = AccessClaims {
            jti: uuid::Uuid::new_v4().to_string(),
            sub: user_id,
            role,
            token_type: TokenType::Access,
            iat: now,
            exp: now + ttl_secs,
        };

        let token = jsonwebtoken::encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(TokenError::Encoding)?;

        Ok(IssuedToken {
            token,
            jti: claims.jti,
            issued_at: claims.iat,
            expires_at: claims.exp,
        })
    }

    /// Mint a refresh token for a user.
    pub fn issue_refresh_token(
        &self,
        user_id: i64,
        role: UserRole,
        ttl_secs: u64,
    ) -> Result<IssuedToken, TokenError> {
        let now = unix_now()?;
        let claims = RefreshClaims {
            jti: uuid::Uuid::new_v4().to_string(),
            sub: user_id,
            role,
            token_type: TokenType::Refresh,
            iat: now,
            exp: now + ttl_secs,
        };

        let token = jsonwebtoken::encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(TokenError::Encoding)?;

        Ok(IssuedToken {
            token,
            jti: claims.jti,
            issued_at: claims.iat,
            expires_at: claims.exp,
        })
    }

    /// Validate and decode an access token.
    pub fn validate_access_token(&self, token: &str) -> Result<AccessClaims, TokenError> {
        let claims: AccessClaims = self.decode(token, false)?;

        if claims.token_type != TokenType::Access {
            return Err(TokenError::WrongTokenType);
        }

        Ok(claims)
    }

    /// Validate an access token but tolerate expiry. Logout needs the jti
    /// of a token that may have just expired; signature and type are still
    /// enforced.
    pub fn validate_access_token_allow_expired(
        &self,
        token: &str,
    ) -> Result<AccessClaims, TokenError> {
        let claims: AccessClaims = self.decode(token, true)?;

        if claims.token_type != TokenType::Access {
            return Err(TokenError::WrongTokenType);
        }

        Ok(claims)
    }

    /// Validate and decode a refresh token.
    pub fn validate_refresh_token(&self, token: &str) -> Result<RefreshClaims, TokenError> {
        let claims: RefreshClaims = self.decode(token, false)?;

        if claims.token_type != TokenType::Refresh {
            return Err(TokenError::WrongTokenType);
        }

        Ok(claims)
    }

    fn decode<C: serde::de::DeserializeOwned>(
        &self,
        token: &str,
        allow_expired: bool,
    ) -> Result<C, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        // Expiry is checked manually below so that exp == now counts as expired.
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        let token_data = jsonwebtoken::decode::<serde_json::Value>(
            token,
            &self.decoding_key,
            &validation,
        )
        .map_err(map_decode_error)?;

        let exp = token_data
            .claims
            .get("exp")
            .and_then(|v| v.as_u64())
            .ok_or(TokenError::Malformed)?;

        if !allow_expired && exp <= unix_now()? {
            return Err(TokenError::Expired);
        }

        serde_json::from_value(token_data.claims).map_err(|_| TokenError::Malformed)
    }
}

fn unix_now() -> Result<u64, TokenError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|_| TokenError::TimeError)
}

fn map_decode_error(e: jsonwebtoken::errors::Error) -> TokenError {
    use jsonwebtoken::errors::ErrorKind;
    match e.kind() {
        ErrorKind::InvalidSignature => TokenError::InvalidSignature,
        ErrorKind::ExpiredSignature => TokenError::Expired,
        _ => TokenError::Malformed,
    }
}

/// Errors that can occur during token operations.
#[derive(Debug, PartialEq, Eq)]
pub enum TokenError {
    /// Signature did not verify
    InvalidSignature,
    /// Token past its expiry
    Expired,
    /// Encoding could not be parsed
    Malformed,
    /// Wrong token type (e.g., using an access token as a refresh token)
    WrongTokenType,
    /// Error encoding the token
    Encoding(jsonwebtoken::errors::Error),
    /// System time error
    TimeError,
}

impl std::fmt::Display for TokenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenError::InvalidSignature => write!(f, "Token signature did not verify"),
            TokenError::Expired => write!(f, "Token has expired"),
            TokenError::Malformed => write!(f, "Token could not be parsed"),
            TokenError::WrongTokenType => write!(f, "Wrong token type"),
            TokenError::Encoding(e) => write!(f, "Failed to encode token: {}", e),
            TokenError::TimeError => write!(f, "System time error"),
        }
    }
}

impl std::error::Error for TokenError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> JwtConfig {
        JwtConfig::new(b"test-secret-key-for-testing")
    }

    #[test]
    fn test_issue_and_validate_access_token() {
        let config = test_config();

        let issued = config
            .issue_access_token(42, UserRole::User, ACCESS_TOKEN_DURATION_SECS)
            .unwrap();

        assert_eq!(issued.expires_at, issued.issued_at + ACCESS_TOKEN_DURATION_SECS);
        assert!(!issued.jti.is_empty());

        let claims = config.validate_access_token(&issued.token).unwrap();
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.role, UserRole::User);
        assert_eq!(claims.token_type, TokenType::Access);
        assert_eq!(claims.jti, issued.jti);
    }

    #[test]
    fn test_issue_and_validate_refresh_token() {
        let config = test_config();

        let issued = config
            .issue_refresh_token(42, UserRole::User, REFRESH_TOKEN_DURATION_SECS)
            .unwrap();

        let claims = config.validate_refresh_token(&issued.token).unwrap();
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.token_type, TokenType::Refresh);
        assert_eq!(claims.jti, issued.jti);
    }

    #[test]
    fn test_wrong_token_type_rejected() {
        let config = test_config();

        let access = config
            .issue_access_token(42, UserRole::User, ACCESS_TOKEN_DURATION_SECS)
            .unwrap();
        let refresh = config
            .issue_refresh_token(42, UserRole::User, REFRESH_TOKEN_DURATION_SECS)
            .unwrap();

        assert_eq!(
            config.validate_refresh_token(&access.token).unwrap_err(),
            TokenError::WrongTokenType
        );
        assert_eq!(
            config.validate_access_token(&refresh.token).unwrap_err(),
            TokenError::WrongTokenType
        );
    }

    #[test]
    fn test_admin_role_in_token() {
        let config = test_config();

        let issued = config
            .issue_access_token(7, UserRole::Admin, ACCESS_TOKEN_DURATION_SECS)
            .unwrap();

        let claims = config.validate_access_token(&issued.token).unwrap();
        assert_eq!(claims.role, UserRole::Admin);
    }

    #[test]
    fn test_malformed_token() {
        let config = test_config();

        assert_eq!(
            config.validate_access_token("not-a-token").unwrap_err(),
            TokenError::Malformed
        );
    }

    #[test]
    fn test_wrong_secret() {
        let config1 = JwtConfig::new(b"secret-1");
        let config2 = JwtConfig::new(b"secret-2");

        let issued = config1
            .issue_access_token(42, UserRole::User, ACCESS_TOKEN_DURATION_SECS)
            .unwrap();

        assert_eq!(
            config2.validate_access_token(&issued.token).unwrap_err(),
            TokenError::InvalidSignature
        );
    }

    #[test]
    fn test_expiry_boundary() {
        let config = test_config();

        // ttl 0 gives exp == now, which must already count as expired.
        let issued = config.issue_access_token(42, UserRole::User, 0).unwrap();

        assert_eq!(
            config.validate_access_token(&issued.token).unwrap_err(),
            TokenError::Expired
        );
    }

    #[test]
    fn test_expired_token_still_decodes_when_tolerated() {
        let config = test_config();

        let issued = config.issue_access_token(42, UserRole::User, 0).unwrap();

        let claims = config
            .validate_access_token_allow_expired(&issued.token)
            .unwrap();
        assert_eq!(claims.jti, issued.jti);

        // Signature and type checks are not relaxed.
        let other = JwtConfig::new(b"some-other-secret");
        assert_eq!(
            other
                .validate_access_token_allow_expired(&issued.token)
                .unwrap_err(),
            TokenError::InvalidSignature
        );
        let refresh = config
            .issue_refresh_token(42, UserRole::User, 0)
            .unwrap();
        assert_eq!(
            config
                .validate_access_token_allow_expired(&refresh.token)
                .unwrap_err(),
            TokenError::WrongTokenType
        );
    }

    #[test]
    fn test_unique_jti_per_token() {
        let config = test_config();

        let first = config
            .issue_access_token(42, UserRole::User, ACCESS_TOKEN_DURATION_SECS)
            .unwrap();
        let second = config
            .issue_access_token(42, UserRole::User, ACCESS_TOKEN_DURATION_SECS)
            .unwrap();

        assert_ne!(
            first.jti, second.jti,
            "Each token should carry a unique jti"
        );
    }
}
