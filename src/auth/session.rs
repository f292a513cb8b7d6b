//! Session token handling
//!
//! Sessions are stateless HS256 tokens carried in a `session` cookie or
//! an `Authorization: Bearer` header. Claims resolve directly to the
//! caller's user, tenant, and role; no per-request database lookup.
//!
//! Security notes:
//! - Tokens are signed with HS256 (HMAC-SHA256)
//! - Default expiry is 24 hours
//! - In production, SESSION_SECRET must be a strong random value

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::auth::Role;
use crate::types::AtriumError;

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "session";

/// Payload stored in a session token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// User id
    pub sub: String,
    /// Tenant the user belongs to
    pub tenant_id: String,
    /// User email
    pub email: String,
    /// Role within the tenant
    pub role: Role,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// Result of token validation
#[derive(Debug)]
pub struct TokenValidation {
    pub valid: bool,
    pub claims: Option<SessionClaims>,
    pub error: Option<String>,
}

impl TokenValidation {
    pub fn valid(claims: SessionClaims) -> Self {
        Self {
            valid: true,
            claims: Some(claims),
            error: None,
        }
    }

    pub fn invalid(error: impl Into<String>) -> Self {
        Self {
            valid: false,
            claims: None,
            error: Some(error.into()),
        }
    }
}

/// Session token generator and validator
#[derive(Clone)]
pub struct SessionManager {
    secret: String,
    ttl_seconds: u64,
}

impl SessionManager {
    /// Create a new session manager
    ///
    /// Returns an error if the secret is empty or too short.
    pub fn new(secret: String, ttl_seconds: u64) -> Result<Self, AtriumError> {
        if secret.is_empty() {
            return Err(AtriumError::Config(
                "SESSION_SECRET is required in production mode".into(),
            ));
        }

        if secret.len() < 32 {
            return Err(AtriumError::Config(
                "SESSION_SECRET must be at least 32 characters".into(),
            ));
        }

        Ok(Self {
            secret,
            ttl_seconds,
        })
    }

    /// Create a manager for dev mode (allows weak secret)
    pub fn new_dev() -> Self {
        Self {
            secret: "dev-mode-secret-not-for-production-use-1234".into(),
            ttl_seconds: 86400,
        }
    }

    /// Issue a session token for an authenticated user
    pub fn issue(
        &self,
        user_id: &str,
        tenant_id: &str,
        email: &str,
        role: Role,
    ) -> Result<String, AtriumError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| AtriumError::Auth(format!("System time error: {}", e)))?
            .as_secs();

        let claims = SessionClaims {
            sub: user_id.to_string(),
            tenant_id: tenant_id.to_string(),
            email: email.to_string(),
            role,
            iat: now,
            exp: now + self.ttl_seconds,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| AtriumError::Auth(format!("Failed to issue session token: {}", e)))
    }

    /// Verify and decode a session token
    pub fn verify(&self, token: &str) -> TokenValidation {
        let validation = Validation::default();

        match decode::<SessionClaims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        ) {
            Ok(token_data) => TokenValidation::valid(token_data.claims),
            Err(err) => {
                use jsonwebtoken::errors::ErrorKind;
                let error_msg = match err.kind() {
                    ErrorKind::ExpiredSignature => "Session expired",
                    ErrorKind::InvalidToken => "Invalid session token",
                    ErrorKind::InvalidSignature => "Invalid signature",
                    _ => "Session validation failed",
                };
                TokenValidation::invalid(error_msg)
            }
        }
    }

    /// Session expiry in seconds
    pub fn ttl_seconds(&self) -> u64 {
        self.ttl_seconds
    }
}

/// Extract token from Authorization header.
/// Supports "Bearer <token>" format and raw tokens.
pub fn extract_token_from_header(auth_header: Option<&str>) -> Option<&str> {
    let header = auth_header?;

    if let Some(token) = header.strip_prefix("Bearer ") {
        let token = token.trim();
        if !token.is_empty() {
            return Some(token);
        }
    }

    if !header.contains(' ') {
        let token = header.trim();
        if !token.is_empty() {
            return Some(token);
        }
    }

    None
}

/// Extract the session token from a Cookie header value
pub fn extract_session_cookie(cookie_header: Option<&str>) -> Option<&str> {
    let header = cookie_header?;

    for pair in header.split(';') {
        if let Some((key, value)) = pair.trim().split_once('=') {
            if key == SESSION_COOKIE && !value.is_empty() {
                return Some(value);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_manager() -> SessionManager {
        SessionManager::new(
            "test-secret-that-is-at-least-32-characters-long".into(),
            3600,
        )
        .unwrap()
    }

    #[test]
    fn test_issue_and_verify() {
        let sessions = test_manager();

        let token = sessions
            .issue("user-1", "tenant-1", "ada@example.com", Role::Manager)
            .unwrap();
        assert!(!token.is_empty());

        let result = sessions.verify(&token);
        assert!(result.valid);

        let claims = result.claims.unwrap();
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.tenant_id, "tenant-1");
        assert_eq!(claims.email, "ada@example.com");
        assert_eq!(claims.role, Role::Manager);
    }

    #[test]
    fn test_invalid_token() {
        let sessions = test_manager();

        let result = sessions.verify("invalid-token");
        assert!(!result.valid);
        assert!(result.error.is_some());
    }

    #[test]
    fn test_wrong_secret() {
        let sessions1 = test_manager();
        let sessions2 = SessionManager::new(
            "different-secret-that-is-at-least-32-chars".into(),
            3600,
        )
        .unwrap();

        let token = sessions1
            .issue("user-1", "tenant-1", "ada@example.com", Role::Member)
            .unwrap();

        assert!(!sessions2.verify(&token).valid);
    }

    #[test]
    fn test_extract_token_from_header() {
        assert_eq!(
            extract_token_from_header(Some("Bearer abc123")),
            Some("abc123")
        );
        assert_eq!(extract_token_from_header(Some("abc123")), Some("abc123"));
        assert_eq!(extract_token_from_header(None), None);
        assert_eq!(extract_token_from_header(Some("")), None);
        assert_eq!(extract_token_from_header(Some("Bearer ")), None);
        assert_eq!(extract_token_from_header(Some("Basic abc123")), None);
    }

    #[test]
    fn test_extract_session_cookie() {
        assert_eq!(
            extract_session_cookie(Some("session=abc123")),
            Some("abc123")
        );
        assert_eq!(
            extract_session_cookie(Some("theme=dark; session=abc123; lang=en")),
            Some("abc123")
        );
        assert_eq!(extract_session_cookie(Some("theme=dark")), None);
        assert_eq!(extract_session_cookie(Some("session=")), None);
        assert_eq!(extract_session_cookie(None), None);
    }

    #[test]
    fn test_secret_validation() {
        assert!(SessionManager::new("short".into(), 3600).is_err());
        assert!(SessionManager::new("".into(), 3600).is_err());
        assert!(
            SessionManager::new("this-secret-is-at-least-32-chars-long!!".into(), 3600).is_ok()
        );
    }

    #[test]
    fn test_dev_mode_manager() {
        let sessions = SessionManager::new_dev();
        let token = sessions
            .issue("user-1", "tenant-1", "ada@example.com", Role::Owner)
            .unwrap();
        assert!(sessions.verify(&token).valid);
    }
}
