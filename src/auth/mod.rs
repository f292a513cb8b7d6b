//! Authentication and authorization for atrium
//!
//! Provides:
//! - Session token generation and validation (HS256, cookie or Bearer)
//! - Password hashing with Argon2
//! - Ordered role levels for authorization checks

pub mod password;
pub mod roles;
pub mod session;

pub use password::{hash_password, verify_password};
pub use roles::Role;
pub use session::{
    extract_session_cookie, extract_token_from_header, SessionClaims, SessionManager,
    TokenValidation, SESSION_COOKIE,
};
