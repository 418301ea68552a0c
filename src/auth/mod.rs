//! Auth - Clinician credentials and session tokens
//!
//! - Password hashing: salted PBKDF2-HMAC-SHA256, stored as `<salt>$<key>` hex
//! - Session tokens: HS256 JWTs carried as a Bearer header or session cookie

pub mod password;
pub mod session;

pub use password::{hash_password, check_password, PasswordCheck};
pub use session::{ensure_secret, generate_secret, Claims, SessionKeys};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("No session token")]
    MissingToken,
    #[error("Invalid session token: {0}")]
    InvalidToken(String),
    #[error("Crypto error: {0}")]
    Crypto(String),
}
