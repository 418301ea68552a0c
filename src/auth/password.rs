//! Password hashing

use std::num::NonZeroU32;
use ring::pbkdf2;
use ring::rand::{SecureRandom, SystemRandom};

use super::AuthError;

const ITERATIONS: NonZeroU32 = match NonZeroU32::new(100_000) {
    Some(n) => n,
    None => panic!("iteration count must be non-zero"),
};
const SALT_LEN: usize = 16;
const KEY_LEN: usize = 32;

/// Outcome of checking a password against a stored value
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PasswordCheck {
    Match,
    /// Stored value is legacy plaintext; callers should rehash it
    LegacyMatch,
    Mismatch,
}

/// Hash password for storage
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let mut salt = [0u8; SALT_LEN];
    SystemRandom::new()
        .fill(&mut salt)
        .map_err(|_| AuthError::Crypto("Failed to generate salt".to_string()))?;

    let mut key = [0u8; KEY_LEN];
    pbkdf2::derive(pbkdf2::PBKDF2_HMAC_SHA256, ITERATIONS, &salt, password.as_bytes(), &mut key);
    Ok(format!("{}${}", hex::encode(salt), hex::encode(key)))
}

/// Split a `<salt>$<key>` hash; `None` for anything else
fn parse_hash(stored: &str) -> Option<(Vec<u8>, Vec<u8>)> {
    let (salt_hex, key_hex) = stored.split_once('$')?;
    let salt = hex::decode(salt_hex).ok()?;
    let key = hex::decode(key_hex).ok()?;
    if salt.len() != SALT_LEN || key.len() != KEY_LEN {
        return None;
    }
    Some((salt, key))
}

pub fn check_password(password: &str, stored: &str) -> PasswordCheck {
    match parse_hash(stored) {
        Some((salt, key)) => {
            match pbkdf2::verify(pbkdf2::PBKDF2_HMAC_SHA256, ITERATIONS, &salt, password.as_bytes(), &key) {
                Ok(()) => PasswordCheck::Match,
                Err(_) => PasswordCheck::Mismatch,
            }
        }
        None if constant_time_eq(password.as_bytes(), stored.as_bytes()) => PasswordCheck::LegacyMatch,
        None => PasswordCheck::Mismatch,
    }
}

/// Constant-time comparison
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}
