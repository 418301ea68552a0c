//! Session tokens

use axum::http::{header, HeaderMap};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};

use super::AuthError;
use crate::common::User;
use crate::config::AuthConfig;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub name: String,
    pub iat: usize,
    pub exp: usize,
    pub roles: Vec<String>,
}

/// Random 256-bit secret, hex encoded
pub fn generate_secret() -> Result<String, AuthError> {
    let mut bytes = [0u8; 32];
    SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|_| AuthError::Crypto("Failed to generate session secret".to_string()))?;
    Ok(hex::encode(bytes))
}

/// Fill an empty `jwt_secret` with a random one. Returns true when generated.
pub fn ensure_secret(config: &mut AuthConfig) -> Result<bool, AuthError> {
    if !config.jwt_secret.is_empty() {
        return Ok(false);
    }
    config.jwt_secret = generate_secret()?;
    Ok(true)
}

/// Signs and verifies session tokens.
///
/// Keys built from an empty secret neither issue nor accept tokens.
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    configured: bool,
    ttl_hours: u64,
    cookie_name: String,
}

impl SessionKeys {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            configured: !config.jwt_secret.is_empty(),
            ttl_hours: config.session_ttl_hours,
            cookie_name: config.cookie_name.clone(),
        }
    }

    pub fn issue(&self, sub: &str, name: &str, roles: Vec<String>) -> Result<String, AuthError> {
        if !self.configured {
            return Err(AuthError::Crypto("Session secret is not configured".to_string()));
        }
        let now = chrono::Utc::now().timestamp().max(0) as usize;
        let claims = Claims {
            sub: sub.to_string(),
            name: name.to_string(),
            iat: now,
            exp: now + (self.ttl_hours as usize) * 3600,
            roles,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::Crypto(e.to_string()))
    }

    pub fn issue_for(&self, user: &User) -> Result<String, AuthError> {
        self.issue(&user.id.to_string(), &user.name, vec![user.role.clone()])
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        if !self.configured {
            return Err(AuthError::InvalidToken("session secret is not configured".to_string()));
        }
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))
    }

    /// Token from `Authorization: Bearer` or, failing that, the session cookie
    pub fn token_from_headers(&self, headers: &HeaderMap) -> Option<String> {
        let bearer = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty());
        if let Some(token) = bearer {
            return Some(token.to_string());
        }

        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, value)| *name == self.cookie_name && !value.is_empty())
            .map(|(_, value)| value.to_string())
    }

    /// Verified claims for a request
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<Claims, AuthError> {
        let token = self.token_from_headers(headers).ok_or(AuthError::MissingToken)?;
        self.verify(&token)
    }

    /// `Set-Cookie` value carrying `token`
    pub fn session_cookie(&self, token: &str) -> String {
        format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            self.cookie_name,
            token,
            self.ttl_hours * 3600
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn keys(secret: &str) -> SessionKeys {
        SessionKeys::new(&AuthConfig {
            jwt_secret: secret.to_string(),
            ..AuthConfig::default()
        })
    }

    #[test]
    fn test_issue_and_verify() {
        let keys = keys("test-secret");
        let token = keys.issue("7", "Dr Rao", vec!["Cardiology".to_string()]).unwrap();
        let claims = keys.verify(&token).unwrap();
        assert_eq!(claims.sub, "7");
        assert_eq!(claims.roles, vec!["Cardiology"]);
    }

    #[test]
    fn test_foreign_secret_rejected() {
        let token = keys("one").issue("1", "A", vec![]).unwrap();
        assert!(matches!(keys("two").verify(&token), Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn test_empty_secret_accepts_nothing() {
        let empty = keys("");
        assert!(matches!(empty.issue("1", "A", vec![]), Err(AuthError::Crypto(_))));

        let token = keys("some-other-secret").issue("1", "A", vec![]).unwrap();
        assert!(matches!(empty.verify(&token), Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn test_ensure_secret() {
        let mut config = AuthConfig::default();
        assert!(ensure_secret(&mut config).unwrap());
        assert_eq!(config.jwt_secret.len(), 64);

        let generated = config.jwt_secret.clone();
        assert!(!ensure_secret(&mut config).unwrap());
        assert_eq!(config.jwt_secret, generated);

        let mut other = AuthConfig::default();
        ensure_secret(&mut other).unwrap();
        assert_ne!(other.jwt_secret, generated);
    }

    #[test]
    fn test_token_sources() {
        let keys = keys("s");
        let mut headers = HeaderMap::new();
        assert!(matches!(keys.authenticate(&headers), Err(AuthError::MissingToken)));

        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark; session=abc"));
        assert_eq!(keys.token_from_headers(&headers).as_deref(), Some("abc"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer xyz"));
        assert_eq!(keys.token_from_headers(&headers).as_deref(), Some("xyz"));
    }
}
