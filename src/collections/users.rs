use std::sync::Arc;
use tracing::{info, warn};

use super::{next_id, ServiceError};
use crate::auth::{check_password, hash_password, PasswordCheck};
use crate::common::User;
use crate::store::Datastore;
use crate::validation::{LoginInput, SignupInput};

#[derive(Clone)]
pub struct UserService {
    store: Arc<Datastore>,
}

fn matches_identifier(user: &User, identifier: &str) -> bool {
    user.username == identifier
        || user.email.as_deref().is_some_and(|e| e.eq_ignore_ascii_case(identifier))
}

fn hash_for_store(password: &str) -> Result<String, ServiceError> {
    hash_password(password).map_err(|e| ServiceError::Internal(e.to_string()))
}

impl UserService {
    pub fn new(store: Arc<Datastore>) -> Self {
        Self { store }
    }

    /// Look up by username, or by email ignoring case
    pub async fn find_by_identifier(&self, identifier: &str) -> Result<Option<User>, ServiceError> {
        let db = self.store.snapshot().await?;
        Ok(db.users.into_iter().find(|u| matches_identifier(u, identifier)))
    }

    /// Check credentials and stamp `lastLoginAt`.
    ///
    /// Returns `None` for an unknown identifier or wrong password. A legacy
    /// plaintext password is replaced by a hash on success.
    pub async fn authenticate(&self, login: &LoginInput) -> Result<Option<User>, ServiceError> {
        let Some(user) = self.find_by_identifier(&login.identifier).await? else {
            return Ok(None);
        };

        let rehash = match check_password(&login.password, &user.password) {
            PasswordCheck::Mismatch => {
                warn!(user_id = user.id, "Password login rejected");
                return Ok(None);
            }
            PasswordCheck::Match => None,
            PasswordCheck::LegacyMatch => Some(hash_for_store(&login.password)?),
        };

        let now = chrono::Utc::now().to_rfc3339();
        let user = self.store.transact(|db| {
            let slot = db.users.iter_mut()
                .find(|u| u.id == user.id)
                .ok_or(ServiceError::NotFound("User"))?;
            slot.last_login_at = Some(now);
            if let Some(hash) = rehash {
                slot.password = hash;
            }
            Ok::<_, ServiceError>(slot.clone())
        }).await;

        match user {
            Ok(user) => {
                info!(user_id = user.id, "User signed in");
                Ok(Some(user))
            }
            // Deleted between lookup and update
            Err(ServiceError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Create an account; the email doubles as the username
    pub async fn register(&self, signup: SignupInput) -> Result<User, ServiceError> {
        let password = hash_for_store(&signup.password)?;
        let now = chrono::Utc::now().to_rfc3339();

        let user = self.store.transact(|db| {
            if db.users.iter().any(|u| matches_identifier(u, &signup.email)) {
                return Err(ServiceError::Conflict(
                    "An account with this email already exists".to_string(),
                ));
            }
            let user = User {
                id: next_id(db.users.iter().map(|u| u.id))?,
                username: signup.email.clone(),
                password,
                name: signup.full_name,
                role: signup.specialty,
                email: Some(signup.email),
                image: None,
                created_at: Some(now.clone()),
                last_login_at: Some(now),
            };
            db.users.push(user.clone());
            Ok(user)
        }).await?;

        info!(user_id = user.id, "User registered");
        Ok(user)
    }
}
