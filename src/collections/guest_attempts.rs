use std::sync::Arc;
use serde_json::Value;
use tracing::info;

use super::{next_id, Deleted, ServiceError};
use crate::common::GuestAttempt;
use crate::store::Datastore;
use crate::validation::validate_guest_attempt;

/// Anonymous usage counter
#[derive(Clone)]
pub struct GuestAttemptService {
    store: Arc<Datastore>,
}

impl GuestAttemptService {
    pub fn new(store: Arc<Datastore>) -> Self {
        Self { store }
    }

    pub async fn list(&self) -> Result<Vec<GuestAttempt>, ServiceError> {
        Ok(self.store.snapshot().await?.guest_attempts)
    }

    /// Record an attempt; `createdAt` defaults to now
    pub async fn create(&self, raw: &Value) -> Result<GuestAttempt, ServiceError> {
        let created_at = validate_guest_attempt(raw)?;
        self.store.transact(|db| {
            let attempt = GuestAttempt {
                id: next_id(db.guest_attempts.iter().map(|g| g.id))?,
                created_at,
            };
            db.guest_attempts.push(attempt.clone());
            Ok::<_, ServiceError>(attempt)
        }).await
    }

    pub async fn clear(&self) -> Result<Deleted, ServiceError> {
        let removed = self.store.transact(|db| {
            let removed = db.guest_attempts.len();
            db.guest_attempts.clear();
            Ok::<_, ServiceError>(removed)
        }).await?;

        info!(removed, "Guest attempts cleared");
        Ok(Deleted::new(removed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_create_list_clear() {
        let dir = tempdir().unwrap();
        let service = GuestAttemptService::new(Arc::new(Datastore::new(dir.path().join("db.json")).unwrap()));

        let first = service.create(&json!({"createdAt": "2024-05-01T10:00:00Z"})).await.unwrap();
        let second = service.create(&json!({})).await.unwrap();
        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(first.created_at, "2024-05-01T10:00:00Z");

        assert_eq!(service.list().await.unwrap().len(), 2);
        assert_eq!(service.clear().await.unwrap().removed, 2);
        assert!(service.list().await.unwrap().is_empty());

        // Ids restart once the collection is empty
        assert_eq!(service.create(&json!({})).await.unwrap().id, 1);
    }

    #[tokio::test]
    async fn test_bad_timestamp() {
        let dir = tempdir().unwrap();
        let service = GuestAttemptService::new(Arc::new(Datastore::new(dir.path().join("db.json")).unwrap()));
        let err = service.create(&json!({"createdAt": "soon"})).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }
}
