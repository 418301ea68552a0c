use std::sync::Arc;
use tracing::info;

use super::{Deleted, ServiceError};
use crate::common::Recording;
use crate::store::Datastore;

#[derive(Clone)]
pub struct RecordingService {
    store: Arc<Datastore>,
}

impl RecordingService {
    pub fn new(store: Arc<Datastore>) -> Self {
        Self { store }
    }

    pub async fn list(&self) -> Result<Vec<Recording>, ServiceError> {
        Ok(self.store.snapshot().await?.recordings)
    }

    pub async fn remove(&self, id: &str) -> Result<Deleted, ServiceError> {
        self.remove_many(&[id.to_string()]).await
    }

    /// Drop every recording whose id is in `ids`; unknown ids are ignored
    pub async fn remove_many(&self, ids: &[String]) -> Result<Deleted, ServiceError> {
        let removed = self.store.transact(|db| {
            let before = db.recordings.len();
            db.recordings.retain(|r| !ids.contains(&r.id));
            Ok::<_, ServiceError>(before - db.recordings.len())
        }).await?;

        info!(?ids, removed, "Recordings removed");
        Ok(Deleted::new(removed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_remove_many() {
        let dir = tempdir().unwrap();
        let service = RecordingService::new(Arc::new(Datastore::new(dir.path().join("db.json")).unwrap()));
        assert_eq!(service.list().await.unwrap().len(), 2);

        let deleted = service
            .remove_many(&["rec-1".to_string(), "missing".to_string()])
            .await
            .unwrap();
        assert!(deleted.success);
        assert_eq!(deleted.removed, 1);

        let left = service.list().await.unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].id, "rec-2");

        assert_eq!(service.remove("rec-1").await.unwrap().removed, 0);
    }
}
