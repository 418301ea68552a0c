use std::sync::Arc;
use serde_json::Value;
use tracing::info;

use super::{next_id, Deleted, ServiceError};
use crate::common::Patient;
use crate::store::Datastore;
use crate::validation::validate_patient;

#[derive(Clone)]
pub struct PatientService {
    store: Arc<Datastore>,
}

impl PatientService {
    pub fn new(store: Arc<Datastore>) -> Self {
        Self { store }
    }

    pub async fn list(&self) -> Result<Vec<Patient>, ServiceError> {
        Ok(self.store.snapshot().await?.patients)
    }

    /// Validate `raw` and append it with a fresh id
    pub async fn create(&self, raw: &Value) -> Result<Patient, ServiceError> {
        let input = validate_patient(raw)?;
        let patient = self.store.transact(|db| {
            let id = next_id(db.patients.iter().map(|p| p.id))?;
            let patient = Patient::from_input(id, input);
            db.patients.push(patient.clone());
            Ok::<_, ServiceError>(patient)
        }).await?;

        info!(patient_id = patient.id, "Patient created");
        Ok(patient)
    }

    /// Full replace of patient `id`
    pub async fn update(&self, id: u64, raw: &Value) -> Result<Patient, ServiceError> {
        let input = validate_patient(raw)?;
        let patient = self.store.transact(|db| {
            let slot = db.patients.iter_mut()
                .find(|p| p.id == id)
                .ok_or(ServiceError::NotFound("Patient"))?;
            *slot = Patient::from_input(id, input);
            Ok::<_, ServiceError>(slot.clone())
        }).await?;

        info!(patient_id = id, "Patient updated");
        Ok(patient)
    }

    pub async fn remove(&self, id: u64) -> Result<Deleted, ServiceError> {
        self.remove_many(&[id]).await
    }

    pub async fn remove_many(&self, ids: &[u64]) -> Result<Deleted, ServiceError> {
        let removed = self.store.transact(|db| {
            let before = db.patients.len();
            db.patients.retain(|p| !ids.contains(&p.id));
            Ok::<_, ServiceError>(before - db.patients.len())
        }).await?;

        info!(?ids, removed, "Patients removed");
        Ok(Deleted::new(removed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn empty_service(dir: &tempfile::TempDir) -> PatientService {
        let store = Datastore::with_seed(dir.path().join("db.json"), "{}").unwrap();
        PatientService::new(Arc::new(store))
    }

    #[tokio::test]
    async fn test_create_into_empty_collection() {
        let dir = tempdir().unwrap();
        let service = empty_service(&dir);

        let patient = service
            .create(&json!({"fullName": "A B", "age": 40, "gender": "F", "phone": "9876543210"}))
            .await
            .unwrap();
        assert_eq!(patient.id, 1);
        assert_eq!(patient.phone, "9876543210");

        let listed = service.list().await.unwrap();
        assert_eq!(listed, vec![patient]);
    }

    #[tokio::test]
    async fn test_create_uses_max_plus_one() {
        let dir = tempdir().unwrap();
        // Seeded patients have ids 1 and 2
        let store = Datastore::new(dir.path().join("db.json")).unwrap();
        let service = PatientService::new(Arc::new(store));

        let before = service.list().await.unwrap();
        let max = before.iter().map(|p| p.id).max().unwrap();

        let created = service
            .create(&json!({"fullName": "Kiran Rao", "age": "29", "gender": "M", "phone": "(080) 2345-6789"}))
            .await
            .unwrap();
        assert_eq!(created.id, max + 1);
        assert_eq!(created.phone, "08023456789");

        let after = service.list().await.unwrap();
        assert_eq!(after.len(), before.len() + 1);
        assert!(after.contains(&created));
    }

    #[tokio::test]
    async fn test_exhausted_ids_fail_without_writing() {
        let dir = tempdir().unwrap();
        let seed = r#"{"patients": [{"id": 18446744073709551615, "fullName": "Last Id", "age": 1, "gender": "F", "phone": "9876543210"}]}"#;
        let store = Datastore::with_seed(dir.path().join("db.json"), seed).unwrap();
        let service = PatientService::new(Arc::new(store));

        let err = service
            .create(&json!({"fullName": "A B", "age": 40, "gender": "F", "phone": "9876543210"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Internal(_)));
        assert_eq!(service.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_payload_is_not_persisted() {
        let dir = tempdir().unwrap();
        let service = empty_service(&dir);

        let err = service
            .create(&json!({"fullName": "A B", "age": 400, "gender": "F", "phone": "9876543210"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(ref e) if e.message.contains("Age")));
        assert!(service.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_replaces_and_keeps_id() {
        let dir = tempdir().unwrap();
        let service = empty_service(&dir);
        let created = service
            .create(&json!({"fullName": "A B", "age": 40, "gender": "F", "phone": "9876543210", "mrn": "M-1"}))
            .await
            .unwrap();

        let updated = service
            .update(created.id, &json!({"fullName": "A B C", "age": 41, "gender": "F", "phone": "9876543210"}))
            .await
            .unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.full_name, "A B C");
        // Full replace: mrn was not resent
        assert_eq!(updated.mrn, None);

        let err = service
            .update(99, &json!({"fullName": "A B", "age": 40, "gender": "F", "phone": "9876543210"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound("Patient")));
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let dir = tempdir().unwrap();
        let service = empty_service(&dir);
        let created = service
            .create(&json!({"fullName": "A B", "age": 40, "gender": "F", "phone": "9876543210"}))
            .await
            .unwrap();

        let first = service.remove(created.id).await.unwrap();
        let second = service.remove(created.id).await.unwrap();
        assert!(first.success && second.success);
        assert_eq!(first.removed, 1);
        assert_eq!(second.removed, 0);
        assert!(service.list().await.unwrap().iter().all(|p| p.id != created.id));
    }
}
