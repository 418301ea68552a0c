use std::sync::Arc;

use super::ServiceError;
use crate::common::{ClinicalInsight, Consultation};
use crate::store::Datastore;

#[derive(Clone)]
pub struct ConsultationService {
    store: Arc<Datastore>,
}

impl ConsultationService {
    pub fn new(store: Arc<Datastore>) -> Self {
        Self { store }
    }

    pub async fn list(&self) -> Result<Vec<Consultation>, ServiceError> {
        Ok(self.store.snapshot().await?.consultations)
    }

    pub async fn list_for_patient(&self, patient_id: u64) -> Result<Vec<Consultation>, ServiceError> {
        let mut consultations = self.list().await?;
        consultations.retain(|c| c.patient_id == patient_id);
        Ok(consultations)
    }
}

#[derive(Clone)]
pub struct InsightService {
    store: Arc<Datastore>,
}

impl InsightService {
    pub fn new(store: Arc<Datastore>) -> Self {
        Self { store }
    }

    pub async fn list(&self) -> Result<Vec<ClinicalInsight>, ServiceError> {
        Ok(self.store.snapshot().await?.clinical_insights)
    }
}
