//! Collections - CRUD services over the datastore's named collections
//!
//! Each operation is one `Datastore::transact` (or `snapshot`) call: read
//! the full document, change one collection, write the full document.
//! Integer ids are assigned as `max(existing) + 1`.

pub mod patients;
pub mod recordings;
pub mod guest_attempts;
pub mod users;
pub mod consultations;

pub use patients::PatientService;
pub use recordings::RecordingService;
pub use guest_attempts::GuestAttemptService;
pub use users::UserService;
pub use consultations::{ConsultationService, InsightService};

use serde::Serialize;

use crate::store::StoreError;
use crate::validation::ValidationError;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Validation(ValidationError),
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("{0}")]
    Internal(String),
}

impl From<ValidationError> for ServiceError {
    fn from(e: ValidationError) -> Self {
        ServiceError::Validation(e)
    }
}

/// Acknowledgement for deletes. Removing an absent id still succeeds.
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
pub struct Deleted {
    pub success: bool,
    #[serde(skip)]
    pub removed: usize,
}

impl Deleted {
    fn new(removed: usize) -> Self {
        Self { success: true, removed }
    }
}

/// Next sequential id: one past the current maximum, or 1 when empty
pub fn next_id<I: IntoIterator<Item = u64>>(ids: I) -> Result<u64, ServiceError> {
    ids.into_iter()
        .max()
        .unwrap_or(0)
        .checked_add(1)
        .ok_or_else(|| ServiceError::Internal("Id space exhausted".to_string()))
}
