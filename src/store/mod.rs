//! Store Module - Single-file JSON datastore
//!
//! The whole clinic dataset lives in one JSON document. Reads never fail on
//! a missing or unparseable file: the bundled seed document is written in
//! its place. A document that parses but holds records of the wrong shape
//! is reported as `StoreError::Malformed` and never overwritten. Writes
//! replace the whole file.
//!
//! `read_db` / `write_db` are lock-free; callers that interleave them get
//! last-write-wins. `transact` holds the store mutex across one
//! read-modify-write cycle and is what the collection services use.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::fs;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::common::{Database, COLLECTIONS};
use crate::config::StorageConfig;

/// Bundled default dataset
pub const SEED_DOCUMENT: &str = include_str!("seed.json");

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Datastore I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Datastore serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("Invalid seed document: {0}")]
    Seed(String),
    /// Readable JSON whose records do not fit the document shape
    #[error("Datastore document is malformed: {0}")]
    Malformed(String),
}

/// Why the on-disk document could not be loaded
enum LoadFailure {
    /// Missing, unreadable, or not a JSON object: safe to reseed
    Unreadable(String),
    /// Parsed as an object but a collection does not deserialize
    Malformed(String),
}

/// Initialization state. `Seeding` only ends in `Ready` after the seed has
/// been persisted; a failed seeding write drops back to `Uninitialized`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum StoreState {
    Uninitialized,
    Seeding,
    Ready,
}

#[derive(Clone, Debug, Serialize)]
pub struct IntegrityReport {
    pub path: String,
    pub state: StoreState,
    /// Collections that were missing on disk and filled from the seed
    pub backfilled: Vec<String>,
    pub counts: BTreeMap<String, usize>,
}

impl IntegrityReport {
    pub fn is_clean(&self) -> bool {
        self.backfilled.is_empty()
    }
}

pub struct Datastore {
    path: PathBuf,
    seed: Map<String, Value>,
    state: RwLock<StoreState>,
    backfilled: RwLock<Vec<String>>,
    write_lock: Mutex<()>,
}

fn parse_seed(seed_json: &str) -> Result<Map<String, Value>, StoreError> {
    let value: Value = serde_json::from_str(seed_json)
        .map_err(|e| StoreError::Seed(e.to_string()))?;
    let mut seed = match value {
        Value::Object(map) => map,
        _ => return Err(StoreError::Seed("top level must be an object".to_string())),
    };
    for key in COLLECTIONS {
        seed.entry(key.to_string()).or_insert_with(|| Value::Array(vec![]));
    }
    // Reject seeds that would not load as a database
    serde_json::from_value::<Database>(Value::Object(seed.clone()))
        .map_err(|e| StoreError::Seed(e.to_string()))?;
    Ok(seed)
}

impl Datastore {
    /// Datastore at `path` seeded from the bundled document
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        Self::with_seed(path, SEED_DOCUMENT)
    }

    pub fn with_seed(path: impl Into<PathBuf>, seed_json: &str) -> Result<Self, StoreError> {
        Ok(Self {
            path: path.into(),
            seed: parse_seed(seed_json)?,
            state: RwLock::new(StoreState::Uninitialized),
            backfilled: RwLock::new(Vec::new()),
            write_lock: Mutex::new(()),
        })
    }

    pub async fn from_config(config: &StorageConfig) -> Result<Self, StoreError> {
        match &config.seed_path {
            Some(seed_path) => {
                let seed_json = fs::read_to_string(seed_path).await?;
                Self::with_seed(&config.db_path, &seed_json)
            }
            None => Self::new(&config.db_path),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn state(&self) -> StoreState {
        *self.state.read().await
    }

    async fn set_state(&self, next: StoreState) {
        let mut state = self.state.write().await;
        if *state != next {
            debug!(from = ?*state, to = ?next, "Datastore state change");
            *state = next;
        }
    }

    /// Read the document, reseeding when it is missing or not a JSON object.
    ///
    /// A readable document missing some collections is merged over the seed
    /// per top-level key; the backfilled keys are logged and kept for
    /// `integrity_report`.
    pub async fn read_db(&self) -> Result<Database, StoreError> {
        match self.load_from_disk().await {
            Ok((db, backfilled)) => {
                if !backfilled.is_empty() {
                    warn!(
                        path = %self.path.display(),
                        collections = ?backfilled,
                        "Backfilled missing collections from seed"
                    );
                }
                *self.backfilled.write().await = backfilled;
                self.set_state(StoreState::Ready).await;
                Ok(db)
            }
            Err(LoadFailure::Unreadable(reason)) => {
                warn!(path = %self.path.display(), %reason, "Datastore unreadable, seeding from template");
                self.seed_db().await
            }
            // The file holds real data; leave it untouched
            Err(LoadFailure::Malformed(reason)) => {
                error!(path = %self.path.display(), %reason, "Datastore document is malformed");
                Err(StoreError::Malformed(reason))
            }
        }
    }

    async fn load_from_disk(&self) -> Result<(Database, Vec<String>), LoadFailure> {
        let content = fs::read_to_string(&self.path).await
            .map_err(|e| LoadFailure::Unreadable(format!("read failed: {}", e)))?;
        let on_disk = match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => map,
            Ok(_) => return Err(LoadFailure::Unreadable("top level is not an object".to_string())),
            Err(e) => return Err(LoadFailure::Unreadable(format!("parse failed: {}", e))),
        };

        let mut merged = self.seed.clone();
        let backfilled: Vec<String> = self.seed.keys()
            .filter(|key| !on_disk.contains_key(*key))
            .cloned()
            .collect();
        merged.extend(on_disk);

        let db = serde_json::from_value::<Database>(Value::Object(merged))
            .map_err(|e| LoadFailure::Malformed(e.to_string()))?;
        Ok((db, backfilled))
    }

    async fn seed_db(&self) -> Result<Database, StoreError> {
        self.set_state(StoreState::Seeding).await;
        let db: Database = serde_json::from_value(Value::Object(self.seed.clone()))?;

        match self.write_db(&db).await {
            Ok(()) => {
                self.backfilled.write().await.clear();
                self.set_state(StoreState::Ready).await;
                info!(path = %self.path.display(), "Datastore seeded");
                Ok(db)
            }
            Err(e) => {
                self.set_state(StoreState::Uninitialized).await;
                Err(e)
            }
        }
    }

    /// Replace the on-disk document with `db`, pretty-printed.
    ///
    /// Written to a sibling temp file and renamed over the target.
    pub async fn write_db(&self, db: &Database) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(db)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let tmp = self.temp_path();
        let written = match fs::write(&tmp, json.as_bytes()).await {
            Ok(()) => fs::rename(&tmp, &self.path).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        debug!(path = %self.path.display(), bytes = json.len(), "Datastore written");
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let name = self.path.file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "db.json".to_string());
        self.path.with_file_name(format!(".{}.{}.tmp", name, uuid::Uuid::new_v4()))
    }

    /// Run one read-modify-write cycle under the store mutex.
    ///
    /// Nothing is written when `f` returns an error.
    pub async fn transact<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Database) -> Result<T, E>,
        E: From<StoreError>,
    {
        let _guard = self.write_lock.lock().await;
        let mut db = self.read_db().await?;
        let out = f(&mut db)?;
        self.write_db(&db).await?;
        Ok(out)
    }

    /// Consistent read that waits for in-flight transactions
    pub async fn snapshot(&self) -> Result<Database, StoreError> {
        let _guard = self.write_lock.lock().await;
        self.read_db().await
    }

    pub async fn integrity_report(&self) -> Result<IntegrityReport, StoreError> {
        let db = self.snapshot().await?;
        Ok(IntegrityReport {
            path: self.path.display().to_string(),
            state: self.state().await,
            backfilled: self.backfilled.read().await.clone(),
            counts: db.counts()
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::tempdir;
    use crate::common::GuestAttempt;

    #[tokio::test]
    async fn test_missing_file_is_seeded_and_persisted() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("db.json");
        let store = Datastore::new(&path).unwrap();
        assert_eq!(store.state().await, StoreState::Uninitialized);

        let db = store.read_db().await.unwrap();
        assert_eq!(store.state().await, StoreState::Ready);
        assert!(!db.users.is_empty());

        // The seed must have been written to disk
        let on_disk: Database = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk, db);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_reseeded() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = Datastore::new(&path).unwrap();
        let db = store.read_db().await.unwrap();
        assert_eq!(db.patients.len(), 2);

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(serde_json::from_str::<Database>(&content).is_ok());
    }

    #[tokio::test]
    async fn test_partial_document_backfilled() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db.json");
        std::fs::write(&path, r#"{"patients": [], "guestAttempts": [{"id": 3, "createdAt": "2024-01-01T00:00:00Z"}]}"#).unwrap();

        let store = Datastore::new(&path).unwrap();
        let db = store.read_db().await.unwrap();
        assert!(db.patients.is_empty());
        assert_eq!(db.guest_attempts.len(), 1);
        assert_eq!(db.users.len(), 1);

        let report = store.integrity_report().await.unwrap();
        assert!(!report.is_clean());
        assert!(report.backfilled.contains(&"users".to_string()));
        assert!(!report.backfilled.contains(&"patients".to_string()));
        assert_eq!(report.counts["guestAttempts"], 1);
    }

    #[tokio::test]
    async fn test_malformed_record_is_reported_not_reseeded() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db.json");
        let original = r#"{
            "patients": [
                {"id": 10, "fullName": "Real One", "age": 30, "gender": "F", "phone": "9876543210"},
                {"id": 11, "fullName": "Real Two", "age": 31, "gender": "M", "phone": "9876543211"},
                {"id": 12, "fullName": "Real Three", "age": 32, "gender": "F", "phone": "9876543212"}
            ],
            "consultations": [
                {"id": 1, "patientId": 10, "startedAt": "2024-01-01T00:00:00Z", "status": "Cancelled", "summary": ""}
            ]
        }"#;
        std::fs::write(&path, original).unwrap();

        let store = Datastore::new(&path).unwrap();
        let err = store.read_db().await.unwrap_err();
        assert!(matches!(err, StoreError::Malformed(_)));
        assert_ne!(store.state().await, StoreState::Ready);

        // Patients on disk survive
        assert_eq!(std::fs::read_to_string(&path).unwrap(), original);

        // Transactions refuse to write over it
        let result = store.transact(|db| {
            db.patients.clear();
            Ok::<_, StoreError>(())
        }).await;
        assert!(result.is_err());
        assert!(std::fs::read_to_string(&path).unwrap().contains("Real One"));
    }

    #[tokio::test]
    async fn test_null_collection_is_malformed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db.json");
        std::fs::write(&path, r#"{"patients": null, "users": []}"#).unwrap();

        let store = Datastore::new(&path).unwrap();
        assert!(matches!(store.read_db().await, Err(StoreError::Malformed(_))));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), r#"{"patients": null, "users": []}"#);
    }

    #[tokio::test]
    async fn test_failed_write_removes_temp_file() {
        let dir = tempdir().unwrap();
        // A directory at the target path makes the final rename fail
        let path = dir.path().join("db.json");
        std::fs::create_dir(&path).unwrap();

        let store = Datastore::new(&path).unwrap();
        assert!(store.write_db(&Database::default()).await.is_err());

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn test_failed_seed_write_leaves_store_uninitialized() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "file, not a directory").unwrap();

        let store = Datastore::new(blocker.join("db.json")).unwrap();
        assert!(store.read_db().await.is_err());
        assert_eq!(store.state().await, StoreState::Uninitialized);
    }

    #[tokio::test]
    async fn test_interleaved_raw_writes_lose_updates() {
        let dir = tempdir().unwrap();
        let store = Datastore::new(dir.path().join("db.json")).unwrap();

        let mut first = store.read_db().await.unwrap();
        let mut second = store.read_db().await.unwrap();
        first.guest_attempts.push(GuestAttempt { id: 1, created_at: "a".to_string() });
        second.guest_attempts.push(GuestAttempt { id: 1, created_at: "b".to_string() });
        store.write_db(&first).await.unwrap();
        store.write_db(&second).await.unwrap();

        // Last write wins
        let db = store.read_db().await.unwrap();
        assert_eq!(db.guest_attempts.len(), 1);
        assert_eq!(db.guest_attempts[0].created_at, "b");
    }

    #[tokio::test]
    async fn test_concurrent_transactions_keep_every_update() {
        let dir = tempdir().unwrap();
        let store = Arc::new(Datastore::new(dir.path().join("db.json")).unwrap());

        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.transact(|db| {
                    let id = db.guest_attempts.iter().map(|g| g.id).max().unwrap_or(0) + 1;
                    db.guest_attempts.push(GuestAttempt { id, created_at: format!("t{}", i) });
                    Ok::<_, StoreError>(())
                }).await
            }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }

        let db = store.snapshot().await.unwrap();
        assert_eq!(db.guest_attempts.len(), 16);
        let mut ids: Vec<u64> = db.guest_attempts.iter().map(|g| g.id).collect();
        ids.sort();
        assert_eq!(ids, (1..=16).collect::<Vec<u64>>());
    }

    #[test]
    fn test_invalid_seed_rejected() {
        assert!(Datastore::with_seed("db.json", "[]").is_err());
        assert!(Datastore::with_seed("db.json", r#"{"patients": [{"id": "x"}]}"#).is_err());
        assert!(Datastore::with_seed("db.json", r#"{"patients": []}"#).is_ok());
    }
}
