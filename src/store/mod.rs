//! Entity persistence.
//!
//! `EntityStore` owns every record. Two interchangeable backends implement it:
//!
//! - [`MemoryStore`]: DashMap collections, used in tests and ephemeral deployments
//! - [`SqliteStore`]: one SQLite table per entity kind
//!
//! Both make the existence check and the write of `insert` a single atomic
//! step, so two concurrent creates with the same id cannot both succeed.
//! Records are never updated or deleted.

use crate::config::{StorageBackend, StorageConfig};
use crate::model::{EntityId, EntityKind, Record};
use anyhow::Result;
use std::fmt;
use std::sync::Arc;
use tracing::info;

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Storage operations shared by all backends
pub trait EntityStore: Send + Sync {
    /// Persists a record. Fails with `AlreadyExists` if its id is taken in its collection.
    fn insert(&self, record: Record) -> Result<Record, StoreError>;

    /// Looks a record up by collection and id
    fn get(&self, kind: EntityKind, id: EntityId) -> Result<Record, StoreError>;

    /// All records of one collection
    fn list(&self, kind: EntityKind) -> Result<Vec<Record>, StoreError>;

    fn contains(&self, kind: EntityKind, id: EntityId) -> Result<bool, StoreError>;

    /// Short backend name for logs and health checks
    fn backend(&self) -> &'static str;
}

/// Store errors
#[derive(Debug)]
pub enum StoreError {
    AlreadyExists { kind: EntityKind, id: EntityId },
    NotFound { kind: EntityKind, id: EntityId },
    /// Infrastructure failure (I/O, corrupt row, poisoned lock)
    Backend(anyhow::Error),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::AlreadyExists { kind, id } => {
                write!(f, "{} {} already exists", kind, id)
            }
            StoreError::NotFound { kind, id } => write!(f, "{} {} not found", kind, id),
            StoreError::Backend(e) => write!(f, "storage failure: {:#}", e),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<anyhow::Error> for StoreError {
    fn from(e: anyhow::Error) -> Self {
        StoreError::Backend(e)
    }
}

/// Opens the backend selected by configuration
pub fn open(config: &StorageConfig) -> Result<Arc<dyn EntityStore>> {
    let store: Arc<dyn EntityStore> = match config.backend {
        StorageBackend::Memory => Arc::new(MemoryStore::new()),
        StorageBackend::Sqlite => Arc::new(SqliteStore::open(&config.sqlite_path)?),
    };
    info!(backend = store.backend(), "Entity store opened");
    Ok(store)
}
