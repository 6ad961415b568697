//! Create / list / get for every entity type.
//!
//! `create` runs three steps, in order:
//!
//! 1. reject an id already present in the target collection (`AlreadyExists`)
//! 2. check foreign keys (`InvalidReference`)
//! 3. insert, which re-checks uniqueness atomically inside the store
//!
//! Step 3 is what guards against two concurrent creates of the same id;
//! step 1 only fixes which error wins when a request is wrong in both ways.

use crate::model::{EntityId, EntityKind, Resource};
use crate::store::{EntityStore, StoreError};
use crate::validation::{validate_references, ValidationError};
use std::fmt;
use std::sync::Arc;
use tracing::{error, info, warn};

#[cfg(test)]
mod tests;

/// Entity operations exposed to the transport layer
#[derive(Clone)]
pub struct ResourceService {
    store: Arc<dyn EntityStore>,
}

impl ResourceService {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    /// Name of the backing store
    pub fn backend(&self) -> &'static str {
        self.store.backend()
    }

    /// Validates and stores a new record, returning it as stored
    pub fn create<T: Resource>(&self, record: T) -> Result<T, ServiceError> {
        let kind = T::KIND;
        let id = record.id();

        if self.store.contains(kind, id)? {
            warn!(entity = %kind, id, "Entity already exists");
            return Err(ServiceError::AlreadyExists { kind, id });
        }

        let record = record.into_record();
        validate_references(self.store.as_ref(), &record)?;

        let stored = self.store.insert(record).map_err(|e| {
            if let StoreError::AlreadyExists { .. } = e {
                warn!(entity = %kind, id, "Entity created concurrently");
            }
            ServiceError::from(e)
        })?;

        info!(entity = %kind, id, "Entity created");
        downcast::<T>(stored)
    }

    /// All records of type `T`
    pub fn list<T: Resource>(&self) -> Result<Vec<T>, ServiceError> {
        self.store
            .list(T::KIND)?
            .into_iter()
            .map(downcast::<T>)
            .collect()
    }

    pub fn get<T: Resource>(&self, id: EntityId) -> Result<T, ServiceError> {
        let record = self.store.get(T::KIND, id)?;
        downcast::<T>(record)
    }
}

fn downcast<T: Resource>(record: crate::model::Record) -> Result<T, ServiceError> {
    let found = record.kind();
    T::from_record(record).ok_or_else(|| {
        ServiceError::Storage(format!(
            "store returned a {} where a {} was expected",
            found,
            T::KIND
        ))
    })
}

/// Resource service errors
#[derive(Debug, PartialEq)]
pub enum ServiceError {
    AlreadyExists {
        kind: EntityKind,
        id: EntityId,
    },
    InvalidReference {
        field: &'static str,
        kind: EntityKind,
        id: EntityId,
    },
    NotFound {
        kind: EntityKind,
        id: EntityId,
    },
    /// Infrastructure failure, message only
    Storage(String),
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::AlreadyExists { kind, .. } => write!(f, "{} already exists", kind),
            ServiceError::InvalidReference { kind, .. } => {
                write!(f, "Referenced {} does not exist", kind)
            }
            ServiceError::NotFound { kind, .. } => write!(f, "{} not found", kind),
            ServiceError::Storage(msg) => write!(f, "storage failure: {}", msg),
        }
    }
}

impl std::error::Error for ServiceError {}

impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::AlreadyExists { kind, id } => ServiceError::AlreadyExists { kind, id },
            StoreError::NotFound { kind, id } => ServiceError::NotFound { kind, id },
            StoreError::Backend(e) => {
                error!(error = %format!("{:#}", e), "Entity store failure");
                ServiceError::Storage(format!("{:#}", e))
            }
        }
    }
}

impl From<ValidationError> for ServiceError {
    fn from(e: ValidationError) -> Self {
        match e {
            ValidationError::InvalidReference { field, kind, id } => {
                ServiceError::InvalidReference { field, kind, id }
            }
            ValidationError::Store(e) => ServiceError::from(e),
        }
    }
}
