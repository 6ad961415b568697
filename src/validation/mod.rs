use crate::model::{EntityId, EntityKind, Record};
use crate::store::{EntityStore, StoreError};
use std::fmt;
use tracing::warn;

/// Reference validation errors
#[derive(Debug)]
pub enum ValidationError {
    /// A foreign key does not resolve to an existing record
    InvalidReference {
        field: &'static str,
        kind: EntityKind,
        id: EntityId,
    },
    /// The lookup itself failed
    Store(StoreError),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::InvalidReference { kind, .. } => {
                write!(f, "Referenced {} does not exist", kind)
            }
            ValidationError::Store(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Checks that every foreign key of `record` resolves.
///
/// Rules:
/// - Datastream: Thing, Sensor, ObservedProperty, in that order
/// - Observation: Datastream
/// - TaskingCapability: Actuator
/// - Task: TaskingCapability
///
/// The first missing reference is reported. Nothing is ever created implicitly.
pub fn validate_references(
    store: &dyn EntityStore,
    record: &Record,
) -> Result<(), ValidationError> {
    for reference in record.references() {
        let exists = store
            .contains(reference.kind, reference.id)
            .map_err(ValidationError::Store)?;
        if !exists {
            warn!(
                entity = %record.kind(),
                id = record.id(),
                field = reference.field,
                missing = reference.id,
                "Dangling reference"
            );
            return Err(ValidationError::InvalidReference {
                field: reference.field,
                kind: reference.kind,
                id: reference.id,
            });
        }
    }
    Ok(())
}
