use serde::{de::DeserializeOwned, Serialize};
use std::fmt;

mod entities;

pub use entities::{
    Actuator, Datastream, FeatureOfInterest, Location, Observation, ObservedProperty, Sensor,
    Task, TaskingCapability, Thing, DEFAULT_TASK_STATUS,
};

/// Caller-assigned numeric identifier, unique within one collection
pub type EntityId = i64;

/// Structured payload (location, feature, unitOfMeasurement, parameters).
///
/// Stored and returned opaquely; the only requirement is that it is a JSON object.
pub type Document = serde_json::Map<String, serde_json::Value>;

/// The entity collections known to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Thing,
    Location,
    Sensor,
    ObservedProperty,
    Datastream,
    Observation,
    FeatureOfInterest,
    Actuator,
    TaskingCapability,
    Task,
}

impl EntityKind {
    pub const ALL: [EntityKind; 10] = [
        EntityKind::Thing,
        EntityKind::Location,
        EntityKind::Sensor,
        EntityKind::ObservedProperty,
        EntityKind::Datastream,
        EntityKind::Observation,
        EntityKind::FeatureOfInterest,
        EntityKind::Actuator,
        EntityKind::TaskingCapability,
        EntityKind::Task,
    ];

    /// Singular entity name used in messages ("Thing", "ObservedProperty")
    pub fn name(self) -> &'static str {
        match self {
            EntityKind::Thing => "Thing",
            EntityKind::Location => "Location",
            EntityKind::Sensor => "Sensor",
            EntityKind::ObservedProperty => "ObservedProperty",
            EntityKind::Datastream => "Datastream",
            EntityKind::Observation => "Observation",
            EntityKind::FeatureOfInterest => "FeatureOfInterest",
            EntityKind::Actuator => "Actuator",
            EntityKind::TaskingCapability => "TaskingCapability",
            EntityKind::Task => "Task",
        }
    }

    /// Collection segment of the HTTP path ("Things", "FeaturesOfInterest")
    pub fn collection(self) -> &'static str {
        match self {
            EntityKind::Thing => "Things",
            EntityKind::Location => "Locations",
            EntityKind::Sensor => "Sensors",
            EntityKind::ObservedProperty => "ObservedProperties",
            EntityKind::Datastream => "Datastreams",
            EntityKind::Observation => "Observations",
            EntityKind::FeatureOfInterest => "FeaturesOfInterest",
            EntityKind::Actuator => "Actuators",
            EntityKind::TaskingCapability => "TaskingCapabilities",
            EntityKind::Task => "Tasks",
        }
    }

    /// SQLite table backing the collection
    pub fn table(self) -> &'static str {
        match self {
            EntityKind::Thing => "things",
            EntityKind::Location => "locations",
            EntityKind::Sensor => "sensors",
            EntityKind::ObservedProperty => "observed_properties",
            EntityKind::Datastream => "datastreams",
            EntityKind::Observation => "observations",
            EntityKind::FeatureOfInterest => "features_of_interest",
            EntityKind::Actuator => "actuators",
            EntityKind::TaskingCapability => "tasking_capabilities",
            EntityKind::Task => "tasks",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A foreign key held by a record: which field, which collection, which id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reference {
    pub field: &'static str,
    pub kind: EntityKind,
    pub id: EntityId,
}

/// Any stored record. The store works in terms of this closed set so that
/// `EntityStore` stays object-safe while every collection remains typed.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Thing(Thing),
    Location(Location),
    Sensor(Sensor),
    ObservedProperty(ObservedProperty),
    Datastream(Datastream),
    Observation(Observation),
    FeatureOfInterest(FeatureOfInterest),
    Actuator(Actuator),
    TaskingCapability(TaskingCapability),
    Task(Task),
}

impl Record {
    pub fn kind(&self) -> EntityKind {
        match self {
            Record::Thing(_) => EntityKind::Thing,
            Record::Location(_) => EntityKind::Location,
            Record::Sensor(_) => EntityKind::Sensor,
            Record::ObservedProperty(_) => EntityKind::ObservedProperty,
            Record::Datastream(_) => EntityKind::Datastream,
            Record::Observation(_) => EntityKind::Observation,
            Record::FeatureOfInterest(_) => EntityKind::FeatureOfInterest,
            Record::Actuator(_) => EntityKind::Actuator,
            Record::TaskingCapability(_) => EntityKind::TaskingCapability,
            Record::Task(_) => EntityKind::Task,
        }
    }

    pub fn id(&self) -> EntityId {
        match self {
            Record::Thing(r) => r.id,
            Record::Location(r) => r.id,
            Record::Sensor(r) => r.id,
            Record::ObservedProperty(r) => r.id,
            Record::Datastream(r) => r.id,
            Record::Observation(r) => r.id,
            Record::FeatureOfInterest(r) => r.id,
            Record::Actuator(r) => r.id,
            Record::TaskingCapability(r) => r.id,
            Record::Task(r) => r.id,
        }
    }

    /// Foreign keys in the order they must be checked
    pub fn references(&self) -> Vec<Reference> {
        match self {
            Record::Datastream(ds) => vec![
                Reference {
                    field: "thing_id",
                    kind: EntityKind::Thing,
                    id: ds.thing_id,
                },
                Reference {
                    field: "sensor_id",
                    kind: EntityKind::Sensor,
                    id: ds.sensor_id,
                },
                Reference {
                    field: "observed_property_id",
                    kind: EntityKind::ObservedProperty,
                    id: ds.observed_property_id,
                },
            ],
            Record::Observation(obs) => vec![Reference {
                field: "datastream_id",
                kind: EntityKind::Datastream,
                id: obs.datastream_id,
            }],
            Record::TaskingCapability(cap) => vec![Reference {
                field: "actuator_id",
                kind: EntityKind::Actuator,
                id: cap.actuator_id,
            }],
            Record::Task(task) => vec![Reference {
                field: "taskingCapability_id",
                kind: EntityKind::TaskingCapability,
                id: task.tasking_capability_id,
            }],
            _ => Vec::new(),
        }
    }
}

/// A typed entity that can pass through the store as a `Record`
pub trait Resource:
    Clone + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    const KIND: EntityKind;

    fn id(&self) -> EntityId;

    fn into_record(self) -> Record;

    /// Returns `None` when the record belongs to another collection
    fn from_record(record: Record) -> Option<Self>;
}

macro_rules! impl_resource {
    ($($ty:ident),* $(,)?) => {
        $(
            impl Resource for $ty {
                const KIND: EntityKind = EntityKind::$ty;

                fn id(&self) -> EntityId {
                    self.id
                }

                fn into_record(self) -> Record {
                    Record::$ty(self)
                }

                fn from_record(record: Record) -> Option<Self> {
                    match record {
                        Record::$ty(inner) => Some(inner),
                        _ => None,
                    }
                }
            }
        )*
    };
}

impl_resource!(
    Thing,
    Location,
    Sensor,
    ObservedProperty,
    Datastream,
    Observation,
    FeatureOfInterest,
    Actuator,
    TaskingCapability,
    Task,
);
