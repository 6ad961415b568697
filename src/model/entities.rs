use super::{Document, EntityId};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Status every Task starts in. Nothing in this service transitions it.
pub const DEFAULT_TASK_STATUS: &str = "pending";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Thing {
    pub id: EntityId,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: EntityId,
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "encodingType")]
    pub encoding_type: String,
    /// Encoded location (e.g. a GeoJSON geometry)
    pub location: Document,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sensor {
    pub id: EntityId,
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "encodingType")]
    pub encoding_type: String,
    #[serde(alias = "metadata_")]
    pub metadata: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObservedProperty {
    pub id: EntityId,
    pub name: String,
    pub description: Option<String>,
    pub definition: Option<String>,
}

/// Groups observations of one ObservedProperty, produced by one Sensor on one Thing
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Datastream {
    pub id: EntityId,
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "observationType")]
    pub observation_type: String,
    #[serde(rename = "unitOfMeasurement")]
    pub unit_of_measurement: Document,
    pub thing_id: EntityId,
    pub sensor_id: EntityId,
    pub observed_property_id: EntityId,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub id: EntityId,
    #[serde(rename = "phenomenonTime", deserialize_with = "timestamp")]
    pub phenomenon_time: DateTime<Utc>,
    #[serde(rename = "resultTime", deserialize_with = "timestamp")]
    pub result_time: DateTime<Utc>,
    pub result: f64,
    pub datastream_id: EntityId,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeatureOfInterest {
    pub id: EntityId,
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "encodingType")]
    pub encoding_type: String,
    pub feature: Document,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Actuator {
    pub id: EntityId,
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "encodingType")]
    pub encoding_type: String,
    #[serde(alias = "metadata_")]
    pub metadata: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskingCapability {
    pub id: EntityId,
    pub name: String,
    pub description: Option<String>,
    pub actuator_id: EntityId,
}

/// A command addressed to a TaskingCapability
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: EntityId,
    #[serde(rename = "taskingCapability_id")]
    pub tasking_capability_id: EntityId,
    pub command: String,
    pub parameters: Document,
    /// Defaults to "pending" when missing or null
    #[serde(default = "default_status", deserialize_with = "status_or_default")]
    pub status: String,
    /// Defaults to the moment the record is decoded
    #[serde(rename = "createdAt", default = "Utc::now", deserialize_with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

fn default_status() -> String {
    DEFAULT_TASK_STATUS.to_string()
}

fn status_or_default<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_else(default_status))
}

/// Offset-less layouts accepted alongside RFC 3339; read as UTC
const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parses RFC 3339, or an offset-less timestamp taken as UTC
fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .map(|naive| naive.and_utc())
}

fn timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let text = String::deserialize(deserializer)?;
    parse_timestamp(&text).ok_or_else(|| {
        serde::de::Error::custom(format!(
            "invalid timestamp '{}': expected RFC 3339 or YYYY-MM-DDTHH:MM:SS",
            text
        ))
    })
}
