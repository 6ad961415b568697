//! SQLite-backed entity storage.
//!
//! One table per entity kind, `id` as primary key and foreign key columns
//! declared with `REFERENCES`. Structured payloads are stored as JSON text and
//! timestamps as RFC 3339 text.

use super::{EntityStore, StoreError};
use crate::model::{
    Actuator, Datastream, Document, EntityId, EntityKind, FeatureOfInterest, Location,
    Observation, ObservedProperty, Record, Sensor, Task, TaskingCapability, Thing,
};
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const SCHEMA: &str = "
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS things (
        id          INTEGER PRIMARY KEY,
        name        TEXT NOT NULL,
        description TEXT
    );

    CREATE TABLE IF NOT EXISTS locations (
        id            INTEGER PRIMARY KEY,
        name          TEXT NOT NULL,
        description   TEXT,
        encoding_type TEXT NOT NULL,
        location      TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS sensors (
        id            INTEGER PRIMARY KEY,
        name          TEXT NOT NULL,
        description   TEXT,
        encoding_type TEXT NOT NULL,
        metadata      TEXT
    );

    CREATE TABLE IF NOT EXISTS observed_properties (
        id          INTEGER PRIMARY KEY,
        name        TEXT NOT NULL,
        description TEXT,
        definition  TEXT
    );

    CREATE TABLE IF NOT EXISTS datastreams (
        id                   INTEGER PRIMARY KEY,
        name                 TEXT NOT NULL,
        description          TEXT,
        observation_type     TEXT NOT NULL,
        unit_of_measurement  TEXT NOT NULL,
        thing_id             INTEGER NOT NULL REFERENCES things(id),
        sensor_id            INTEGER NOT NULL REFERENCES sensors(id),
        observed_property_id INTEGER NOT NULL REFERENCES observed_properties(id)
    );

    CREATE TABLE IF NOT EXISTS observations (
        id              INTEGER PRIMARY KEY,
        phenomenon_time TEXT NOT NULL,
        result_time     TEXT NOT NULL,
        result          REAL NOT NULL,
        datastream_id   INTEGER NOT NULL REFERENCES datastreams(id)
    );

    CREATE TABLE IF NOT EXISTS features_of_interest (
        id            INTEGER PRIMARY KEY,
        name          TEXT NOT NULL,
        description   TEXT,
        encoding_type TEXT NOT NULL,
        feature       TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS actuators (
        id            INTEGER PRIMARY KEY,
        name          TEXT NOT NULL,
        description   TEXT,
        encoding_type TEXT NOT NULL,
        metadata      TEXT
    );

    CREATE TABLE IF NOT EXISTS tasking_capabilities (
        id          INTEGER PRIMARY KEY,
        name        TEXT NOT NULL,
        description TEXT,
        actuator_id INTEGER NOT NULL REFERENCES actuators(id)
    );

    CREATE TABLE IF NOT EXISTS tasks (
        id                    INTEGER PRIMARY KEY,
        tasking_capability_id INTEGER NOT NULL REFERENCES tasking_capabilities(id),
        command               TEXT NOT NULL,
        parameters            TEXT NOT NULL,
        status                TEXT NOT NULL DEFAULT 'pending',
        created_at            TEXT NOT NULL
    );
";

/// Entity store persisted in a SQLite database.
///
/// # Thread Safety
/// The connection sits behind a Mutex. `insert` holds the lock across the
/// existence check and the INSERT, which makes create atomic per store.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens (or creates) the database and ensures every table exists.
    ///
    /// `":memory:"` gives a private in-memory database.
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref();
        let conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open entity DB at {}", db_path.display()))?;
        conn.execute_batch(SCHEMA)
            .context("Failed to create entity tables")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Backend(anyhow!("entity DB connection lock poisoned")))
    }
}

impl EntityStore for SqliteStore {
    fn insert(&self, record: Record) -> Result<Record, StoreError> {
        let kind = record.kind();
        let id = record.id();

        let conn = self.lock()?;
        if row_exists(&conn, kind, id)? {
            return Err(StoreError::AlreadyExists { kind, id });
        }
        insert_row(&conn, &record)
            .with_context(|| format!("Failed to insert {} {}", kind, id))?;
        Ok(record)
    }

    fn get(&self, kind: EntityKind, id: EntityId) -> Result<Record, StoreError> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {} FROM {} WHERE id = ?1",
            columns(kind),
            kind.table()
        );
        let mut stmt = conn
            .prepare(&sql)
            .context("Failed to prepare get query")?;
        let mut rows = stmt
            .query(params![id])
            .context("Failed to execute get query")?;

        let record = match rows.next().context("Failed to read row")? {
            Some(row) => read_record(kind, row)?,
            None => return Err(StoreError::NotFound { kind, id }),
        };
        Ok(record)
    }

    fn list(&self, kind: EntityKind) -> Result<Vec<Record>, StoreError> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {} FROM {} ORDER BY id ASC",
            columns(kind),
            kind.table()
        );
        let mut stmt = conn
            .prepare(&sql)
            .context("Failed to prepare list query")?;
        let mut rows = stmt.query([]).context("Failed to execute list query")?;

        let mut records = Vec::new();
        while let Some(row) = rows.next().context("Failed to read row")? {
            records.push(read_record(kind, row)?);
        }
        Ok(records)
    }

    fn contains(&self, kind: EntityKind, id: EntityId) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        Ok(row_exists(&conn, kind, id)?)
    }

    fn backend(&self) -> &'static str {
        "sqlite"
    }
}

fn row_exists(conn: &Connection, kind: EntityKind, id: EntityId) -> Result<bool> {
    let sql = format!("SELECT 1 FROM {} WHERE id = ?1", kind.table());
    let found = conn
        .query_row(&sql, params![id], |_| Ok(()))
        .optional()
        .with_context(|| format!("Failed to look up {} {}", kind, id))?;
    Ok(found.is_some())
}

fn columns(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Thing => "id, name, description",
        EntityKind::Location => "id, name, description, encoding_type, location",
        EntityKind::Sensor | EntityKind::Actuator => {
            "id, name, description, encoding_type, metadata"
        }
        EntityKind::ObservedProperty => "id, name, description, definition",
        EntityKind::Datastream => {
            "id, name, description, observation_type, unit_of_measurement, \
             thing_id, sensor_id, observed_property_id"
        }
        EntityKind::Observation => {
            "id, phenomenon_time, result_time, result, datastream_id"
        }
        EntityKind::FeatureOfInterest => "id, name, description, encoding_type, feature",
        EntityKind::TaskingCapability => "id, name, description, actuator_id",
        EntityKind::Task => {
            "id, tasking_capability_id, command, parameters, status, created_at"
        }
    }
}

fn insert_row(conn: &Connection, record: &Record) -> Result<()> {
    match record {
        Record::Thing(r) => conn.execute(
            "INSERT INTO things (id, name, description) VALUES (?1, ?2, ?3)",
            params![r.id, r.name, r.description],
        ),
        Record::Location(r) => conn.execute(
            "INSERT INTO locations (id, name, description, encoding_type, location)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                r.id,
                r.name,
                r.description,
                r.encoding_type,
                document_to_text(&r.location)?
            ],
        ),
        Record::Sensor(r) => conn.execute(
            "INSERT INTO sensors (id, name, description, encoding_type, metadata)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![r.id, r.name, r.description, r.encoding_type, r.metadata],
        ),
        Record::ObservedProperty(r) => conn.execute(
            "INSERT INTO observed_properties (id, name, description, definition)
             VALUES (?1, ?2, ?3, ?4)",
            params![r.id, r.name, r.description, r.definition],
        ),
        Record::Datastream(r) => conn.execute(
            "INSERT INTO datastreams (
                id, name, description, observation_type, unit_of_measurement,
                thing_id, sensor_id, observed_property_id
             )
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                r.id,
                r.name,
                r.description,
                r.observation_type,
                document_to_text(&r.unit_of_measurement)?,
                r.thing_id,
                r.sensor_id,
                r.observed_property_id,
            ],
        ),
        Record::Observation(r) => conn.execute(
            "INSERT INTO observations (id, phenomenon_time, result_time, result, datastream_id)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                r.id,
                r.phenomenon_time.to_rfc3339(),
                r.result_time.to_rfc3339(),
                r.result,
                r.datastream_id,
            ],
        ),
        Record::FeatureOfInterest(r) => conn.execute(
            "INSERT INTO features_of_interest (id, name, description, encoding_type, feature)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                r.id,
                r.name,
                r.description,
                r.encoding_type,
                document_to_text(&r.feature)?
            ],
        ),
        Record::Actuator(r) => conn.execute(
            "INSERT INTO actuators (id, name, description, encoding_type, metadata)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![r.id, r.name, r.description, r.encoding_type, r.metadata],
        ),
        Record::TaskingCapability(r) => conn.execute(
            "INSERT INTO tasking_capabilities (id, name, description, actuator_id)
             VALUES (?1, ?2, ?3, ?4)",
            params![r.id, r.name, r.description, r.actuator_id],
        ),
        Record::Task(r) => conn.execute(
            "INSERT INTO tasks (
                id, tasking_capability_id, command, parameters, status, created_at
             )
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                r.id,
                r.tasking_capability_id,
                r.command,
                document_to_text(&r.parameters)?,
                r.status,
                r.created_at.to_rfc3339(),
            ],
        ),
    }?;
    Ok(())
}

/// Decodes a row selected with `columns(kind)`
fn read_record(kind: EntityKind, row: &Row<'_>) -> Result<Record> {
    let record = match kind {
        EntityKind::Thing => Record::Thing(Thing {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
        }),
        EntityKind::Location => Record::Location(Location {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            encoding_type: row.get(3)?,
            location: document_from_text(row.get(4)?, "location")?,
        }),
        EntityKind::Sensor => Record::Sensor(Sensor {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            encoding_type: row.get(3)?,
            metadata: row.get(4)?,
        }),
        EntityKind::ObservedProperty => Record::ObservedProperty(ObservedProperty {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            definition: row.get(3)?,
        }),
        EntityKind::Datastream => Record::Datastream(Datastream {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            observation_type: row.get(3)?,
            unit_of_measurement: document_from_text(row.get(4)?, "unit_of_measurement")?,
            thing_id: row.get(5)?,
            sensor_id: row.get(6)?,
            observed_property_id: row.get(7)?,
        }),
        EntityKind::Observation => Record::Observation(Observation {
            id: row.get(0)?,
            phenomenon_time: timestamp_from_text(row.get(1)?, "phenomenon_time")?,
            result_time: timestamp_from_text(row.get(2)?, "result_time")?,
            result: row.get(3)?,
            datastream_id: row.get(4)?,
        }),
        EntityKind::FeatureOfInterest => Record::FeatureOfInterest(FeatureOfInterest {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            encoding_type: row.get(3)?,
            feature: document_from_text(row.get(4)?, "feature")?,
        }),
        EntityKind::Actuator => Record::Actuator(Actuator {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            encoding_type: row.get(3)?,
            metadata: row.get(4)?,
        }),
        EntityKind::TaskingCapability => Record::TaskingCapability(TaskingCapability {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            actuator_id: row.get(3)?,
        }),
        EntityKind::Task => Record::Task(Task {
            id: row.get(0)?,
            tasking_capability_id: row.get(1)?,
            command: row.get(2)?,
            parameters: document_from_text(row.get(3)?, "parameters")?,
            status: row.get(4)?,
            created_at: timestamp_from_text(row.get(5)?, "created_at")?,
        }),
    };
    Ok(record)
}

fn document_to_text(doc: &Document) -> Result<String> {
    serde_json::to_string(doc).context("Failed to serialize structured payload")
}

fn document_from_text(text: String, column: &str) -> Result<Document> {
    serde_json::from_str(&text).with_context(|| format!("Corrupt JSON in column {}", column))
}

fn timestamp_from_text(text: String, column: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&text)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("Corrupt timestamp in column {}", column))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Resource;
    use chrono::TimeZone;
    use serde_json::json;

    fn thing(id: EntityId) -> Record {
        Thing {
            id,
            name: format!("thing-{}", id),
            description: Some("weather station".to_string()),
        }
        .into_record()
    }

    fn actuator(id: EntityId) -> Record {
        Actuator {
            id,
            name: "valve".to_string(),
            description: None,
            encoding_type: "application/pdf".to_string(),
            metadata: Some("https://example.org/valve.pdf".to_string()),
        }
        .into_record()
    }

    #[test]
    fn test_data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("entities.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            store.insert(thing(1)).unwrap();
            store.insert(thing(2)).unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.list(EntityKind::Thing).unwrap().len(), 2);
        assert_eq!(store.get(EntityKind::Thing, 2).unwrap(), thing(2));
        // Reopening must not reset uniqueness
        assert!(matches!(
            store.insert(thing(1)),
            Err(StoreError::AlreadyExists { .. })
        ));
    }

    #[test]
    fn test_foreign_keys_enforced_by_schema() {
        let store = SqliteStore::open(":memory:").unwrap();
        let cap = TaskingCapability {
            id: 1,
            name: "open".to_string(),
            description: None,
            actuator_id: 99,
        };
        let result = store.insert(cap.into_record());
        assert!(matches!(result, Err(StoreError::Backend(_))));
        assert!(!store.contains(EntityKind::TaskingCapability, 1).unwrap());
    }

    #[test]
    fn test_task_round_trip_with_parents() {
        let store = SqliteStore::open(":memory:").unwrap();
        store.insert(actuator(1)).unwrap();
        store
            .insert(
                TaskingCapability {
                    id: 1,
                    name: "open".to_string(),
                    description: None,
                    actuator_id: 1,
                }
                .into_record(),
            )
            .unwrap();

        let mut parameters = Document::new();
        parameters.insert("position".to_string(), json!({"percent": 40}));
        let task = Task {
            id: 5,
            tasking_capability_id: 1,
            command: "open".to_string(),
            parameters,
            status: "pending".to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 6, 2, 10, 0, 0).unwrap(),
        };

        store.insert(task.clone().into_record()).unwrap();
        let fetched = Task::from_record(store.get(EntityKind::Task, 5).unwrap()).unwrap();
        assert_eq!(fetched, task);
        assert_eq!(fetched.parameters["position"]["percent"], 40);
    }

    #[test]
    fn test_optional_columns_round_trip() {
        let store = SqliteStore::open(":memory:").unwrap();
        store.insert(actuator(3)).unwrap();
        let fetched = Actuator::from_record(store.get(EntityKind::Actuator, 3).unwrap()).unwrap();
        assert_eq!(fetched.description, None);
        assert_eq!(
            fetched.metadata.as_deref(),
            Some("https://example.org/valve.pdf")
        );
    }

    #[test]
    fn test_payload_floats_and_key_order_round_trip() {
        let store = SqliteStore::open(":memory:").unwrap();
        let location: Document = serde_json::from_value(json!({
            "type": "Point",
            "coordinates": [1.0715660391465826e-75, -114.0708459, 0.1 + 0.2]
        }))
        .unwrap();
        let record = Location {
            id: 1,
            name: "roof".to_string(),
            description: None,
            encoding_type: "application/geo+json".to_string(),
            location: location.clone(),
        }
        .into_record();

        store.insert(record.clone()).unwrap();
        let fetched = store.get(EntityKind::Location, 1).unwrap();
        assert_eq!(fetched, record);

        let fetched = Location::from_record(fetched).unwrap();
        assert_eq!(
            fetched.location["coordinates"][0].as_f64(),
            Some(1.0715660391465826e-75)
        );
        let keys: Vec<&str> = fetched.location.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["type", "coordinates"]);
    }
}
