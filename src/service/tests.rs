use super::*;
use crate::model::{
    Actuator, Datastream, Document, FeatureOfInterest, Location, Observation, ObservedProperty,
    Sensor, Task, TaskingCapability, Thing, DEFAULT_TASK_STATUS,
};
use crate::store::{MemoryStore, SqliteStore};
use chrono::{TimeZone, Utc};
use serde_json::json;

fn memory_service() -> ResourceService {
    ResourceService::new(Arc::new(MemoryStore::new()))
}

fn services() -> Vec<ResourceService> {
    vec![
        memory_service(),
        ResourceService::new(Arc::new(SqliteStore::open(":memory:").unwrap())),
    ]
}

fn thing(id: i64, name: &str) -> Thing {
    Thing {
        id,
        name: name.to_string(),
        description: None,
    }
}

fn sensor(id: i64) -> Sensor {
    Sensor {
        id,
        name: "DHT22".to_string(),
        description: Some("humidity/temperature".to_string()),
        encoding_type: "application/pdf".to_string(),
        metadata: Some("https://example.org/dht22.pdf".to_string()),
    }
}

fn observed_property(id: i64) -> ObservedProperty {
    ObservedProperty {
        id,
        name: "Air Temperature".to_string(),
        description: None,
        definition: Some("http://dbpedia.org/page/Temperature".to_string()),
    }
}

fn datastream(id: i64, thing_id: i64, sensor_id: i64, observed_property_id: i64) -> Datastream {
    let mut unit = Document::new();
    unit.insert("name".to_string(), json!("degree Celsius"));
    unit.insert("symbol".to_string(), json!("degC"));
    Datastream {
        id,
        name: "air temperature".to_string(),
        description: None,
        observation_type: "OM_Measurement".to_string(),
        unit_of_measurement: unit,
        thing_id,
        sensor_id,
        observed_property_id,
    }
}

fn observation(id: i64, datastream_id: i64) -> Observation {
    Observation {
        id,
        phenomenon_time: Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap(),
        result_time: Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 1).unwrap(),
        result: 19.5,
        datastream_id,
    }
}

fn actuator(id: i64) -> Actuator {
    Actuator {
        id,
        name: "servo".to_string(),
        description: None,
        encoding_type: "text/plain".to_string(),
        metadata: None,
    }
}

fn capability(id: i64, actuator_id: i64) -> TaskingCapability {
    TaskingCapability {
        id,
        name: "rotate".to_string(),
        description: None,
        actuator_id,
    }
}

fn task(id: i64, capability_id: i64) -> Task {
    serde_json::from_value(json!({
        "id": id,
        "taskingCapability_id": capability_id,
        "command": "start",
        "parameters": {}
    }))
    .unwrap()
}

#[test]
fn test_create_then_get_returns_equal_record() {
    for service in services() {
        let created = service.create(thing(1, "T1")).unwrap();
        assert_eq!(created, thing(1, "T1"));
        assert_eq!(service.get::<Thing>(1).unwrap(), created);

        let mut geometry = Document::new();
        geometry.insert("type".to_string(), json!("Point"));
        geometry.insert("coordinates".to_string(), json!([-117.05, 51.05]));
        let location = Location {
            id: 1,
            name: "UofC".to_string(),
            description: None,
            encoding_type: "application/geo+json".to_string(),
            location: geometry.clone(),
        };
        service.create(location.clone()).unwrap();
        assert_eq!(service.get::<Location>(1).unwrap(), location);

        let feature = FeatureOfInterest {
            id: 1,
            name: "campus".to_string(),
            description: Some("main campus".to_string()),
            encoding_type: "application/geo+json".to_string(),
            feature: geometry,
        };
        service.create(feature.clone()).unwrap();
        assert_eq!(service.get::<FeatureOfInterest>(1).unwrap(), feature);
    }
}

#[test]
fn test_duplicate_thing_rejected() {
    for service in services() {
        assert!(service.create(thing(1, "T1")).is_ok());

        let result = service.create(thing(1, "T2"));
        assert_eq!(
            result,
            Err(ServiceError::AlreadyExists {
                kind: EntityKind::Thing,
                id: 1
            })
        );
        assert_eq!(service.get::<Thing>(1).unwrap().name, "T1");
    }
}

#[test]
fn test_datastream_requires_all_references() {
    for service in services() {
        let result = service.create(datastream(1, 99, 1, 1));
        assert_eq!(
            result,
            Err(ServiceError::InvalidReference {
                field: "thing_id",
                kind: EntityKind::Thing,
                id: 99
            })
        );

        service.create(thing(99, "station")).unwrap();
        service.create(sensor(1)).unwrap();
        service.create(observed_property(1)).unwrap();

        let created = service.create(datastream(1, 99, 1, 1)).unwrap();
        assert_eq!(service.get::<Datastream>(1).unwrap(), created);
    }
}

#[test]
fn test_datastream_missing_sensor_reported() {
    let service = memory_service();
    service.create(thing(1, "T1")).unwrap();
    service.create(observed_property(1)).unwrap();

    let result = service.create(datastream(1, 1, 2, 1));
    assert!(matches!(
        result,
        Err(ServiceError::InvalidReference {
            field: "sensor_id",
            ..
        })
    ));
    assert!(service.list::<Datastream>().unwrap().is_empty());
}

#[test]
fn test_observation_without_datastream() {
    for service in services() {
        let result = service.create(observation(1, 5));
        assert!(matches!(
            result,
            Err(ServiceError::InvalidReference {
                field: "datastream_id",
                kind: EntityKind::Datastream,
                id: 5
            })
        ));

        assert_eq!(
            service.get::<Observation>(1),
            Err(ServiceError::NotFound {
                kind: EntityKind::Observation,
                id: 1
            })
        );
    }
}

#[test]
fn test_observation_with_datastream() {
    let service = memory_service();
    service.create(thing(1, "T1")).unwrap();
    service.create(sensor(1)).unwrap();
    service.create(observed_property(1)).unwrap();
    service.create(datastream(5, 1, 1, 1)).unwrap();

    let created = service.create(observation(1, 5)).unwrap();
    assert_eq!(created.result, 19.5);
    assert_eq!(service.list::<Observation>().unwrap(), vec![created]);
}

#[test]
fn test_task_defaults_to_pending() {
    for service in services() {
        assert!(matches!(
            service.create(capability(1, 1)),
            Err(ServiceError::InvalidReference {
                field: "actuator_id",
                ..
            })
        ));

        service.create(actuator(1)).unwrap();
        service.create(capability(1, 1)).unwrap();

        let created = service.create(task(1, 1)).unwrap();
        assert_eq!(created.status, DEFAULT_TASK_STATUS);
        assert_eq!(created.command, "start");

        let fetched = service.get::<Task>(1).unwrap();
        assert_eq!(fetched.status, "pending");
        assert_eq!(fetched.created_at, created.created_at);
    }
}

#[test]
fn test_task_without_capability() {
    let service = memory_service();
    let result = service.create(task(1, 1));
    assert!(matches!(
        result,
        Err(ServiceError::InvalidReference {
            field: "taskingCapability_id",
            kind: EntityKind::TaskingCapability,
            ..
        })
    ));
}

#[test]
fn test_duplicate_checked_before_references() {
    let service = memory_service();
    service.create(actuator(1)).unwrap();
    service.create(capability(1, 1)).unwrap();

    // Same id, dangling actuator: the duplicate wins
    let result = service.create(capability(1, 42));
    assert!(matches!(result, Err(ServiceError::AlreadyExists { .. })));
}

#[test]
fn test_list_after_n_creates() {
    for service in services() {
        for id in 1..=4 {
            service.create(sensor(id)).unwrap();
        }
        let listed = service.list::<Sensor>().unwrap();
        assert_eq!(listed.len(), 4);
        for (n, record) in listed.iter().enumerate() {
            assert_eq!(*record, sensor(n as i64 + 1));
        }
        assert!(service.list::<Actuator>().unwrap().is_empty());
    }
}

#[test]
fn test_get_never_created() {
    let service = memory_service();
    assert_eq!(
        service.get::<ObservedProperty>(3),
        Err(ServiceError::NotFound {
            kind: EntityKind::ObservedProperty,
            id: 3
        })
    );
}

#[test]
fn test_concurrent_creates_single_winner() {
    let service = memory_service();
    let handles: Vec<_> = (0..8)
        .map(|n| {
            let service = service.clone();
            std::thread::spawn(move || service.create(thing(1, &format!("T{}", n))))
        })
        .collect();

    let outcomes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(outcomes
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| matches!(e, ServiceError::AlreadyExists { .. })));
    assert_eq!(service.list::<Thing>().unwrap().len(), 1);
}

#[test]
fn test_error_messages() {
    let err = ServiceError::AlreadyExists {
        kind: EntityKind::Thing,
        id: 1,
    };
    assert_eq!(err.to_string(), "Thing already exists");

    let err = ServiceError::NotFound {
        kind: EntityKind::FeatureOfInterest,
        id: 1,
    };
    assert_eq!(err.to_string(), "FeatureOfInterest not found");
}
