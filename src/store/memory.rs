use super::{EntityStore, StoreError};
use crate::model::{EntityId, EntityKind, Record};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Stored record plus its insertion sequence number
struct Slot {
    seq: u64,
    record: Record,
}

/// In-memory store: one concurrent map per entity kind
pub struct MemoryStore {
    /// Indexed by `EntityKind` discriminant
    collections: [DashMap<EntityId, Slot>; EntityKind::ALL.len()],
    /// Global insertion counter so `list` can return insertion order
    sequence: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            collections: std::array::from_fn(|_| DashMap::new()),
            sequence: AtomicU64::new(0),
        }
    }

    fn collection(&self, kind: EntityKind) -> &DashMap<EntityId, Slot> {
        &self.collections[kind as usize]
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityStore for MemoryStore {
    fn insert(&self, record: Record) -> Result<Record, StoreError> {
        let kind = record.kind();
        let id = record.id();

        // The entry guard holds the shard lock across check and write
        match self.collection(kind).entry(id) {
            Entry::Occupied(_) => Err(StoreError::AlreadyExists { kind, id }),
            Entry::Vacant(slot) => {
                let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
                slot.insert(Slot {
                    seq,
                    record: record.clone(),
                });
                Ok(record)
            }
        }
    }

    fn get(&self, kind: EntityKind, id: EntityId) -> Result<Record, StoreError> {
        self.collection(kind)
            .get(&id)
            .map(|slot| slot.record.clone())
            .ok_or(StoreError::NotFound { kind, id })
    }

    fn list(&self, kind: EntityKind) -> Result<Vec<Record>, StoreError> {
        let mut slots: Vec<(u64, Record)> = self
            .collection(kind)
            .iter()
            .map(|entry| (entry.seq, entry.record.clone()))
            .collect();
        slots.sort_by_key(|(seq, _)| *seq);
        Ok(slots.into_iter().map(|(_, record)| record).collect())
    }

    fn contains(&self, kind: EntityKind, id: EntityId) -> Result<bool, StoreError> {
        Ok(self.collection(kind).contains_key(&id))
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
