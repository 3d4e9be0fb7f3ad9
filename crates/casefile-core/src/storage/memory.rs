//! In-memory record store.
//!
//! Uses `BTreeMap` exclusively so listings come back in id order.

use super::{RecordStore, Stamp, apply_update, prepare_insert};
use crate::{CasefileError, Record, RecordId, RecordKind};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    collections: BTreeMap<RecordKind, BTreeMap<RecordId, Record>>,
    /// Next id per collection. Ids start at 1 and are never reused.
    next_ids: BTreeMap<RecordKind, u64>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&mut self, kind: RecordKind) -> RecordId {
        let next = self.next_ids.entry(kind).or_insert(1);
        let id = RecordId(*next);
        *next = next.saturating_add(1);
        id
    }
}

impl RecordStore for MemoryStore {
    fn list(&self, kind: RecordKind) -> Result<Vec<Record>, CasefileError> {
        Ok(self
            .collections
            .get(&kind)
            .map(|c| c.values().cloned().collect())
            .unwrap_or_default())
    }

    fn get(&self, kind: RecordKind, id: RecordId) -> Result<Option<Record>, CasefileError> {
        Ok(self
            .collections
            .get(&kind)
            .and_then(|c| c.get(&id))
            .cloned())
    }

    fn insert(&mut self, record: Record, stamp: &Stamp) -> Result<Record, CasefileError> {
        let kind = record.kind();
        record.validate()?;
        let id = self.allocate_id(kind);
        let record = prepare_insert(record, id, stamp);
        self.collections
            .entry(kind)
            .or_default()
            .insert(id, record.clone());
        Ok(record)
    }

    fn update(
        &mut self,
        kind: RecordKind,
        id: RecordId,
        patch: &Map<String, Value>,
        expected_version: Option<u64>,
        stamp: &Stamp,
    ) -> Result<Record, CasefileError> {
        let slot = self
            .collections
            .get_mut(&kind)
            .and_then(|c| c.get_mut(&id))
            .ok_or(CasefileError::RecordNotFound(kind, id))?;
        let updated = apply_update(slot.clone(), patch, expected_version, stamp)?;
        *slot = updated.clone();
        Ok(updated)
    }

    fn delete(&mut self, kind: RecordKind, id: RecordId) -> Result<bool, CasefileError> {
        Ok(self
            .collections
            .get_mut(&kind)
            .is_some_and(|c| c.remove(&id).is_some()))
    }

    fn restore(&mut self, record: Record) -> Result<(), CasefileError> {
        record.validate()?;
        let kind = record.kind();
        let id = record.id();
        let next = self.next_ids.entry(kind).or_insert(1);
        *next = (*next).max(id.0.saturating_add(1));
        self.collections.entry(kind).or_default().insert(id, record);
        Ok(())
    }

    fn count(&self, kind: RecordKind) -> Result<usize, CasefileError> {
        Ok(self.collections.get(&kind).map_or(0, BTreeMap::len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn stamp() -> Stamp {
        Stamp::new(Some("officer".to_string()), "2024-05-01T12:00:00Z")
    }

    fn person(key: &str) -> Record {
        Record::from_json(RecordKind::Person, json!({"key": key, "displayName": "P"}))
            .expect("parse")
    }

    #[test]
    fn ids_are_per_collection() {
        let mut store = MemoryStore::new();
        let p = store.insert(person("1"), &stamp()).expect("insert");
        let phone = Record::from_json(RecordKind::Phone, json!({"number": "555"})).expect("parse");
        let phone = store.insert(phone, &stamp()).expect("insert");
        assert_eq!(p.id(), RecordId(1));
        assert_eq!(phone.id(), RecordId(1));
    }

    #[test]
    fn client_created_by_is_kept() {
        let mut store = MemoryStore::new();
        let record = Record::from_json(
            RecordKind::Person,
            json!({"key": "1", "createdBy": "analyst@example.com"}),
        )
        .expect("parse");
        let stored = store.insert(record, &stamp()).expect("insert");
        assert_eq!(stored.meta().created_by.as_deref(), Some("analyst@example.com"));
        assert_eq!(stored.meta().created_at.as_deref(), Some("2024-05-01T12:00:00Z"));
    }

    #[test]
    fn invalid_insert_does_not_consume_an_id() {
        let mut store = MemoryStore::new();
        assert!(store.insert(person("  "), &stamp()).is_err());
        let ok = store.insert(person("1"), &stamp()).expect("insert");
        assert_eq!(ok.id(), RecordId(1));
        assert_eq!(store.count(RecordKind::Person).expect("count"), 1);
    }

    #[test]
    fn ids_are_never_reused() {
        let mut store = MemoryStore::new();
        let a = store.insert(person("1"), &stamp()).expect("insert");
        assert!(store.delete(RecordKind::Person, a.id()).expect("delete"));
        let b = store.insert(person("2"), &stamp()).expect("insert");
        assert_eq!(b.id(), RecordId(2));
    }

    #[test]
    fn stale_update_leaves_record_untouched() {
        let mut store = MemoryStore::new();
        let a = store.insert(person("1"), &stamp()).expect("insert");
        let patch = json!({"displayName": "Q"});
        let patch = patch.as_object().expect("object");
        store
            .update(RecordKind::Person, a.id(), patch, Some(1), &stamp())
            .expect("update");

        let stale = json!({"displayName": "R"});
        let stale = stale.as_object().expect("object");
        let result = store.update(RecordKind::Person, a.id(), stale, Some(1), &stamp());
        assert!(matches!(result, Err(CasefileError::VersionConflict { .. })));

        let current = store
            .get(RecordKind::Person, a.id())
            .expect("get")
            .expect("present");
        assert_eq!(current.title(), "Q");
        assert_eq!(current.meta().version, 2);
    }

    #[test]
    fn snapshot_covers_every_collection() {
        let mut store = MemoryStore::new();
        store.insert(person("1"), &stamp()).expect("insert");
        let snapshot = store.snapshot().expect("snapshot");
        assert_eq!(snapshot.len(RecordKind::Person), 1);
        assert_eq!(snapshot.len(RecordKind::Vehicle), 0);
    }
}
