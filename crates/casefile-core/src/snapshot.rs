//! # Snapshot
//!
//! The latest copy of every record collection, keyed by kind.
//!
//! A snapshot is what the board and the dashboard read. It is replaced one
//! collection at a time (never merged incrementally) and otherwise mutated
//! only through the single-record helpers below.

use crate::{Record, RecordId, RecordKind};
use std::collections::BTreeMap;

/// All collections, in kind order. Collections keep their fetch order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    collections: BTreeMap<RecordKind, Vec<Record>>,
}

impl Snapshot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records of one kind, in the order they were loaded.
    #[must_use]
    pub fn records(&self, kind: RecordKind) -> &[Record] {
        self.collections.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Replace a whole collection. Records of a different kind are dropped.
    pub fn replace(&mut self, kind: RecordKind, records: Vec<Record>) {
        let records = records.into_iter().filter(|r| r.kind() == kind).collect();
        self.collections.insert(kind, records);
    }

    /// Append one record to its collection.
    pub fn push(&mut self, record: Record) {
        self.collections
            .entry(record.kind())
            .or_default()
            .push(record);
    }

    #[must_use]
    pub fn find(&self, kind: RecordKind, id: RecordId) -> Option<&Record> {
        self.records(kind).iter().find(|r| r.id() == id)
    }

    pub fn find_mut(&mut self, kind: RecordKind, id: RecordId) -> Option<&mut Record> {
        self.collections
            .get_mut(&kind)?
            .iter_mut()
            .find(|r| r.id() == id)
    }

    /// Remove the record with the given id. Returns whether one was removed.
    pub fn remove(&mut self, kind: RecordKind, id: RecordId) -> bool {
        let Some(records) = self.collections.get_mut(&kind) else {
            return false;
        };
        let before = records.len();
        records.retain(|r| r.id() != id);
        records.len() != before
    }

    /// Number of records of one kind.
    #[must_use]
    pub fn len(&self, kind: RecordKind) -> usize {
        self.records(kind).len()
    }

    /// Whether no collection holds any record.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.collections.values().all(Vec::is_empty)
    }

    /// Every linked record, in `RecordKind::LINKED` order then load order.
    pub fn linked_records(&self) -> impl Iterator<Item = &Record> {
        RecordKind::LINKED
            .into_iter()
            .flat_map(move |kind| self.records(kind).iter())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn vehicle(id: u64, plate: &str) -> Record {
        Record::from_json(RecordKind::Vehicle, json!({"id": id, "plate": plate})).expect("parse")
    }

    fn phone(id: u64) -> Record {
        Record::from_json(RecordKind::Phone, json!({"id": id, "number": "555"})).expect("parse")
    }

    #[test]
    fn replace_drops_foreign_kinds() {
        let mut snapshot = Snapshot::new();
        snapshot.replace(RecordKind::Vehicle, vec![vehicle(1, "A"), phone(2)]);
        assert_eq!(snapshot.len(RecordKind::Vehicle), 1);
        assert_eq!(snapshot.len(RecordKind::Phone), 0);
    }

    #[test]
    fn remove_by_id() {
        let mut snapshot = Snapshot::new();
        snapshot.replace(RecordKind::Vehicle, vec![vehicle(1, "A"), vehicle(2, "B")]);
        assert!(snapshot.remove(RecordKind::Vehicle, RecordId(1)));
        assert!(!snapshot.remove(RecordKind::Vehicle, RecordId(1)));
        assert_eq!(snapshot.len(RecordKind::Vehicle), 1);
        assert!(snapshot.find(RecordKind::Vehicle, RecordId(2)).is_some());
    }

    #[test]
    fn linked_records_follow_layout_order() {
        let mut snapshot = Snapshot::new();
        snapshot.push(phone(1));
        snapshot.push(vehicle(2, "B"));
        let kinds: Vec<_> = snapshot.linked_records().map(Record::kind).collect();
        assert_eq!(kinds, vec![RecordKind::Vehicle, RecordKind::Phone]);
    }

    #[test]
    fn empty_snapshot() {
        let snapshot = Snapshot::new();
        assert!(snapshot.is_empty());
        assert!(snapshot.records(RecordKind::Person).is_empty());
    }
}
