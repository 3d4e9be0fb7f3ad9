//! # redb-backed Record Storage
//!
//! A disk-backed record store using the redb embedded database, providing:
//! - ACID transactions (each write is one transaction)
//! - Crash safety (copy-on-write B-trees)
//! - MVCC (concurrent readers, single writer)
//!
//! ## Layout
//!
//! One table per collection, `id (u64) -> record JSON bytes`, plus a metadata
//! table holding the next id of each collection. Records are stored as their
//! collection's JSON body so opaque payload fields survive unchanged.

use super::{RecordStore, Stamp, apply_update, prepare_insert};
use crate::{CasefileError, Record, RecordId, RecordKind};
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use serde_json::{Map, Value};
use std::path::Path;

/// Table for metadata: key string -> value u64
const METADATA: TableDefinition<&str, u64> = TableDefinition::new("metadata");

/// Table of one collection: RecordId(u64) -> JSON bytes
fn collection_table(kind: RecordKind) -> TableDefinition<'static, u64, &'static [u8]> {
    TableDefinition::new(kind.collection())
}

fn next_id_key(kind: RecordKind) -> String {
    format!("next_id/{}", kind.collection())
}

fn io_err(e: impl std::fmt::Display) -> CasefileError {
    CasefileError::IoError(e.to_string())
}

fn encode(record: &Record) -> Result<Vec<u8>, CasefileError> {
    Ok(serde_json::to_vec(&record.to_json()?)?)
}

fn decode(kind: RecordKind, bytes: &[u8]) -> Result<Record, CasefileError> {
    Record::from_json(kind, serde_json::from_slice(bytes)?)
}

/// A disk-backed record store using redb.
pub struct RedbStore {
    db: Database,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore").finish_non_exhaustive()
    }
}

impl RedbStore {
    /// Open or create a record database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CasefileError> {
        let db = Database::create(path.as_ref()).map_err(io_err)?;

        // Initialize tables if they don't exist
        let write_txn = db.begin_write().map_err(io_err)?;
        {
            write_txn.open_table(METADATA).map_err(io_err)?;
            for kind in RecordKind::ALL {
                write_txn
                    .open_table(collection_table(kind))
                    .map_err(io_err)?;
            }
        }
        write_txn.commit().map_err(io_err)?;

        Ok(Self { db })
    }

    /// Compact the database file.
    pub fn compact(&mut self) -> Result<(), CasefileError> {
        self.db.compact().map_err(io_err)?;
        Ok(())
    }
}

impl RecordStore for RedbStore {
    fn list(&self, kind: RecordKind) -> Result<Vec<Record>, CasefileError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn
            .open_table(collection_table(kind))
            .map_err(io_err)?;

        let mut records = Vec::new();
        for entry in table.iter().map_err(io_err)? {
            let (_, value) = entry.map_err(io_err)?;
            records.push(decode(kind, value.value())?);
        }
        Ok(records)
    }

    fn get(&self, kind: RecordKind, id: RecordId) -> Result<Option<Record>, CasefileError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn
            .open_table(collection_table(kind))
            .map_err(io_err)?;
        table
            .get(id.0)
            .map_err(io_err)?
            .map(|guard| decode(kind, guard.value()))
            .transpose()
    }

    fn insert(&mut self, record: Record, stamp: &Stamp) -> Result<Record, CasefileError> {
        let kind = record.kind();
        record.validate()?;

        let write_txn = self.db.begin_write().map_err(io_err)?;
        let stored = {
            let mut meta = write_txn.open_table(METADATA).map_err(io_err)?;
            let mut table = write_txn
                .open_table(collection_table(kind))
                .map_err(io_err)?;

            let key = next_id_key(kind);
            let next = meta
                .get(key.as_str())
                .map_err(io_err)?
                .map(|v| v.value())
                .unwrap_or(1);
            let stored = prepare_insert(record, RecordId(next), stamp);
            let bytes = encode(&stored)?;
            table.insert(next, bytes.as_slice()).map_err(io_err)?;
            meta.insert(key.as_str(), next.saturating_add(1))
                .map_err(io_err)?;
            stored
        };
        write_txn.commit().map_err(io_err)?;
        Ok(stored)
    }

    fn update(
        &mut self,
        kind: RecordKind,
        id: RecordId,
        patch: &Map<String, Value>,
        expected_version: Option<u64>,
        stamp: &Stamp,
    ) -> Result<Record, CasefileError> {
        let write_txn = self.db.begin_write().map_err(io_err)?;
        let updated = {
            let mut table = write_txn
                .open_table(collection_table(kind))
                .map_err(io_err)?;
            let existing = table
                .get(id.0)
                .map_err(io_err)?
                .map(|guard| decode(kind, guard.value()))
                .transpose()?
                .ok_or(CasefileError::RecordNotFound(kind, id))?;
            let updated = apply_update(existing, patch, expected_version, stamp)?;
            let bytes = encode(&updated)?;
            table.insert(id.0, bytes.as_slice()).map_err(io_err)?;
            updated
        };
        write_txn.commit().map_err(io_err)?;
        Ok(updated)
    }

    fn delete(&mut self, kind: RecordKind, id: RecordId) -> Result<bool, CasefileError> {
        let write_txn = self.db.begin_write().map_err(io_err)?;
        let existed = {
            let mut table = write_txn
                .open_table(collection_table(kind))
                .map_err(io_err)?;
            let removed = table.remove(id.0).map_err(io_err)?;
            removed.is_some()
        };
        write_txn.commit().map_err(io_err)?;
        Ok(existed)
    }

    fn restore(&mut self, record: Record) -> Result<(), CasefileError> {
        record.validate()?;
        let kind = record.kind();
        let id = record.id();
        let bytes = encode(&record)?;

        let write_txn = self.db.begin_write().map_err(io_err)?;
        {
            let mut meta = write_txn.open_table(METADATA).map_err(io_err)?;
            let mut table = write_txn
                .open_table(collection_table(kind))
                .map_err(io_err)?;
            table.insert(id.0, bytes.as_slice()).map_err(io_err)?;

            let key = next_id_key(kind);
            let next = meta
                .get(key.as_str())
                .map_err(io_err)?
                .map(|v| v.value())
                .unwrap_or(1);
            meta.insert(key.as_str(), next.max(id.0.saturating_add(1)))
                .map_err(io_err)?;
        }
        write_txn.commit().map_err(io_err)?;
        Ok(())
    }

    fn count(&self, kind: RecordKind) -> Result<usize, CasefileError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn
            .open_table(collection_table(kind))
            .map_err(io_err)?;
        Ok(table.len().map_err(io_err)? as usize)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn stamp() -> Stamp {
        Stamp::new(Some("admin".to_string()), "2024-05-01T12:00:00Z")
    }

    fn vehicle(plate: &str) -> Record {
        Record::from_json(
            RecordKind::Vehicle,
            json!({"plate": plate, "primaryLinkKey": "123", "chassis": "X1"}),
        )
        .expect("parse")
    }

    #[test]
    fn insert_assigns_sequential_ids() {
        let temp = tempdir().expect("temp dir");
        let mut store = RedbStore::open(temp.path().join("test.redb")).expect("open db");

        let a = store.insert(vehicle("A"), &stamp()).expect("insert");
        let b = store.insert(vehicle("B"), &stamp()).expect("insert");
        assert_eq!(a.id(), RecordId(1));
        assert_eq!(b.id(), RecordId(2));
        assert_eq!(a.meta().version, 1);
        assert_eq!(a.meta().created_by.as_deref(), Some("admin"));
        assert_eq!(store.count(RecordKind::Vehicle).expect("count"), 2);
        assert_eq!(store.count(RecordKind::Phone).expect("count"), 0);
    }

    #[test]
    fn persistence() {
        let temp = tempdir().expect("temp dir");
        let db_path = temp.path().join("test.redb");

        {
            let mut store = RedbStore::open(&db_path).expect("open db");
            store.insert(vehicle("A"), &stamp()).expect("insert");
        }

        let mut store = RedbStore::open(&db_path).expect("reopen db");
        let records = store.list(RecordKind::Vehicle).expect("list");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].to_json().expect("json")["chassis"], "X1");

        // id counter survives reopen
        let next = store.insert(vehicle("B"), &stamp()).expect("insert");
        assert_eq!(next.id(), RecordId(2));
    }

    #[test]
    fn update_checks_version() {
        let temp = tempdir().expect("temp dir");
        let mut store = RedbStore::open(temp.path().join("test.redb")).expect("open db");
        let a = store.insert(vehicle("A"), &stamp()).expect("insert");

        let patch = json!({"plate": "B"});
        let patch = patch.as_object().expect("object");
        let updated = store
            .update(RecordKind::Vehicle, a.id(), patch, Some(1), &stamp())
            .expect("update");
        assert_eq!(updated.meta().version, 2);

        let stale = store.update(RecordKind::Vehicle, a.id(), patch, Some(1), &stamp());
        assert!(matches!(
            stale,
            Err(CasefileError::VersionConflict {
                expected: 1,
                found: 2,
                ..
            })
        ));

        // unversioned updates still go through
        let blind = store
            .update(RecordKind::Vehicle, a.id(), patch, None, &stamp())
            .expect("update");
        assert_eq!(blind.meta().version, 3);
    }

    #[test]
    fn update_missing_record() {
        let temp = tempdir().expect("temp dir");
        let mut store = RedbStore::open(temp.path().join("test.redb")).expect("open db");
        let result = store.update(RecordKind::Phone, RecordId(9), &Map::new(), None, &stamp());
        assert!(matches!(result, Err(CasefileError::RecordNotFound(..))));
    }

    #[test]
    fn delete_reports_existence() {
        let temp = tempdir().expect("temp dir");
        let mut store = RedbStore::open(temp.path().join("test.redb")).expect("open db");
        let a = store.insert(vehicle("A"), &stamp()).expect("insert");
        assert!(store.delete(RecordKind::Vehicle, a.id()).expect("delete"));
        assert!(!store.delete(RecordKind::Vehicle, a.id()).expect("delete"));
        assert!(store.get(RecordKind::Vehicle, a.id()).expect("get").is_none());
    }

    #[test]
    fn restore_advances_counter() {
        let temp = tempdir().expect("temp dir");
        let mut store = RedbStore::open(temp.path().join("test.redb")).expect("open db");
        let mut record = vehicle("R");
        record.meta_mut().id = RecordId(40);
        record.meta_mut().version = 5;
        store.restore(record).expect("restore");

        let fresh = store.insert(vehicle("F"), &stamp()).expect("insert");
        assert_eq!(fresh.id(), RecordId(41));
        let restored = store
            .get(RecordKind::Vehicle, RecordId(40))
            .expect("get")
            .expect("present");
        assert_eq!(restored.meta().version, 5);
    }
}
