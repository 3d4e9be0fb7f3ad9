//! # Record Storage
//!
//! The Record Store: one collection per [`RecordKind`], each a table of
//! records keyed by [`RecordId`].
//!
//! Two backends implement [`RecordStore`]:
//! - [`MemoryStore`]: `BTreeMap` collections (tests, `--memory` mode)
//! - [`RedbStore`]: disk-backed ACID tables using redb
//!
//! [`StorageBackend`] picks one at runtime.
//!
//! ## Versions
//!
//! Every insert starts a record at version 1; every update bumps it. An
//! update may carry the version it was based on; a mismatch is a
//! [`CasefileError::VersionConflict`] rather than a silent overwrite. Updates
//! without a version stay last-write-wins.

mod memory;
mod redb_store;

pub use memory::MemoryStore;
pub use redb_store::RedbStore;

use crate::{CasefileError, Record, RecordId, RecordKind, Snapshot};
use serde_json::{Map, Value};
use std::path::Path;

/// Who changed a record, and when (RFC 3339).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Stamp {
    pub actor: Option<String>,
    pub at: String,
}

impl Stamp {
    #[must_use]
    pub fn new(actor: Option<String>, at: impl Into<String>) -> Self {
        Self {
            actor,
            at: at.into(),
        }
    }
}

// =============================================================================
// RECORDSTORE TRAIT
// =============================================================================

/// CRUD over the record collections.
///
/// All fallible operations return `Result<T, CasefileError>` so in-memory and
/// persistent backends behave uniformly.
pub trait RecordStore {
    /// All records of a kind, in id order.
    fn list(&self, kind: RecordKind) -> Result<Vec<Record>, CasefileError>;

    fn get(&self, kind: RecordKind, id: RecordId) -> Result<Option<Record>, CasefileError>;

    /// Store a new record under a fresh id. Returns the stored record.
    fn insert(&mut self, record: Record, stamp: &Stamp) -> Result<Record, CasefileError>;

    /// Merge `patch` into an existing record. Returns the updated record.
    fn update(
        &mut self,
        kind: RecordKind,
        id: RecordId,
        patch: &Map<String, Value>,
        expected_version: Option<u64>,
        stamp: &Stamp,
    ) -> Result<Record, CasefileError>;

    /// Remove a record. Returns whether it existed.
    fn delete(&mut self, kind: RecordKind, id: RecordId) -> Result<bool, CasefileError>;

    /// Store a record exactly as given (id and version kept). Used by import.
    fn restore(&mut self, record: Record) -> Result<(), CasefileError>;

    fn count(&self, kind: RecordKind) -> Result<usize, CasefileError>;

    /// Copy every collection into a snapshot.
    fn snapshot(&self) -> Result<Snapshot, CasefileError> {
        let mut snapshot = Snapshot::new();
        for kind in RecordKind::ALL {
            snapshot.replace(kind, self.list(kind)?);
        }
        Ok(snapshot)
    }
}

// =============================================================================
// SHARED WRITE RULES
// =============================================================================

/// Stamp a new record with its id, version 1 and timestamps.
///
/// A `createdBy` sent by the client is kept; otherwise the stamp's actor is
/// used. The caller validates before allocating `id`.
pub(crate) fn prepare_insert(mut record: Record, id: RecordId, stamp: &Stamp) -> Record {
    let meta = record.meta_mut();
    meta.id = id;
    meta.version = 1;
    if meta.created_by.as_deref().is_none_or(|c| c.trim().is_empty()) {
        meta.created_by = stamp.actor.clone();
    }
    meta.created_at = Some(stamp.at.clone());
    meta.updated_at = Some(stamp.at.clone());
    record
}

/// Check the expected version, merge the patch and bump the version.
pub(crate) fn apply_update(
    mut record: Record,
    patch: &Map<String, Value>,
    expected_version: Option<u64>,
    stamp: &Stamp,
) -> Result<Record, CasefileError> {
    let found = record.meta().version;
    if let Some(expected) = expected_version {
        if expected != found {
            return Err(CasefileError::VersionConflict {
                kind: record.kind(),
                id: record.id(),
                expected,
                found,
            });
        }
    }
    record.apply_patch(patch)?;
    record.validate()?;
    let meta = record.meta_mut();
    meta.version = found.saturating_add(1);
    meta.updated_at = Some(stamp.at.clone());
    Ok(record)
}

// =============================================================================
// STORAGE BACKEND
// =============================================================================

/// Runtime choice of record store.
#[derive(Debug)]
pub enum StorageBackend {
    /// In-memory collections (fast, volatile).
    InMemory(MemoryStore),
    /// Disk-backed collections using redb (ACID, persistent).
    Persistent(RedbStore),
}

impl Default for StorageBackend {
    fn default() -> Self {
        Self::InMemory(MemoryStore::new())
    }
}

impl StorageBackend {
    /// Open or create a redb-backed store at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CasefileError> {
        Ok(Self::Persistent(RedbStore::open(path)?))
    }

    #[must_use]
    pub fn is_persistent(&self) -> bool {
        matches!(self, Self::Persistent(_))
    }

    fn store(&self) -> &dyn RecordStore {
        match self {
            Self::InMemory(s) => s,
            Self::Persistent(s) => s,
        }
    }

    fn store_mut(&mut self) -> &mut dyn RecordStore {
        match self {
            Self::InMemory(s) => s,
            Self::Persistent(s) => s,
        }
    }
}

impl RecordStore for StorageBackend {
    fn list(&self, kind: RecordKind) -> Result<Vec<Record>, CasefileError> {
        self.store().list(kind)
    }

    fn get(&self, kind: RecordKind, id: RecordId) -> Result<Option<Record>, CasefileError> {
        self.store().get(kind, id)
    }

    fn insert(&mut self, record: Record, stamp: &Stamp) -> Result<Record, CasefileError> {
        self.store_mut().insert(record, stamp)
    }

    fn update(
        &mut self,
        kind: RecordKind,
        id: RecordId,
        patch: &Map<String, Value>,
        expected_version: Option<u64>,
        stamp: &Stamp,
    ) -> Result<Record, CasefileError> {
        self.store_mut()
            .update(kind, id, patch, expected_version, stamp)
    }

    fn delete(&mut self, kind: RecordKind, id: RecordId) -> Result<bool, CasefileError> {
        self.store_mut().delete(kind, id)
    }

    fn restore(&mut self, record: Record) -> Result<(), CasefileError> {
        self.store_mut().restore(record)
    }

    fn count(&self, kind: RecordKind) -> Result<usize, CasefileError> {
        self.store().count(kind)
    }
}
