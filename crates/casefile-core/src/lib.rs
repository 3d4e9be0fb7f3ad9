//! # casefile-core
//!
//! The record and board engine for Casefile - THE LOGIC.
//!
//! This crate holds everything that does not need a network or a runtime:
//! - `types`: record shapes, identifiers, metadata and errors
//! - `snapshot`: the loaded copy of every collection
//! - `board`: relationship graph construction and the interactive surface
//! - `system`: dashboard aggregates
//! - `storage`: the Record Store (in-memory and redb backends)
//!
//! ## Architectural Constraints
//!
//! - NO async, NO network dependencies (pure Rust)
//! - Deterministic: the same snapshot and search always yield the same board
//! - Records link to persons through soft string keys only

// =============================================================================
// MODULES
// =============================================================================

pub mod board;
pub mod primitives;
pub mod snapshot;
pub mod storage;
pub mod system;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    Attachment, CasefileError, Company, CorporateAffiliation, FinancialTransaction, META_FIELDS,
    Occurrence, Person, Phone, Property, Record, RecordId, RecordKind, RecordMeta, SocialProfile,
    Vehicle,
};

// =============================================================================
// RE-EXPORTS: Engine
// =============================================================================

pub use board::{
    BoardGraph, BoardSurface, EdgeAnchoring, GraphEdge, GraphNode, NodeId, build_graph,
    normalize_key, suggestions,
};
pub use snapshot::Snapshot;
pub use storage::{MemoryStore, RecordStore, RedbStore, Stamp, StorageBackend};

// =============================================================================
// RE-EXPORTS: System (from system module)
// =============================================================================

pub use system::{DashboardAggregates, DateRange};
