//! # System Module
//!
//! Dashboard aggregates over the loaded collections.
//!
//! Aggregates are recomputed on every request and never cached; they are a
//! pure function of the snapshot.

mod dashboard;

pub use dashboard::*;
