//! # Casefile Board Client
//!
//! Talks to a Casefile server over HTTP and keeps a local copy of every
//! collection. The board and the dashboard are computed from that copy.
//!
//! - [`client`]: typed wrapper over the REST API
//! - [`cache`]: the cached collections with loading flags and cancellable
//!   fetches

pub mod cache;
pub mod client;

pub use cache::{CacheError, CancelHandle, CancelToken, DataCache, LoadingFlags};
pub use client::{ClientError, RecordClient, SessionUser};
