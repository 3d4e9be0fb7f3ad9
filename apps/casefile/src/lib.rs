//! # Casefile Server Library
//!
//! The HTTP API, CLI and configuration of the `casefile` binary, exposed as a
//! library so integration tests and the board client can drive the router
//! in-process.

pub mod api;
pub mod cli;
pub mod config;
