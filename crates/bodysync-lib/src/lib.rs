//! Body-composition sync library
//!
//! This crate provides the core functionality for:
//! - Deriving BMI and hydration from raw scale measurements
//! - Deduplicating against a durable ledger of delivered records
//! - Rendering records for the binary encoder, a JSON document and CSV rows
//! - Orchestrating fetch, delivery to independent sinks, and commit

pub mod dedup;
pub mod enrich;
pub mod error;
pub mod ledger;
pub mod models;
pub mod observability;
pub mod ports;
pub mod render;
pub mod sync;

pub use error::{SyncError, SyncResult};
pub use models::*;
pub use observability::{SinkKind, SyncLogger};
