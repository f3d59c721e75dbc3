//! Durable record of measurements already delivered to the primary sink
//!
//! This module provides:
//! - The `Ledger` key-set interface used by deduplication and commit
//! - A CSV file ledger compatible with the historical sync log format
//! - An in-memory ledger for tests and dry runs

mod csv_file;
mod memory;

pub use csv_file::{CsvLedger, LEDGER_COLUMNS, LEDGER_TITLE};
pub use memory::MemoryLedger;

use crate::render::LedgerRow;
use anyhow::Result;
use chrono::{DateTime, Utc};
use std::path::Path;

/// Append-only set of committed measurement timestamps.
///
/// Once a timestamp is appended it stays a member for the lifetime of the
/// backing store; there is no removal or compaction.
pub trait Ledger: Send + Sync {
    /// Whether a record with this exact timestamp was already committed
    fn contains(&self, timestamp: &DateTime<Utc>) -> bool;

    /// Append rows for newly delivered records
    fn append_rows(&mut self, rows: &[LedgerRow]) -> Result<()>;

    /// Number of committed timestamps
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Backing file, if any; used in error reports
    fn location(&self) -> Option<&Path> {
        None
    }
}
