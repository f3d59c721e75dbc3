//! In-memory ledger

use super::Ledger;
use crate::models::canonical_timestamp;
use crate::render::LedgerRow;
use anyhow::Result;
use chrono::{DateTime, Utc};
use std::collections::HashSet;

/// Ledger held in memory; nothing survives the process
#[derive(Debug, Default, Clone)]
pub struct MemoryLedger {
    committed: HashSet<String>,
    rows: Vec<LedgerRow>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the ledger with already-committed timestamps
    pub fn with_timestamps<'a>(timestamps: impl IntoIterator<Item = &'a DateTime<Utc>>) -> Self {
        Self {
            committed: timestamps.into_iter().map(canonical_timestamp).collect(),
            rows: Vec::new(),
        }
    }

    /// Rows appended through this instance, in append order
    pub fn rows(&self) -> &[LedgerRow] {
        &self.rows
    }
}

impl Ledger for MemoryLedger {
    fn contains(&self, timestamp: &DateTime<Utc>) -> bool {
        self.committed.contains(&canonical_timestamp(timestamp))
    }

    fn append_rows(&mut self, rows: &[LedgerRow]) -> Result<()> {
        self.committed
            .extend(rows.iter().map(|row| row.timestamp.clone()));
        self.rows.extend_from_slice(rows);
        Ok(())
    }

    fn len(&self) -> usize {
        self.committed.len()
    }
}
