//! CSV-backed ledger
//!
//! File layout: a one-field title row, a column header row, then one row per
//! committed record. Membership is decided by the first column of data rows,
//! parsed once when the ledger is opened.

use super::Ledger;
use crate::models::canonical_timestamp;
use crate::render::LedgerRow;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Title row written at the top of a new ledger file
pub const LEDGER_TITLE: &str = "Body";

/// Column header row, in data-row order
pub const LEDGER_COLUMNS: [&str; 7] = [
    "Date",
    "Weight",
    "BMI",
    "Fat",
    "Bone",
    "Hydration",
    "Muscle",
];

/// Ledger persisted as an append-only CSV file
#[derive(Debug)]
pub struct CsvLedger {
    path: PathBuf,
    committed: HashSet<String>,
}

impl CsvLedger {
    /// Open the ledger at `path`. A missing file is an empty ledger; it is
    /// created on the first append.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let committed = if path.exists() {
            let committed = Self::load(&path)?;
            info!(path = %path.display(), entries = committed.len(), "Loaded ledger");
            committed
        } else {
            debug!(path = %path.display(), "Ledger file not found, starting empty");
            HashSet::new()
        };

        Ok(Self { path, committed })
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(path: &Path) -> Result<HashSet<String>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(path)
            .with_context(|| format!("Failed to open ledger {:?}", path))?;

        let mut committed = HashSet::new();
        for record in reader.byte_records() {
            let record = record.with_context(|| format!("Failed to read ledger {:?}", path))?;
            let Some(field) = record.get(0) else {
                continue;
            };
            // Only the key column must be text; other columns are never parsed.
            let key = String::from_utf8_lossy(field);
            let key = key.trim();
            if key.is_empty() || key == LEDGER_TITLE || key == LEDGER_COLUMNS[0] {
                continue;
            }
            committed.insert(key.to_string());
        }

        Ok(committed)
    }

    fn write_preamble(writer: &mut csv::Writer<std::fs::File>) -> Result<()> {
        writer.write_record([LEDGER_TITLE])?;
        writer.write_record(LEDGER_COLUMNS)?;
        Ok(())
    }
}

fn ends_with_newline(file: &mut File, len: u64) -> Result<bool> {
    let mut last = [0u8; 1];
    file.seek(SeekFrom::Start(len - 1))
        .context("Failed to seek in ledger")?;
    file.read_exact(&mut last).context("Failed to read ledger tail")?;
    Ok(last[0] == b'\n')
}

impl Ledger for CsvLedger {
    fn contains(&self, timestamp: &DateTime<Utc>) -> bool {
        self.committed.contains(&canonical_timestamp(timestamp))
    }

    fn append_rows(&mut self, rows: &[LedgerRow]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {:?}", parent))?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open ledger {:?} for append", self.path))?;

        let len = file
            .metadata()
            .with_context(|| format!("Failed to stat ledger {:?}", self.path))?
            .len();
        let is_new = len == 0;
        if !is_new && !ends_with_newline(&mut file, len)? {
            debug!(path = %self.path.display(), "Terminating unfinished last row");
            file.write_all(b"\n").context("Failed to terminate last ledger row")?;
        }

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_writer(file);

        if is_new {
            debug!(path = %self.path.display(), "Creating ledger file");
            Self::write_preamble(&mut writer)?;
        }

        for row in rows {
            writer
                .serialize(row)
                .with_context(|| format!("Failed to append row for {}", row.timestamp))?;
        }
        writer.flush().context("Failed to flush ledger")?;

        self.committed
            .extend(rows.iter().map(|row| row.timestamp.clone()));

        debug!(path = %self.path.display(), appended = rows.len(), "Ledger appended");
        Ok(())
    }

    fn len(&self) -> usize {
        self.committed.len()
    }

    fn location(&self) -> Option<&Path> {
        Some(&self.path)
    }
}
