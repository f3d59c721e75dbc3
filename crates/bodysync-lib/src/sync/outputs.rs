//! Local output file locations and writing

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Basename used when none is given
pub const DEFAULT_BASENAME: &str = "withings-sync-log";

/// Files derived from one output basename
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    /// Ledger of delivered records
    pub ledger: PathBuf,
    /// Binary artifact copy
    pub fit: PathBuf,
    /// Structured document
    pub json: PathBuf,
}

impl OutputPaths {
    pub fn from_basename(basename: impl AsRef<str>) -> Self {
        let basename = basename.as_ref();
        Self {
            ledger: PathBuf::from(format!("{basename}.csv")),
            fit: PathBuf::from(format!("{basename}.fit")),
            json: PathBuf::from(format!("{basename}.json")),
        }
    }
}

impl Default for OutputPaths {
    fn default() -> Self {
        Self::from_basename(DEFAULT_BASENAME)
    }
}

/// Replace `path` with `data` via a temp file and rename
pub fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {:?}", parent))?;
    }

    let temp_path = path.with_extension("tmp");
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&temp_path)
        .with_context(|| format!("Failed to create temp file {:?}", temp_path))?;

    file.write_all(data).context("Failed to write output data")?;
    file.sync_all().context("Failed to sync output file")?;

    std::fs::rename(&temp_path, path)
        .with_context(|| format!("Failed to rename {:?} to {:?}", temp_path, path))?;

    Ok(())
}
