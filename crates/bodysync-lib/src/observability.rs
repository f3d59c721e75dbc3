//! Structured logging for sync runs
//!
//! Every pipeline milestone is emitted as a single tracing event carrying an
//! `event` field, so JSON log consumers can follow a run without parsing
//! message text.

use crate::models::{canonical_timestamp, LatestMeasurement};
use chrono::{DateTime, Utc};
use std::path::Path;
use tracing::{error, info, warn};

/// Which downstream destination an outcome refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkKind {
    Primary,
    Secondary,
}

impl std::fmt::Display for SinkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SinkKind::Primary => write!(f, "primary"),
            SinkKind::Secondary => write!(f, "secondary"),
        }
    }
}

/// Structured logger for sync events
#[derive(Debug, Clone)]
pub struct SyncLogger {
    source: String,
}

impl SyncLogger {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Log the computed fetch window
    pub fn log_window(&self, start: DateTime<Utc>, end: DateTime<Utc>, from_checkpoint: bool) {
        info!(
            event = "window_computed",
            source = %self.source,
            start = %start.format("%Y-%m-%d %H:%M"),
            end = %end.format("%Y-%m-%d %H:%M"),
            from_checkpoint = from_checkpoint,
            "Fetching measurements"
        );
    }

    /// Log the fetch result
    pub fn log_fetch(&self, groups: usize, height: Option<f64>) {
        if groups == 0 {
            warn!(
                event = "fetch_empty",
                source = %self.source,
                "No measurements to upload for date or period specified"
            );
        } else {
            info!(
                event = "fetch_complete",
                source = %self.source,
                groups = groups,
                height = ?height,
                "Fetched measurement groups"
            );
        }
    }

    /// Log derivation and dedup counts
    pub fn log_selection(
        &self,
        enriched: usize,
        skipped: usize,
        to_deliver: usize,
        already_synced: usize,
    ) {
        info!(
            event = "records_selected",
            source = %self.source,
            enriched = enriched,
            skipped_no_weight = skipped,
            to_deliver = to_deliver,
            already_synced = already_synced,
            "Selected records for delivery"
        );
    }

    /// Log the latest measurement
    pub fn log_latest(&self, latest: &LatestMeasurement) {
        info!(
            event = "latest_measurement",
            source = %self.source,
            weight_kg = latest.weight,
            measured_at = %canonical_timestamp(&latest.timestamp),
            "Latest measurement"
        );
    }

    /// Log a sink being skipped for lack of credentials
    pub fn log_sink_skipped(&self, sink: SinkKind, reason: &str) {
        info!(
            event = "sink_skipped",
            source = %self.source,
            sink = %sink,
            reason = %reason,
            "Skipping sink"
        );
    }

    /// Log a sink delivery outcome
    pub fn log_sink_outcome(&self, sink: SinkKind, delivered: bool, detail: &str) {
        if delivered {
            info!(
                event = "sink_delivered",
                source = %self.source,
                sink = %sink,
                detail = %detail,
                "Sink delivery done"
            );
        } else {
            error!(
                event = "sink_failed",
                source = %self.source,
                sink = %sink,
                detail = %detail,
                "Sink delivery failed"
            );
        }
    }

    /// Log a ledger commit
    pub fn log_commit(&self, appended: usize, ledger: Option<&Path>) {
        info!(
            event = "ledger_committed",
            source = %self.source,
            appended = appended,
            ledger = ?ledger,
            "Ledger updated"
        );
    }

    /// Log an output file write
    pub fn log_file_written(&self, kind: &str, path: &Path) {
        info!(
            event = "file_written",
            source = %self.source,
            kind = %kind,
            path = %path.display(),
            "Wrote output file"
        );
    }

    /// Log an output file that could not be written
    pub fn log_file_failed(&self, kind: &str, path: &Path, err: &anyhow::Error) {
        error!(
            event = "file_failed",
            source = %self.source,
            kind = %kind,
            path = %path.display(),
            error = %format!("{:#}", err),
            "Unable to write output file"
        );
    }

    /// Log a checkpoint advance
    pub fn log_checkpoint(&self, at: DateTime<Utc>) {
        info!(
            event = "checkpoint_advanced",
            source = %self.source,
            at = %canonical_timestamp(&at),
            "Sync checkpoint advanced"
        );
    }
}
