//! Sync orchestration
//!
//! Drives one run through its states:
//! `ComputeWindow → Fetch → Enrich → Dedup → Render → Deliver → Commit → Done`.
//! Any state may end the run with a [`SyncError`]. Ledger, output files and
//! checkpoint are only touched after the primary sink accepted the artifact.

use super::outputs::{write_atomic, OutputPaths};
use super::window::SyncWindow;
use crate::dedup::deduplicate;
use crate::enrich::{enrich_all, round_to};
use crate::error::{SyncError, SyncResult};
use crate::ledger::Ledger;
use crate::models::LatestMeasurement;
use crate::observability::{SinkKind, SyncLogger};
use crate::ports::{BinaryEncoder, FetchSource, PrimarySink, SecondarySink};
use crate::render::{render_all, Renderings};
use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Run options resolved by the caller before the pipeline starts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncOptions {
    /// Explicit start date; the stored checkpoint is used when absent
    pub from_date: Option<NaiveDate>,
    /// Inclusive end date; today when absent
    pub to_date: Option<NaiveDate>,
    /// Dry run: fetch and render, but deliver, commit and write nothing
    pub no_upload: bool,
    /// Keep a copy of the binary artifact after a successful upload
    pub write_fit: bool,
    /// Write the structured document after a successful upload
    pub write_json: bool,
}

/// What happened on the primary path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrimaryOutcome {
    /// The artifact was accepted and the records committed
    Delivered { records: usize },
    /// Every fetched record is already in the ledger
    NothingNew,
    /// No primary credentials configured
    NotConfigured,
    /// Dry run
    Skipped,
}

/// What happened on the secondary path
#[derive(Debug, Clone, PartialEq)]
pub enum SecondaryOutcome {
    Delivered { weight_kg: f64 },
    Failed(String),
    NotConfigured,
    /// Dry run
    Skipped,
}

/// Summary of a completed run
#[derive(Debug, Clone)]
pub struct SyncReport {
    pub window: SyncWindow,
    pub fetched_groups: usize,
    pub skipped_no_weight: usize,
    pub enriched: usize,
    pub already_synced: usize,
    pub latest: Option<LatestMeasurement>,
    /// Renderings of the records selected for delivery
    pub renderings: Renderings,
    pub primary: PrimaryOutcome,
    pub secondary: SecondaryOutcome,
    pub files_written: Vec<PathBuf>,
    /// New checkpoint, when it moved
    pub checkpoint: Option<DateTime<Utc>>,
}

impl SyncReport {
    /// Number of records selected for delivery
    pub fn to_deliver(&self) -> usize {
        self.renderings.rows.len()
    }

    pub fn is_dry_run(&self) -> bool {
        self.primary == PrimaryOutcome::Skipped
    }
}

type Clock = Box<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Runs the reconcile-and-deliver pipeline against its collaborators
pub struct SyncOrchestrator {
    source: Arc<dyn FetchSource>,
    encoder: Option<Arc<dyn BinaryEncoder>>,
    primary: Option<Arc<dyn PrimarySink>>,
    secondary: Option<Arc<dyn SecondarySink>>,
    ledger: Box<dyn Ledger>,
    options: SyncOptions,
    paths: OutputPaths,
    logger: SyncLogger,
    clock: Clock,
}

impl SyncOrchestrator {
    /// Start building an orchestrator
    pub fn builder() -> SyncOrchestratorBuilder {
        SyncOrchestratorBuilder::new()
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    pub fn output_paths(&self) -> &OutputPaths {
        &self.paths
    }

    /// The ledger as currently committed
    pub fn ledger(&self) -> &dyn Ledger {
        self.ledger.as_ref()
    }

    /// Execute one run
    pub async fn run(&mut self) -> SyncResult<SyncReport> {
        let window = self.compute_window().await?;

        let height = self.source.get_height().await.map_err(SyncError::Fetch)?;
        let groups = self
            .source
            .get_measurements(window.start, window.end)
            .await
            .map_err(SyncError::Fetch)?;
        self.logger.log_fetch(groups.len(), height);
        if groups.is_empty() {
            return Err(SyncError::NoData);
        }

        let enriched = enrich_all(&groups, height);
        if enriched.records.is_empty() {
            error!(
                skipped = enriched.skipped,
                "Invalid or no weight data detected"
            );
            return Err(SyncError::NoWeightData);
        }

        let dedup = deduplicate(&enriched.records, self.ledger.as_ref());
        self.logger.log_selection(
            enriched.records.len(),
            enriched.skipped,
            dedup.to_deliver.len(),
            dedup.already_synced,
        );
        if let Some(latest) = &dedup.latest {
            self.logger.log_latest(latest);
        }

        let renderings = render_all(&dedup.to_deliver);

        let mut report = SyncReport {
            window,
            fetched_groups: groups.len(),
            skipped_no_weight: enriched.skipped,
            enriched: enriched.records.len(),
            already_synced: dedup.already_synced,
            latest: dedup.latest,
            renderings,
            primary: PrimaryOutcome::Skipped,
            secondary: SecondaryOutcome::Skipped,
            files_written: Vec::new(),
            checkpoint: None,
        };

        if self.options.no_upload {
            info!("Dry run: skipping upload and local file generation");
            return Ok(report);
        }

        report.secondary = self.deliver_secondary(report.latest.as_ref()).await;

        let artifact = match self.deliver_primary(&report.renderings).await? {
            Delivery::Uploaded(artifact) => artifact,
            Delivery::NothingNew => {
                report.primary = PrimaryOutcome::NothingNew;
                report.checkpoint = self.advance_checkpoint(&window).await;
                return Ok(report);
            }
            Delivery::NotConfigured => {
                report.primary = PrimaryOutcome::NotConfigured;
                return Ok(report);
            }
        };

        self.commit_ledger(&report.renderings)?;
        report.primary = PrimaryOutcome::Delivered {
            records: report.renderings.rows.len(),
        };
        report.files_written = self.write_requested_files(&artifact, &report.renderings);
        report.checkpoint = self.advance_checkpoint(&window).await;

        Ok(report)
    }

    async fn compute_window(&self) -> SyncResult<SyncWindow> {
        let to_date = self
            .options
            .to_date
            .unwrap_or_else(|| (self.clock)().date_naive());

        let window = match self.options.from_date {
            Some(from_date) => SyncWindow::explicit(from_date, to_date),
            None => {
                let checkpoint = self
                    .source
                    .get_checkpoint()
                    .await
                    .map_err(SyncError::Fetch)?;
                SyncWindow::from_checkpoint(checkpoint, to_date)
            }
        };

        self.logger
            .log_window(window.start, window.end, window.from_checkpoint);
        Ok(window)
    }

    async fn deliver_secondary(&self, latest: Option<&LatestMeasurement>) -> SecondaryOutcome {
        let Some(sink) = &self.secondary else {
            self.logger
                .log_sink_skipped(SinkKind::Secondary, "no credentials configured");
            return SecondaryOutcome::NotConfigured;
        };
        let Some(latest) = latest else {
            self.logger
                .log_sink_skipped(SinkKind::Secondary, "no latest weight");
            return SecondaryOutcome::NotConfigured;
        };

        let weight_kg = round_to(latest.weight, 1);
        match sink.set_latest_weight(weight_kg).await {
            Ok(()) => {
                self.logger.log_sink_outcome(
                    SinkKind::Secondary,
                    true,
                    &format!("weight set to {weight_kg} kg"),
                );
                SecondaryOutcome::Delivered { weight_kg }
            }
            Err(e) => {
                let detail = format!("{:#}", e);
                self.logger
                    .log_sink_outcome(SinkKind::Secondary, false, &detail);
                SecondaryOutcome::Failed(detail)
            }
        }
    }

    async fn deliver_primary(&self, renderings: &Renderings) -> SyncResult<Delivery> {
        let Some(sink) = &self.primary else {
            self.logger
                .log_sink_skipped(SinkKind::Primary, "no credentials configured");
            return Ok(Delivery::NotConfigured);
        };
        if renderings.rows.is_empty() {
            info!("No new records since the last sync, skipping upload");
            return Ok(Delivery::NothingNew);
        }
        let encoder = self.encoder.as_ref().ok_or_else(|| {
            SyncError::Encoder(anyhow::anyhow!("no binary encoder configured"))
        })?;

        debug!(entries = renderings.encoder_entries.len(), "Encoding artifact");
        let artifact = encoder
            .encode(&renderings.encoder_entries)
            .await
            .map_err(SyncError::Encoder)?;

        match sink.upload(&artifact).await {
            Ok(true) => {
                self.logger.log_sink_outcome(
                    SinkKind::Primary,
                    true,
                    &format!("{} records uploaded", renderings.rows.len()),
                );
                Ok(Delivery::Uploaded(artifact))
            }
            Ok(false) => {
                self.logger
                    .log_sink_outcome(SinkKind::Primary, false, "artifact rejected");
                Err(SyncError::SinkUnavailable("artifact rejected".to_string()))
            }
            Err(e) => {
                let detail = format!("{:#}", e);
                self.logger
                    .log_sink_outcome(SinkKind::Primary, false, &detail);
                Err(SyncError::SinkUnavailable(detail))
            }
        }
    }

    fn commit_ledger(&mut self, renderings: &Renderings) -> SyncResult<()> {
        let result = self.ledger.append_rows(&renderings.rows);
        let location = self.ledger.location().map(PathBuf::from);

        match result {
            Ok(()) => {
                self.logger
                    .log_commit(renderings.rows.len(), location.as_deref());
                Ok(())
            }
            Err(source) => {
                error!(error = %format!("{:#}", source), "Unable to append to ledger");
                Err(SyncError::PersistenceUnavailable {
                    path: location.unwrap_or_else(|| PathBuf::from("<memory>")),
                    source,
                })
            }
        }
    }

    fn write_requested_files(&self, artifact: &[u8], renderings: &Renderings) -> Vec<PathBuf> {
        let mut written = Vec::new();

        if self.options.write_fit {
            self.write_file("fit", &self.paths.fit, Ok(artifact.to_vec()), &mut written);
        }
        if self.options.write_json {
            let document = renderings.document.to_pretty_json().map_err(anyhow::Error::from);
            self.write_file("json", &self.paths.json, document, &mut written);
        }

        written
    }

    fn write_file(
        &self,
        kind: &str,
        path: &Path,
        data: Result<Vec<u8>>,
        written: &mut Vec<PathBuf>,
    ) {
        match data.and_then(|data| write_atomic(path, &data)) {
            Ok(()) => {
                self.logger.log_file_written(kind, path);
                written.push(path.to_path_buf());
            }
            Err(e) => self.logger.log_file_failed(kind, path, &e),
        }
    }

    async fn advance_checkpoint(&self, window: &SyncWindow) -> Option<DateTime<Utc>> {
        if !window.from_checkpoint {
            debug!("Explicit start date requested, leaving checkpoint unchanged");
            return None;
        }

        let at = window.checkpoint_target((self.clock)());
        match self.source.set_checkpoint(at).await {
            Ok(()) => {
                self.logger.log_checkpoint(at);
                Some(at)
            }
            Err(e) => {
                warn!(error = %format!("{:#}", e), "Failed to store sync checkpoint");
                None
            }
        }
    }
}

enum Delivery {
    Uploaded(Vec<u8>),
    NothingNew,
    NotConfigured,
}

/// Builder for [`SyncOrchestrator`]
pub struct SyncOrchestratorBuilder {
    source: Option<Arc<dyn FetchSource>>,
    encoder: Option<Arc<dyn BinaryEncoder>>,
    primary: Option<Arc<dyn PrimarySink>>,
    secondary: Option<Arc<dyn SecondarySink>>,
    ledger: Option<Box<dyn Ledger>>,
    options: SyncOptions,
    paths: OutputPaths,
    logger: Option<SyncLogger>,
    clock: Option<Clock>,
}

impl SyncOrchestratorBuilder {
    pub fn new() -> Self {
        Self {
            source: None,
            encoder: None,
            primary: None,
            secondary: None,
            ledger: None,
            options: SyncOptions::default(),
            paths: OutputPaths::default(),
            logger: None,
            clock: None,
        }
    }

    pub fn source(mut self, source: Arc<dyn FetchSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn encoder(mut self, encoder: Arc<dyn BinaryEncoder>) -> Self {
        self.encoder = Some(encoder);
        self
    }

    /// Set the primary sink; leave unset when its credentials are absent
    pub fn primary_sink(mut self, sink: Arc<dyn PrimarySink>) -> Self {
        self.primary = Some(sink);
        self
    }

    /// Set the secondary sink; leave unset when its credentials are absent
    pub fn secondary_sink(mut self, sink: Arc<dyn SecondarySink>) -> Self {
        self.secondary = Some(sink);
        self
    }

    pub fn ledger(mut self, ledger: impl Ledger + 'static) -> Self {
        self.ledger = Some(Box::new(ledger));
        self
    }

    pub fn options(mut self, options: SyncOptions) -> Self {
        self.options = options;
        self
    }

    pub fn output_paths(mut self, paths: OutputPaths) -> Self {
        self.paths = paths;
        self
    }

    pub fn logger(mut self, logger: SyncLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Override the time source; defaults to the system clock
    pub fn clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        self.clock = Some(Box::new(clock));
        self
    }

    pub fn build(self) -> Result<SyncOrchestrator> {
        let source = self
            .source
            .ok_or_else(|| anyhow::anyhow!("fetch source is required"))?;
        let ledger = self
            .ledger
            .ok_or_else(|| anyhow::anyhow!("ledger is required"))?;

        Ok(SyncOrchestrator {
            source,
            encoder: self.encoder,
            primary: self.primary,
            secondary: self.secondary,
            ledger,
            options: self.options,
            paths: self.paths,
            logger: self.logger.unwrap_or_else(|| SyncLogger::new("sync")),
            clock: self.clock.unwrap_or_else(|| Box::new(Utc::now)),
        })
    }
}

impl Default for SyncOrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
