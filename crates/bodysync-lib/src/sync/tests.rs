//! Scenario tests for the sync orchestrator
//!
//! These tests verify:
//! - No-data and no-weight outcomes touch nothing
//! - Commit happens only after primary delivery
//! - Sinks fail independently
//! - Checkpoint handling for checkpoint-based and explicit windows

use super::*;
use crate::error::SyncError;
use crate::ledger::{CsvLedger, Ledger, MemoryLedger};
use crate::models::RawMeasurementGroup;
use crate::ports::{BinaryEncoder, FetchSource, PrimarySink, SecondarySink};
use crate::render::{EncoderEntry, LedgerRow};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

fn ts(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, day, hour, 0, 0).unwrap()
}

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
}

fn now() -> DateTime<Utc> {
    ts(10, 12)
}

fn weighed(timestamp: DateTime<Utc>, weight: f64) -> RawMeasurementGroup {
    RawMeasurementGroup {
        weight: Some(weight),
        hydration_mass: Some(35.0),
        ..RawMeasurementGroup::at(timestamp)
    }
}

struct FakeSource {
    height: Option<f64>,
    groups: Vec<RawMeasurementGroup>,
    checkpoint: Mutex<DateTime<Utc>>,
    checkpoint_writes: Mutex<Vec<DateTime<Utc>>>,
    windows: Mutex<Vec<(DateTime<Utc>, DateTime<Utc>)>>,
    fail_fetch: bool,
}

impl FakeSource {
    fn new(groups: Vec<RawMeasurementGroup>) -> Self {
        Self {
            height: Some(1.75),
            groups,
            checkpoint: Mutex::new(ts(1, 0)),
            checkpoint_writes: Mutex::new(Vec::new()),
            windows: Mutex::new(Vec::new()),
            fail_fetch: false,
        }
    }

    fn checkpoint_writes(&self) -> Vec<DateTime<Utc>> {
        self.checkpoint_writes.lock().unwrap().clone()
    }

    fn windows(&self) -> Vec<(DateTime<Utc>, DateTime<Utc>)> {
        self.windows.lock().unwrap().clone()
    }
}

#[async_trait]
impl FetchSource for FakeSource {
    async fn get_height(&self) -> Result<Option<f64>> {
        Ok(self.height)
    }

    async fn get_measurements(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<RawMeasurementGroup>> {
        if self.fail_fetch {
            anyhow::bail!("connection reset");
        }
        self.windows.lock().unwrap().push((start, end));
        Ok(self.groups.clone())
    }

    async fn get_checkpoint(&self) -> Result<DateTime<Utc>> {
        Ok(*self.checkpoint.lock().unwrap())
    }

    async fn set_checkpoint(&self, at: DateTime<Utc>) -> Result<()> {
        *self.checkpoint.lock().unwrap() = at;
        self.checkpoint_writes.lock().unwrap().push(at);
        Ok(())
    }
}

#[derive(Clone, Copy)]
enum PrimaryMode {
    Accept,
    Reject,
    Unreachable,
}

struct FakePrimary {
    mode: PrimaryMode,
    uploads: Mutex<Vec<Vec<u8>>>,
}

impl FakePrimary {
    fn new(mode: PrimaryMode) -> Self {
        Self {
            mode,
            uploads: Mutex::new(Vec::new()),
        }
    }

    fn upload_count(&self) -> usize {
        self.uploads.lock().unwrap().len()
    }
}

#[async_trait]
impl PrimarySink for FakePrimary {
    async fn upload(&self, artifact: &[u8]) -> Result<bool> {
        self.uploads.lock().unwrap().push(artifact.to_vec());
        match self.mode {
            PrimaryMode::Accept => Ok(true),
            PrimaryMode::Reject => Ok(false),
            PrimaryMode::Unreachable => anyhow::bail!("upload endpoint unreachable"),
        }
    }
}

struct FakeSecondary {
    fail: bool,
    weights: Mutex<Vec<f64>>,
}

impl FakeSecondary {
    fn new(fail: bool) -> Self {
        Self {
            fail,
            weights: Mutex::new(Vec::new()),
        }
    }

    fn weights(&self) -> Vec<f64> {
        self.weights.lock().unwrap().clone()
    }
}

#[async_trait]
impl SecondarySink for FakeSecondary {
    async fn set_latest_weight(&self, weight_kg: f64) -> Result<()> {
        self.weights.lock().unwrap().push(weight_kg);
        if self.fail {
            anyhow::bail!("login refused");
        }
        Ok(())
    }
}

struct JsonEncoder;

#[async_trait]
impl BinaryEncoder for JsonEncoder {
    async fn encode(&self, entries: &[EncoderEntry]) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(entries)?)
    }
}

struct BrokenLedger;

impl Ledger for BrokenLedger {
    fn contains(&self, _timestamp: &DateTime<Utc>) -> bool {
        false
    }

    fn append_rows(&mut self, _rows: &[LedgerRow]) -> Result<()> {
        anyhow::bail!("disk full")
    }

    fn len(&self) -> usize {
        0
    }
}

struct Harness {
    dir: TempDir,
    source: Arc<FakeSource>,
    primary: Arc<FakePrimary>,
    secondary: Arc<FakeSecondary>,
}

impl Harness {
    fn new(groups: Vec<RawMeasurementGroup>) -> Self {
        Self::with(FakeSource::new(groups), PrimaryMode::Accept, false)
    }

    fn with(source: FakeSource, mode: PrimaryMode, secondary_fails: bool) -> Self {
        Self {
            dir: TempDir::new().unwrap(),
            source: Arc::new(source),
            primary: Arc::new(FakePrimary::new(mode)),
            secondary: Arc::new(FakeSecondary::new(secondary_fails)),
        }
    }

    fn paths(&self) -> OutputPaths {
        OutputPaths::from_basename(self.dir.path().join("scale").to_string_lossy())
    }

    fn csv_ledger(&self) -> CsvLedger {
        CsvLedger::open(self.paths().ledger).unwrap()
    }

    fn builder(&self, options: SyncOptions) -> SyncOrchestratorBuilder {
        SyncOrchestrator::builder()
            .source(self.source.clone())
            .encoder(Arc::new(JsonEncoder))
            .options(options)
            .output_paths(self.paths())
            .clock(now)
    }

    fn orchestrator(&self, options: SyncOptions) -> SyncOrchestrator {
        self.builder(options)
            .primary_sink(self.primary.clone())
            .secondary_sink(self.secondary.clone())
            .ledger(self.csv_ledger())
            .build()
            .unwrap()
    }
}

fn checkpoint_options() -> SyncOptions {
    SyncOptions {
        to_date: Some(date(5)),
        write_fit: true,
        write_json: true,
        ..Default::default()
    }
}

mod no_data_tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_fetch_is_no_data_and_touches_nothing() {
        let harness = Harness::new(vec![]);
        let mut orchestrator = harness.orchestrator(checkpoint_options());

        let err = orchestrator.run().await.unwrap_err();

        assert!(matches!(err, SyncError::NoData));
        assert_eq!(harness.primary.upload_count(), 0);
        assert!(harness.secondary.weights().is_empty());
        assert!(harness.source.checkpoint_writes().is_empty());
        let paths = harness.paths();
        assert!(!paths.ledger.exists());
        assert!(!paths.fit.exists());
        assert!(!paths.json.exists());
    }

    #[tokio::test]
    async fn test_groups_without_weight_is_no_weight_data() {
        let harness = Harness::new(vec![
            RawMeasurementGroup::at(ts(2, 7)),
            RawMeasurementGroup::at(ts(3, 7)),
        ]);
        let mut orchestrator = harness.orchestrator(checkpoint_options());

        let err = orchestrator.run().await.unwrap_err();

        assert!(matches!(err, SyncError::NoWeightData));
        assert!(err.is_terminal_ok());
        assert_eq!(harness.primary.upload_count(), 0);
        assert!(harness.secondary.weights().is_empty());
        assert!(harness.source.checkpoint_writes().is_empty());
        assert!(!harness.paths().ledger.exists());
    }

    #[tokio::test]
    async fn test_fetch_failure_is_reported() {
        let mut source = FakeSource::new(vec![weighed(ts(2, 7), 70.0)]);
        source.fail_fetch = true;
        let harness = Harness::with(source, PrimaryMode::Accept, false);
        let mut orchestrator = harness.orchestrator(checkpoint_options());

        let err = orchestrator.run().await.unwrap_err();
        assert!(matches!(err, SyncError::Fetch(_)));
        assert!(!err.is_terminal_ok());
    }
}

mod delivery_tests {
    use super::*;

    #[tokio::test]
    async fn test_successful_run_commits_everything() {
        let harness = Harness::new(vec![weighed(ts(2, 7), 70.04), weighed(ts(3, 7), 70.36)]);
        let mut orchestrator = harness.orchestrator(checkpoint_options());

        let report = orchestrator.run().await.unwrap();

        assert_eq!(report.primary, PrimaryOutcome::Delivered { records: 2 });
        assert_eq!(report.secondary, SecondaryOutcome::Delivered { weight_kg: 70.4 });
        assert_eq!(harness.primary.upload_count(), 1);
        assert_eq!(harness.secondary.weights(), vec![70.4]);

        let paths = harness.paths();
        assert_eq!(report.files_written, vec![paths.fit.clone(), paths.json.clone()]);
        let json: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&paths.json).unwrap()).unwrap();
        assert_eq!(json["2024-01-02 07:00:00"]["weight"], 70.04);
        assert_eq!(json["2024-01-03 07:00:00"]["percent_hydration"], 49.74);

        let reopened = CsvLedger::open(&paths.ledger).unwrap();
        assert!(reopened.contains(&ts(2, 7)));
        assert!(reopened.contains(&ts(3, 7)));
        assert_eq!(orchestrator.ledger().len(), 2);
    }

    #[tokio::test]
    async fn test_artifact_is_encoder_output() {
        let harness = Harness::new(vec![weighed(ts(2, 7), 70.0)]);
        let mut orchestrator = harness.orchestrator(checkpoint_options());

        orchestrator.run().await.unwrap();

        let uploaded = harness.primary.uploads.lock().unwrap()[0].clone();
        let entries: Vec<EncoderEntry> = serde_json::from_slice(&uploaded).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(std::fs::read(harness.paths().fit).unwrap(), uploaded);
    }

    #[tokio::test]
    async fn test_rerun_does_not_redeliver() {
        let harness = Harness::new(vec![weighed(ts(2, 7), 70.0), weighed(ts(3, 7), 70.2)]);

        let mut first = harness.orchestrator(checkpoint_options());
        first.run().await.unwrap();

        let mut second = harness.orchestrator(checkpoint_options());
        let report = second.run().await.unwrap();

        assert_eq!(report.primary, PrimaryOutcome::NothingNew);
        assert_eq!(report.already_synced, 2);
        assert_eq!(report.to_deliver(), 0);
        assert_eq!(harness.primary.upload_count(), 1);
        assert_eq!(harness.secondary.weights(), vec![70.2, 70.2]);
    }

    #[tokio::test]
    async fn test_latest_weight_comes_from_all_records() {
        let harness = Harness::new(vec![
            weighed(ts(1, 7), 70.1),
            weighed(ts(2, 7), 70.2),
            weighed(ts(3, 7), 70.3),
        ]);
        let mut seeded = harness.csv_ledger();
        seeded
            .append_rows(&[LedgerRow {
                timestamp: "2024-01-02 07:00:00".to_string(),
                weight: 70.2,
                bmi: None,
                fat_ratio: None,
                bone_mass: None,
                percent_hydration: None,
                muscle_mass: None,
            }])
            .unwrap();

        let mut orchestrator = harness.orchestrator(checkpoint_options());
        let report = orchestrator.run().await.unwrap();

        let delivered: Vec<_> = report
            .renderings
            .rows
            .iter()
            .map(|row| row.timestamp.as_str())
            .collect();
        assert_eq!(delivered, vec!["2024-01-01 07:00:00", "2024-01-03 07:00:00"]);
        assert_eq!(report.latest.unwrap().timestamp, ts(3, 7));
        assert_eq!(harness.secondary.weights(), vec![70.3]);
    }

    #[tokio::test]
    async fn test_files_only_written_when_requested() {
        let harness = Harness::new(vec![weighed(ts(2, 7), 70.0)]);
        let options = SyncOptions {
            to_date: Some(date(5)),
            ..Default::default()
        };
        let mut orchestrator = harness.orchestrator(options);

        let report = orchestrator.run().await.unwrap();

        assert!(report.files_written.is_empty());
        let paths = harness.paths();
        assert!(paths.ledger.exists());
        assert!(!paths.fit.exists());
        assert!(!paths.json.exists());
    }
}

mod sink_isolation_tests {
    use super::*;

    #[tokio::test]
    async fn test_primary_rejection_commits_nothing() {
        let harness = Harness::with(
            FakeSource::new(vec![weighed(ts(2, 7), 70.0)]),
            PrimaryMode::Reject,
            false,
        );
        let mut orchestrator = harness.orchestrator(checkpoint_options());

        let err = orchestrator.run().await.unwrap_err();

        assert!(matches!(err, SyncError::SinkUnavailable(_)));
        assert_eq!(harness.secondary.weights(), vec![70.0]);
        let paths = harness.paths();
        assert!(!paths.ledger.exists());
        assert!(!paths.fit.exists());
        assert!(!paths.json.exists());
        assert!(harness.source.checkpoint_writes().is_empty());
    }

    #[tokio::test]
    async fn test_primary_unreachable_is_sink_unavailable() {
        let harness = Harness::with(
            FakeSource::new(vec![weighed(ts(2, 7), 70.0)]),
            PrimaryMode::Unreachable,
            false,
        );
        let mut orchestrator = harness.orchestrator(checkpoint_options());

        let err = orchestrator.run().await.unwrap_err();

        match &err {
            SyncError::SinkUnavailable(detail) => assert!(detail.contains("unreachable")),
            other => panic!("expected SinkUnavailable, got {other:?}"),
        }
        assert_eq!(orchestrator.ledger().len(), 0);
    }

    #[tokio::test]
    async fn test_secondary_failure_does_not_block_primary() {
        let harness = Harness::with(
            FakeSource::new(vec![weighed(ts(2, 7), 70.0)]),
            PrimaryMode::Accept,
            true,
        );
        let mut orchestrator = harness.orchestrator(checkpoint_options());

        let report = orchestrator.run().await.unwrap();

        assert!(matches!(report.secondary, SecondaryOutcome::Failed(_)));
        assert_eq!(report.primary, PrimaryOutcome::Delivered { records: 1 });
        assert!(harness.paths().ledger.exists());
    }

    #[tokio::test]
    async fn test_unconfigured_sinks_are_skipped() {
        let harness = Harness::new(vec![weighed(ts(2, 7), 70.0)]);
        let mut orchestrator = harness
            .builder(checkpoint_options())
            .ledger(harness.csv_ledger())
            .build()
            .unwrap();

        let report = orchestrator.run().await.unwrap();

        assert_eq!(report.primary, PrimaryOutcome::NotConfigured);
        assert_eq!(report.secondary, SecondaryOutcome::NotConfigured);
        assert!(report.checkpoint.is_none());
        assert!(!harness.paths().ledger.exists());
        assert!(!harness.paths().fit.exists());
    }

    #[tokio::test]
    async fn test_unconfigured_primary_with_nothing_new_keeps_checkpoint() {
        let harness = Harness::new(vec![weighed(ts(2, 7), 70.0)]);
        harness.orchestrator(checkpoint_options()).run().await.unwrap();
        assert_eq!(harness.source.checkpoint_writes().len(), 1);

        let mut orchestrator = harness
            .builder(checkpoint_options())
            .ledger(harness.csv_ledger())
            .build()
            .unwrap();
        let report = orchestrator.run().await.unwrap();

        assert_eq!(report.to_deliver(), 0);
        assert_eq!(report.primary, PrimaryOutcome::NotConfigured);
        assert!(report.checkpoint.is_none());
        assert_eq!(harness.source.checkpoint_writes().len(), 1);
    }

    #[tokio::test]
    async fn test_ledger_failure_is_persistence_unavailable() {
        let harness = Harness::new(vec![weighed(ts(2, 7), 70.0)]);
        let mut orchestrator = harness
            .builder(checkpoint_options())
            .primary_sink(harness.primary.clone())
            .ledger(BrokenLedger)
            .build()
            .unwrap();

        let err = orchestrator.run().await.unwrap_err();

        assert!(matches!(err, SyncError::PersistenceUnavailable { .. }));
        assert_eq!(harness.primary.upload_count(), 1);
        assert!(harness.source.checkpoint_writes().is_empty());
    }
}

mod dry_run_tests {
    use super::*;

    #[tokio::test]
    async fn test_dry_run_renders_but_delivers_nothing() {
        let harness = Harness::new(vec![weighed(ts(2, 7), 70.0), weighed(ts(3, 7), 70.1)]);
        let options = SyncOptions {
            no_upload: true,
            ..checkpoint_options()
        };
        let mut orchestrator = harness.orchestrator(options);

        let report = orchestrator.run().await.unwrap();

        assert!(report.is_dry_run());
        assert_eq!(report.to_deliver(), 2);
        assert_eq!(report.renderings.document.len(), 2);
        assert_eq!(harness.primary.upload_count(), 0);
        assert!(harness.secondary.weights().is_empty());
        assert!(harness.source.checkpoint_writes().is_empty());
        assert!(!harness.paths().ledger.exists());
        assert!(!harness.paths().json.exists());
    }

    #[tokio::test]
    async fn test_dry_run_without_encoder_succeeds() {
        let harness = Harness::new(vec![weighed(ts(2, 7), 70.0)]);
        let mut orchestrator = SyncOrchestrator::builder()
            .source(harness.source.clone())
            .ledger(MemoryLedger::new())
            .options(SyncOptions {
                no_upload: true,
                ..checkpoint_options()
            })
            .clock(now)
            .build()
            .unwrap();

        assert!(orchestrator.run().await.is_ok());
    }
}

mod checkpoint_tests {
    use super::*;

    #[tokio::test]
    async fn test_window_uses_checkpoint_and_inclusive_end() {
        let harness = Harness::new(vec![weighed(ts(2, 7), 70.0)]);
        let mut orchestrator = harness.orchestrator(checkpoint_options());

        orchestrator.run().await.unwrap();

        assert_eq!(
            harness.source.windows(),
            vec![(ts(1, 0), Utc.with_ymd_and_hms(2024, 1, 5, 23, 59, 59).unwrap())]
        );
    }

    #[tokio::test]
    async fn test_checkpoint_advances_to_window_end() {
        let harness = Harness::new(vec![weighed(ts(2, 7), 70.0)]);
        let mut orchestrator = harness.orchestrator(checkpoint_options());

        let report = orchestrator.run().await.unwrap();

        let end = Utc.with_ymd_and_hms(2024, 1, 5, 23, 59, 59).unwrap();
        assert_eq!(report.checkpoint, Some(end));
        assert_eq!(harness.source.checkpoint_writes(), vec![end]);
    }

    #[tokio::test]
    async fn test_checkpoint_for_open_ended_window_is_now() {
        let harness = Harness::new(vec![weighed(ts(2, 7), 70.0)]);
        let options = SyncOptions {
            to_date: None,
            ..checkpoint_options()
        };
        let mut orchestrator = harness.orchestrator(options);

        let report = orchestrator.run().await.unwrap();

        assert_eq!(report.window.end, Utc.with_ymd_and_hms(2024, 1, 10, 23, 59, 59).unwrap());
        assert_eq!(report.checkpoint, Some(now()));
    }

    #[tokio::test]
    async fn test_explicit_from_date_never_moves_checkpoint() {
        let harness = Harness::new(vec![weighed(ts(2, 7), 70.0)]);
        let options = SyncOptions {
            from_date: Some(date(1)),
            ..checkpoint_options()
        };
        let mut orchestrator = harness.orchestrator(options);

        let report = orchestrator.run().await.unwrap();

        assert_eq!(report.primary, PrimaryOutcome::Delivered { records: 1 });
        assert!(report.checkpoint.is_none());
        assert!(harness.source.checkpoint_writes().is_empty());
        assert_eq!(harness.source.windows()[0].0, ts(1, 0));
    }

    #[tokio::test]
    async fn test_explicit_from_date_failure_never_moves_checkpoint() {
        let harness = Harness::with(
            FakeSource::new(vec![weighed(ts(2, 7), 70.0)]),
            PrimaryMode::Reject,
            false,
        );
        let options = SyncOptions {
            from_date: Some(date(1)),
            ..checkpoint_options()
        };
        let mut orchestrator = harness.orchestrator(options);

        assert!(orchestrator.run().await.is_err());
        assert!(harness.source.checkpoint_writes().is_empty());
    }

    #[tokio::test]
    async fn test_nothing_new_still_advances_checkpoint() {
        let harness = Harness::new(vec![weighed(ts(2, 7), 70.0)]);
        harness.orchestrator(checkpoint_options()).run().await.unwrap();

        let report = harness
            .orchestrator(checkpoint_options())
            .run()
            .await
            .unwrap();

        assert_eq!(report.primary, PrimaryOutcome::NothingNew);
        assert_eq!(harness.source.checkpoint_writes().len(), 2);
    }
}
