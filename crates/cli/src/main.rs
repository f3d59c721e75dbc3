//! Bodysync CLI
//!
//! Fetches body-composition measurements from Withings and fans them out to
//! Garmin Connect (as a FIT file) and TrainerRoad (latest weight only).

mod client;
mod config;
mod encoder;
mod output;
mod sinks;
mod withings;

use anyhow::{Context, Result};
use bodysync_lib::ledger::CsvLedger;
use bodysync_lib::sync::{OutputPaths, SyncOptions, SyncOrchestrator, DEFAULT_BASENAME};
use bodysync_lib::{SyncError, SyncLogger};
use chrono::NaiveDate;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{resolve_credentials, AppConfig, StateStore, SECRETS_DIR};
use crate::encoder::ProcessEncoder;
use crate::sinks::{GarminClient, TrainerRoadClient};
use crate::withings::WithingsClient;

/// Bodysync CLI
#[derive(Parser)]
#[command(name = "bodysync")]
#[command(author, version, about = "Sync Withings body-composition measurements to Garmin Connect and TrainerRoad", long_about = None)]
pub struct Cli {
    /// Username to log in to Garmin Connect
    #[arg(long, alias = "gu", env = "GARMIN_USERNAME")]
    pub garmin_username: Option<String>,

    /// Password to log in to Garmin Connect
    #[arg(long, alias = "gp", env = "GARMIN_PASSWORD", hide_env_values = true)]
    pub garmin_password: Option<String>,

    /// Username to log in to TrainerRoad
    #[arg(long, alias = "tu", env = "TRAINERROAD_USERNAME")]
    pub trainerroad_username: Option<String>,

    /// Password to log in to TrainerRoad
    #[arg(long, alias = "tp", env = "TRAINERROAD_PASSWORD", hide_env_values = true)]
    pub trainerroad_password: Option<String>,

    /// Date to start syncing from (YYYY-MM-DD); the last sync is used if omitted
    #[arg(long, short = 'f', value_parser = parse_date)]
    pub fromdate: Option<NaiveDate>,

    /// Last date to sync, inclusive (YYYY-MM-DD); defaults to today
    #[arg(long, short = 't', value_parser = parse_date)]
    pub todate: Option<NaiveDate>,

    /// Write the FIT file that was uploaded
    #[arg(long, short = 'F')]
    pub to_fit: bool,

    /// Write the measurements as a JSON document
    #[arg(long, short = 'J')]
    pub to_json: bool,

    /// Basename for the output files (.csv ledger, .fit, .json)
    #[arg(long, short = 'o', default_value = DEFAULT_BASENAME)]
    pub output: String,

    /// Fetch and render without uploading or writing files
    #[arg(long)]
    pub no_upload: bool,

    /// Configuration file (defaults to ~/.config/bodysync/config.json)
    #[arg(long, env = "BODYSYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format for the run summary
    #[arg(long, default_value = "table")]
    pub format: output::OutputFormat,

    /// Emit logs as JSON
    #[arg(long)]
    pub json_logs: bool,

    /// Enable verbose output
    #[arg(long, short)]
    pub verbose: bool,
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| format!("invalid date {:?} (expected YYYY-MM-DD): {}", value, e))
}

fn init_tracing(verbose: bool, json: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

impl Cli {
    fn options(&self) -> SyncOptions {
        SyncOptions {
            from_date: self.fromdate,
            to_date: self.todate,
            no_upload: self.no_upload,
            write_fit: self.to_fit,
            write_json: self.to_json,
        }
    }
}

fn build_orchestrator(cli: &Cli, config: &AppConfig, secrets_dir: &Path) -> Result<SyncOrchestrator> {
    let token = config
        .withings_access_token
        .clone()
        .filter(|t| !t.trim().is_empty())
        .context("Withings access token not configured (set BODYSYNC_WITHINGS_ACCESS_TOKEN)")?;
    let state = StateStore::new(config.state_path()?);
    let source = WithingsClient::new(&config.withings_url, token, state)?;

    let paths = OutputPaths::from_basename(&cli.output);
    let ledger = CsvLedger::open(paths.ledger.clone()).map_err(|source| {
        SyncError::PersistenceUnavailable {
            path: paths.ledger.clone(),
            source,
        }
    })?;

    let mut builder = SyncOrchestrator::builder()
        .source(Arc::new(source))
        .ledger(ledger)
        .options(cli.options())
        .output_paths(paths)
        .logger(SyncLogger::new("bodysync"));

    if let Some(program) = &config.encoder_command {
        builder = builder.encoder(Arc::new(ProcessEncoder::new(
            program.clone(),
            config.encoder_args.clone(),
        )));
    }

    if let Some(creds) = resolve_credentials(
        "garmin",
        cli.garmin_username.clone(),
        cli.garmin_password.clone(),
        secrets_dir,
    ) {
        builder = builder.primary_sink(Arc::new(GarminClient::new(
            &config.garmin_upload_url,
            creds,
        )?));
    }

    if let Some(creds) = resolve_credentials(
        "trainerroad",
        cli.trainerroad_username.clone(),
        cli.trainerroad_password.clone(),
        secrets_dir,
    ) {
        builder = builder.secondary_sink(Arc::new(TrainerRoadClient::new(
            &config.trainerroad_weight_url,
            creds,
        )?));
    }

    builder.build()
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.json_logs);

    let config = AppConfig::load(cli.config.as_deref())?;
    debug!(
        withings_url = %config.withings_url,
        output = %cli.output,
        no_upload = cli.no_upload,
        "Configuration loaded"
    );

    let mut orchestrator = build_orchestrator(&cli, &config, Path::new(SECRETS_DIR))?;

    match orchestrator.run().await {
        Ok(report) => output::print_report(&report, cli.format),
        Err(e) if e.is_terminal_ok() => {
            output::print_warning(&e.to_string());
            Ok(())
        }
        Err(e) => {
            output::print_error(&format!("{:#}", anyhow::Error::from(e)));
            std::process::exit(1);
        }
    }
}
