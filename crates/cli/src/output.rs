//! Output formatting utilities

use anyhow::Result;
use bodysync_lib::render::LedgerRow;
use bodysync_lib::sync::{PrimaryOutcome, SecondaryOutcome, SyncReport};
use bodysync_lib::TIMESTAMP_FORMAT;
use clap::ValueEnum;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for the run summary
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// Structured JSON document of the selected records
    Json,
}

/// Table row for one measurement
#[derive(Tabled)]
struct RecordRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Weight")]
    weight: String,
    #[tabled(rename = "BMI")]
    bmi: String,
    #[tabled(rename = "Fat %")]
    fat: String,
    #[tabled(rename = "Bone")]
    bone: String,
    #[tabled(rename = "Hydration %")]
    hydration: String,
    #[tabled(rename = "Muscle")]
    muscle: String,
}

impl From<&LedgerRow> for RecordRow {
    fn from(row: &LedgerRow) -> Self {
        Self {
            date: row.timestamp.clone(),
            weight: format!("{:.2} kg", row.weight),
            bmi: format_optional(row.bmi, ""),
            fat: format_optional(row.fat_ratio, ""),
            bone: format_optional(row.bone_mass, " kg"),
            hydration: format_optional(row.percent_hydration, ""),
            muscle: format_optional(row.muscle_mass, " kg"),
        }
    }
}

/// Print the outcome of a run
pub fn print_report(report: &SyncReport, format: OutputFormat) -> Result<()> {
    if let OutputFormat::Json = format {
        let json = report.renderings.document.to_pretty_json()?;
        println!("{}", String::from_utf8_lossy(&json));
        return Ok(());
    }

    println!("{}", "Sync Summary".bold());
    println!("{}", "=".repeat(50));
    println!(
        "Window:                 {} → {}",
        report.window.start.format(TIMESTAMP_FORMAT),
        report.window.end.format(TIMESTAMP_FORMAT)
    );
    println!("Measurement groups:     {}", report.fetched_groups);
    println!("Skipped (no weight):    {}", report.skipped_no_weight);
    println!("Already synced:         {}", report.already_synced);
    println!("New records:            {}", report.to_deliver());
    if let Some(latest) = &report.latest {
        println!(
            "Latest weight:          {} ({})",
            format!("{:.1} kg", latest.weight).cyan(),
            latest.timestamp.format(TIMESTAMP_FORMAT)
        );
    }
    println!();

    let rows: Vec<RecordRow> = report.renderings.rows.iter().map(RecordRow::from).collect();
    if rows.is_empty() {
        println!("{}", "No new records".yellow());
    } else {
        println!("{}", Table::new(rows).with(Style::rounded()));
    }
    println!();

    if report.is_dry_run() {
        print_info("Dry run: nothing uploaded, no files written");
        return Ok(());
    }

    match &report.secondary {
        SecondaryOutcome::Delivered { weight_kg } => {
            print_success(&format!("TrainerRoad weight set to {:.1} kg", weight_kg))
        }
        SecondaryOutcome::Failed(detail) => {
            print_warning(&format!("TrainerRoad sync failed: {}", detail))
        }
        SecondaryOutcome::NotConfigured => print_info("TrainerRoad not configured, skipped"),
        SecondaryOutcome::Skipped => {}
    }

    match &report.primary {
        PrimaryOutcome::Delivered { records } => {
            print_success(&format!("Uploaded {} records to Garmin Connect", records))
        }
        PrimaryOutcome::NothingNew => print_info("No new records for Garmin Connect"),
        PrimaryOutcome::NotConfigured => print_info("Garmin Connect not configured, skipped"),
        PrimaryOutcome::Skipped => {}
    }

    for path in &report.files_written {
        print_info(&format!("Wrote {}", path.display()));
    }
    if let Some(checkpoint) = report.checkpoint {
        print_info(&format!(
            "Checkpoint moved to {}",
            checkpoint.format(TIMESTAMP_FORMAT)
        ));
    }

    Ok(())
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format an optional value with two decimals, `-` when absent
pub fn format_optional(value: Option<f64>, suffix: &str) -> String {
    match value {
        Some(v) => format!("{:.2}{}", v, suffix),
        None => "-".to_string(),
    }
}
