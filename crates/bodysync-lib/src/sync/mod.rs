//! Reconcile-and-deliver pipeline
//!
//! This module provides:
//! - Fetch window computation from requested dates or the stored checkpoint
//! - The orchestrator that runs enrich, dedup, render, deliver and commit
//! - Output file locations and atomic file writes

mod orchestrator;
mod outputs;
mod window;

#[cfg(test)]
mod tests;

pub use orchestrator::{
    PrimaryOutcome, SecondaryOutcome, SyncOptions, SyncOrchestrator, SyncOrchestratorBuilder,
    SyncReport,
};
pub use outputs::{write_atomic, OutputPaths, DEFAULT_BASENAME};
pub use window::{end_of_day, start_of_day, SyncWindow};
