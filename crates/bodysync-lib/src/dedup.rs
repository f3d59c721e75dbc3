//! Deduplication against the ledger and latest-measurement selection

use crate::ledger::Ledger;
use crate::models::{EnrichedRecord, LatestMeasurement};
use tracing::debug;

/// Outcome of filtering one run's records against the ledger
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DedupOutcome {
    /// Records not yet in the ledger, in input order
    pub to_deliver: Vec<EnrichedRecord>,
    /// Newest record over the whole input, delivered or not
    pub latest: Option<LatestMeasurement>,
    /// Records dropped because the ledger already had them
    pub already_synced: usize,
}

impl DedupOutcome {
    /// True when the input was empty
    pub fn is_no_data(&self) -> bool {
        self.latest.is_none()
    }
}

/// Split records into the ones still to deliver and find the latest one.
///
/// `latest` is computed over every input record regardless of ledger
/// membership. Ties on the maximum timestamp keep the first record seen.
pub fn deduplicate(records: &[EnrichedRecord], ledger: &dyn Ledger) -> DedupOutcome {
    let mut outcome = DedupOutcome::default();

    for record in records {
        let newer = outcome
            .latest
            .map_or(true, |latest| record.timestamp > latest.timestamp);
        if newer {
            outcome.latest = Some(LatestMeasurement {
                timestamp: record.timestamp,
                weight: record.weight,
            });
        }

        if ledger.contains(&record.timestamp) {
            debug!(timestamp = %record.timestamp_key(), "Record found in ledger, skipping");
            outcome.already_synced += 1;
        } else {
            debug!(timestamp = %record.timestamp_key(), "Record not in ledger, adding");
            outcome.to_deliver.push(record.clone());
        }
    }

    outcome
}
