//! Unit derivation: turns raw measurement groups into enriched records
//!
//! Pure functions only. A group without a weight is not a measurement and is
//! discarded here; it is counted as a skip, never as a failure.

use crate::models::{EnrichedRecord, RawMeasurementGroup};
use tracing::debug;

/// Result of deriving units for one group
#[derive(Debug, Clone, PartialEq)]
pub enum Enrichment {
    Record(EnrichedRecord),
    /// The group carried no usable weight
    MissingWeight,
}

/// Records that survived derivation plus the number of discarded groups
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnrichOutcome {
    pub records: Vec<EnrichedRecord>,
    pub skipped: usize,
}

impl EnrichOutcome {
    /// True when groups were supplied but every one of them lacked weight
    pub fn all_skipped(&self) -> bool {
        self.records.is_empty() && self.skipped > 0
    }
}

/// Body-mass index, one decimal place. Absent without a positive height.
pub fn bmi(weight: f64, height: Option<f64>) -> Option<f64> {
    let height = height.filter(|h| h.is_finite() && *h > 0.0)?;
    Some(round_to(weight / height.powi(2), 1))
}

/// Body water as a percentage of weight, two decimal places.
/// Absent when there is no hydration mass or the weight is zero.
pub fn percent_hydration(weight: f64, hydration_mass: Option<f64>) -> Option<f64> {
    let hydration = hydration_mass?;
    if weight == 0.0 {
        return None;
    }
    Some(round_to(hydration * 100.0 / weight, 2))
}

/// Derive BMI and hydration percentage for a single group
pub fn enrich(group: &RawMeasurementGroup, height: Option<f64>) -> Enrichment {
    let Some(weight) = group.weight.filter(|w| w.is_finite()) else {
        return Enrichment::MissingWeight;
    };

    Enrichment::Record(EnrichedRecord {
        timestamp: group.timestamp,
        height,
        weight,
        fat_ratio: group.fat_ratio,
        muscle_mass: group.muscle_mass,
        hydration_mass: group.hydration_mass,
        bone_mass: group.bone_mass,
        percent_hydration: percent_hydration(weight, group.hydration_mass),
        bmi: bmi(weight, height),
    })
}

/// Derive every group in order, discarding the ones without weight
pub fn enrich_all(groups: &[RawMeasurementGroup], height: Option<f64>) -> EnrichOutcome {
    let mut outcome = EnrichOutcome::default();

    for group in groups {
        match enrich(group, height) {
            Enrichment::Record(record) => {
                debug!(
                    timestamp = %record.timestamp_key(),
                    height = ?record.height,
                    weight = record.weight,
                    fat_ratio = ?record.fat_ratio,
                    muscle_mass = ?record.muscle_mass,
                    percent_hydration = ?record.percent_hydration,
                    bone_mass = ?record.bone_mass,
                    bmi = ?record.bmi,
                    "Enriched record"
                );
                outcome.records.push(record);
            }
            Enrichment::MissingWeight => {
                debug!(group = ?group, "Measurement group has no weight, skipping");
                outcome.skipped += 1;
            }
        }
    }

    outcome
}

pub(crate) fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
