//! Binary-encoder input
//!
//! Each record becomes a device-info entry followed by a weight-scale entry.
//! The encoder turns these into the opaque upload artifact.

use crate::models::EnrichedRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One message handed to the binary encoder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "message", rename_all = "snake_case")]
pub enum EncoderEntry {
    DeviceInfo { timestamp: DateTime<Utc> },
    WeightScale(WeightScaleEntry),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightScaleEntry {
    pub timestamp: DateTime<Utc>,
    pub weight: f64,
    pub percent_fat: Option<f64>,
    pub percent_hydration: Option<f64>,
    pub bone_mass: Option<f64>,
    pub muscle_mass: Option<f64>,
    pub bmi: Option<f64>,
}

impl From<&EnrichedRecord> for WeightScaleEntry {
    fn from(record: &EnrichedRecord) -> Self {
        Self {
            timestamp: record.timestamp,
            weight: record.weight,
            percent_fat: record.fat_ratio,
            percent_hydration: record.percent_hydration,
            bone_mass: record.bone_mass,
            muscle_mass: record.muscle_mass,
            bmi: record.bmi,
        }
    }
}

/// Encoder entries for every record, two per record, in input order
pub fn encoder_entries(records: &[EnrichedRecord]) -> Vec<EncoderEntry> {
    records
        .iter()
        .flat_map(|record| {
            [
                EncoderEntry::DeviceInfo {
                    timestamp: record.timestamp,
                },
                EncoderEntry::WeightScale(record.into()),
            ]
        })
        .collect()
}
