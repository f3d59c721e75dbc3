//! Tabular rendering shared by the ledger and the terminal

use crate::models::EnrichedRecord;
use serde::{Deserialize, Serialize};

/// One ledger row. Field order is the column order on disk:
/// timestamp, weight, bmi, fat, bone, hydration, muscle.
/// Absent values serialize as empty fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerRow {
    pub timestamp: String,
    pub weight: f64,
    pub bmi: Option<f64>,
    pub fat_ratio: Option<f64>,
    pub bone_mass: Option<f64>,
    pub percent_hydration: Option<f64>,
    pub muscle_mass: Option<f64>,
}

impl From<&EnrichedRecord> for LedgerRow {
    fn from(record: &EnrichedRecord) -> Self {
        Self {
            timestamp: record.timestamp_key(),
            weight: record.weight,
            bmi: record.bmi,
            fat_ratio: record.fat_ratio,
            bone_mass: record.bone_mass,
            percent_hydration: record.percent_hydration,
            muscle_mass: record.muscle_mass,
        }
    }
}

pub fn table_rows(records: &[EnrichedRecord]) -> Vec<LedgerRow> {
    records.iter().map(LedgerRow::from).collect()
}
