//! Core data models for body-composition sync

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Format used wherever a timestamp is rendered as text (ledger rows, document keys).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Render a timestamp in its canonical text form.
pub fn canonical_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}

/// A measurement group as returned by the upstream account, before validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMeasurementGroup {
    pub timestamp: DateTime<Utc>,
    /// Kilograms
    pub weight: Option<f64>,
    /// Percent
    pub fat_ratio: Option<f64>,
    /// Kilograms
    pub muscle_mass: Option<f64>,
    /// Kilograms of body water
    pub hydration_mass: Option<f64>,
    /// Kilograms
    pub bone_mass: Option<f64>,
}

impl RawMeasurementGroup {
    /// An empty group at the given instant; all measures absent
    pub fn at(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            weight: None,
            fat_ratio: None,
            muscle_mass: None,
            hydration_mass: None,
            bone_mass: None,
        }
    }
}

/// A validated measurement with derived metrics attached.
///
/// Built only by [`crate::enrich::enrich`]; `weight` is always present and the
/// derived fields are either fully computed or absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedRecord {
    pub timestamp: DateTime<Utc>,
    /// Metres, shared by every record of a run
    pub height: Option<f64>,
    pub weight: f64,
    pub fat_ratio: Option<f64>,
    pub muscle_mass: Option<f64>,
    pub hydration_mass: Option<f64>,
    pub bone_mass: Option<f64>,
    pub percent_hydration: Option<f64>,
    pub bmi: Option<f64>,
}

impl EnrichedRecord {
    /// Canonical text form of the timestamp; the ledger key for this record
    pub fn timestamp_key(&self) -> String {
        canonical_timestamp(&self.timestamp)
    }
}

/// The newest measurement seen in a run, used for the secondary sink
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatestMeasurement {
    pub timestamp: DateTime<Utc>,
    pub weight: f64,
}
