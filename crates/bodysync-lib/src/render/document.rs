//! Structured-document rendering (timestamp → measurements)

use crate::models::EnrichedRecord;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

/// Unit tag attached to every document entry
pub const WEIGHT_UNIT: &str = "kg";

/// Measurements for one timestamp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentEntry {
    pub unit: String,
    pub weight: f64,
    pub fat_ratio: Option<f64>,
    pub muscle_mass: Option<f64>,
    pub percent_hydration: Option<f64>,
    pub bone_mass: Option<f64>,
    pub bmi: Option<f64>,
}

impl From<&EnrichedRecord> for DocumentEntry {
    fn from(record: &EnrichedRecord) -> Self {
        Self {
            unit: WEIGHT_UNIT.to_string(),
            weight: record.weight,
            fat_ratio: record.fat_ratio,
            muscle_mass: record.muscle_mass,
            percent_hydration: record.percent_hydration,
            bone_mass: record.bone_mass,
            bmi: record.bmi,
        }
    }
}

/// Mapping from canonical timestamp to entry, serialized as a JSON object
/// whose keys keep the record order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StructuredDocument {
    entries: Vec<(String, DocumentEntry)>,
}

impl StructuredDocument {
    pub fn from_records(records: &[EnrichedRecord]) -> Self {
        Self {
            entries: records
                .iter()
                .map(|record| (record.timestamp_key(), record.into()))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn get(&self, key: &str) -> Option<&DocumentEntry> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, entry)| entry)
    }

    /// Pretty JSON with 4-space indentation
    pub fn to_pretty_json(&self) -> serde_json::Result<Vec<u8>> {
        let mut out = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
        self.serialize(&mut serializer)?;
        Ok(out)
    }
}

impl Serialize for StructuredDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, entry) in &self.entries {
            map.serialize_entry(key, entry)?;
        }
        map.end()
    }
}
