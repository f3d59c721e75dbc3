//! Withings measurement source

use anyhow::{Context, Result};
use async_trait::async_trait;
use bodysync_lib::ports::FetchSource;
use bodysync_lib::RawMeasurementGroup;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::client::{ApiClient, Auth};
use crate::config::StateStore;

/// Measure type codes used by the Withings API
mod measure_type {
    pub const WEIGHT: i32 = 1;
    pub const HEIGHT: i32 = 4;
    pub const FAT_RATIO: i32 = 6;
    pub const MUSCLE_MASS: i32 = 76;
    pub const HYDRATION: i32 = 77;
    pub const BONE_MASS: i32 = 88;
}

/// Category for real measurements, as opposed to user objectives
const CATEGORY_MEASURE: &str = "1";

#[derive(Debug, thiserror::Error)]
#[error("Withings API returned status {0}")]
pub struct WithingsStatusError(pub i64);

#[derive(Debug, Deserialize)]
struct MeasureResponse {
    status: i64,
    #[serde(default)]
    body: Option<MeasureBody>,
}

#[derive(Debug, Default, Deserialize)]
struct MeasureBody {
    #[serde(default)]
    measuregrps: Vec<MeasureGroup>,
}

#[derive(Debug, Deserialize)]
struct MeasureGroup {
    date: i64,
    #[serde(default)]
    measures: Vec<Measure>,
}

#[derive(Debug, Deserialize)]
struct Measure {
    value: i64,
    #[serde(rename = "type")]
    kind: i32,
    unit: i32,
}

impl Measure {
    /// `value * 10^unit`, dividing for negative units to keep results exact
    fn scaled(&self) -> f64 {
        if self.unit < 0 {
            self.value as f64 / 10f64.powi(-self.unit)
        } else {
            self.value as f64 * 10f64.powi(self.unit)
        }
    }
}

impl MeasureGroup {
    fn timestamp(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.date, 0)
    }

    fn value_of(&self, kind: i32) -> Option<f64> {
        self.measures
            .iter()
            .find(|m| m.kind == kind)
            .map(Measure::scaled)
    }

    fn to_raw(&self) -> Option<RawMeasurementGroup> {
        let timestamp = self.timestamp()?;
        Some(RawMeasurementGroup {
            timestamp,
            weight: self.value_of(measure_type::WEIGHT),
            fat_ratio: self.value_of(measure_type::FAT_RATIO),
            muscle_mass: self.value_of(measure_type::MUSCLE_MASS),
            hydration_mass: self.value_of(measure_type::HYDRATION),
            bone_mass: self.value_of(measure_type::BONE_MASS),
        })
    }
}

/// Fetch source backed by the Withings measure API and a local checkpoint file
pub struct WithingsClient {
    api: ApiClient,
    auth: Auth,
    state: StateStore,
}

impl WithingsClient {
    pub fn new(base_url: &str, access_token: String, state: StateStore) -> Result<Self> {
        Ok(Self {
            api: ApiClient::new(base_url)?,
            auth: Auth::Bearer(access_token),
            state,
        })
    }

    async fn get_groups(&self, query: &[(&str, String)]) -> Result<Vec<MeasureGroup>> {
        let mut params = vec![
            ("action", "getmeas".to_string()),
            ("category", CATEGORY_MEASURE.to_string()),
        ];
        params.extend_from_slice(query);

        let response: MeasureResponse = self
            .api
            .get("measure", &params, &self.auth)
            .await
            .context("Failed to fetch Withings measurements")?;

        if response.status != 0 {
            return Err(WithingsStatusError(response.status).into());
        }

        Ok(response.body.unwrap_or_default().measuregrps)
    }
}

#[async_trait]
impl FetchSource for WithingsClient {
    async fn get_height(&self) -> Result<Option<f64>> {
        let groups = self
            .get_groups(&[("meastype", measure_type::HEIGHT.to_string())])
            .await?;

        let height = groups
            .iter()
            .filter_map(|g| g.value_of(measure_type::HEIGHT).map(|h| (g.date, h)))
            .max_by_key(|(date, _)| *date)
            .map(|(_, height)| height);

        debug!(height = ?height, "Resolved height");
        Ok(height)
    }

    async fn get_measurements(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<RawMeasurementGroup>> {
        let groups = self
            .get_groups(&[
                ("startdate", start.timestamp().to_string()),
                ("enddate", end.timestamp().to_string()),
            ])
            .await?;

        let mut raw = Vec::with_capacity(groups.len());
        for group in &groups {
            match group.to_raw() {
                Some(r) if r.timestamp >= start && r.timestamp <= end => raw.push(r),
                Some(_) => debug!(date = group.date, "Dropping group outside window"),
                None => warn!(date = group.date, "Dropping group with invalid date"),
            }
        }
        raw.sort_by_key(|r| r.timestamp);

        Ok(raw)
    }

    async fn get_checkpoint(&self) -> Result<DateTime<Utc>> {
        Ok(self
            .state
            .load()?
            .unwrap_or_else(|| Utc::now() - Duration::days(1)))
    }

    async fn set_checkpoint(&self, at: DateTime<Utc>) -> Result<()> {
        self.state.save(at)
    }
}
