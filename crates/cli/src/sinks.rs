//! Delivery targets: Garmin Connect for the FIT artifact, TrainerRoad for the weight

use anyhow::{Context, Result};
use async_trait::async_trait;
use bodysync_lib::ports::{PrimarySink, SecondarySink};
use reqwest::multipart::{Form, Part};
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::client::{ensure_success, ApiClient, Auth};
use crate::config::Credentials;

const FIT_FILE_NAME: &str = "bodysync.fit";

/// Uploads FIT artifacts to Garmin Connect
pub struct GarminClient {
    api: ApiClient,
    auth: Auth,
}

impl GarminClient {
    pub fn new(upload_url: &str, credentials: Credentials) -> Result<Self> {
        Ok(Self {
            api: ApiClient::new(upload_url)?,
            auth: Auth::Basic(credentials),
        })
    }
}

#[async_trait]
impl PrimarySink for GarminClient {
    async fn upload(&self, artifact: &[u8]) -> Result<bool> {
        let part = Part::bytes(artifact.to_vec())
            .file_name(FIT_FILE_NAME)
            .mime_str("application/octet-stream")?;
        let form = Form::new().part("file", part);

        debug!(bytes = artifact.len(), "Uploading FIT file");
        let response = self
            .api
            .request(Method::POST, self.api.endpoint("")?, &self.auth)
            .multipart(form)
            .send()
            .await
            .context("Failed to reach Garmin Connect")?;

        let status = response.status();
        if status.is_success() {
            Ok(true)
        } else if status == StatusCode::CONFLICT {
            info!("Garmin Connect reports the activity already exists");
            Ok(true)
        } else {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "Garmin Connect rejected the upload");
            Ok(false)
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct WeightPayload {
    weight: f64,
}

/// Sets the rider weight on TrainerRoad
pub struct TrainerRoadClient {
    api: ApiClient,
    auth: Auth,
}

impl TrainerRoadClient {
    pub fn new(weight_url: &str, credentials: Credentials) -> Result<Self> {
        Ok(Self {
            api: ApiClient::new(weight_url)?,
            auth: Auth::Basic(credentials),
        })
    }

    /// Weight currently stored on the account
    pub async fn current_weight(&self) -> Result<f64> {
        let payload: WeightPayload = self.api.get("", &[], &self.auth).await?;
        Ok(payload.weight)
    }
}

#[async_trait]
impl SecondarySink for TrainerRoadClient {
    async fn set_latest_weight(&self, weight_kg: f64) -> Result<()> {
        match self.current_weight().await {
            Ok(current) => info!(current_kg = current, "Current TrainerRoad weight"),
            Err(e) => debug!(error = %format!("{:#}", e), "Could not read current TrainerRoad weight"),
        }

        info!(weight_kg = weight_kg, "Updating TrainerRoad weight");
        let response = self
            .api
            .request(Method::PUT, self.api.endpoint("")?, &self.auth)
            .json(&WeightPayload { weight: weight_kg })
            .send()
            .await
            .context("Failed to reach TrainerRoad")?;

        ensure_success(response).await?;
        Ok(())
    }
}
