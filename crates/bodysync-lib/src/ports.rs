//! Collaborator interfaces consumed by the sync pipeline
//!
//! Network access, authentication and the binary wire format live behind
//! these traits. Implementations are provided by the binary crate; tests use
//! in-memory fakes.

use crate::models::RawMeasurementGroup;
use crate::render::EncoderEntry;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Upstream account holding measurements and the sync checkpoint
#[async_trait]
pub trait FetchSource: Send + Sync {
    /// Most recent height in metres, if the account has one
    async fn get_height(&self) -> Result<Option<f64>>;

    /// Measurement groups with `start <= timestamp <= end`
    async fn get_measurements(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<RawMeasurementGroup>>;

    /// Instant of the last checkpointed sync
    async fn get_checkpoint(&self) -> Result<DateTime<Utc>>;

    /// Persist a new checkpoint
    async fn set_checkpoint(&self, at: DateTime<Utc>) -> Result<()>;
}

/// Destination for the binary artifact; its success gates every commit
#[async_trait]
pub trait PrimarySink: Send + Sync {
    /// Returns `Ok(true)` when the artifact was accepted
    async fn upload(&self, artifact: &[u8]) -> Result<bool>;
}

/// Destination for the latest weight only
#[async_trait]
pub trait SecondarySink: Send + Sync {
    async fn set_latest_weight(&self, weight_kg: f64) -> Result<()>;
}

/// Serializer for encoder entries; the output bytes are opaque to the pipeline
#[async_trait]
pub trait BinaryEncoder: Send + Sync {
    async fn encode(&self, entries: &[EncoderEntry]) -> Result<Vec<u8>>;
}
