//! Failure taxonomy for a sync run

use std::path::PathBuf;
use thiserror::Error;

/// Why a sync run stopped before `Done`
#[derive(Debug, Error)]
pub enum SyncError {
    /// The fetch window contained no measurement groups
    #[error("no measurements to sync for the requested period")]
    NoData,

    /// Groups were fetched but none of them carried a weight
    #[error("no usable weight data in the fetched measurements")]
    NoWeightData,

    /// The primary sink rejected or could not accept the artifact
    #[error("primary sink unavailable: {0}")]
    SinkUnavailable(String),

    /// The ledger could not be read or appended to
    #[error("ledger {} unavailable: {source}", .path.display())]
    PersistenceUnavailable {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("fetch failed: {0:#}")]
    Fetch(#[source] anyhow::Error),

    #[error("binary encoder failed: {0:#}")]
    Encoder(#[source] anyhow::Error),
}

impl SyncError {
    /// True for the outcomes that mean "nothing to do" rather than a fault
    pub fn is_terminal_ok(&self) -> bool {
        matches!(self, SyncError::NoData | SyncError::NoWeightData)
    }
}

pub type SyncResult<T> = std::result::Result<T, SyncError>;
