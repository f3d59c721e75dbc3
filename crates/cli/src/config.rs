//! Configuration management for the CLI

use anyhow::{Context, Result};
use bodysync_lib::sync::write_atomic;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Directory holding mounted secret files
pub const SECRETS_DIR: &str = "/run/secrets";

/// Environment variable prefix for configuration overrides
const ENV_PREFIX: &str = "BODYSYNC";

/// CLI configuration, read from `~/.config/bodysync/config.json` and `BODYSYNC_*` variables
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Withings API base URL
    #[serde(default = "default_withings_url")]
    pub withings_url: String,

    /// OAuth access token for the Withings API
    #[serde(default)]
    pub withings_access_token: Option<String>,

    /// Garmin Connect upload endpoint
    #[serde(default = "default_garmin_upload_url")]
    pub garmin_upload_url: String,

    /// TrainerRoad weight endpoint
    #[serde(default = "default_trainerroad_weight_url")]
    pub trainerroad_weight_url: String,

    /// External program turning encoder entries into a FIT file
    #[serde(default)]
    pub encoder_command: Option<String>,

    #[serde(default)]
    pub encoder_args: Vec<String>,

    /// Checkpoint state file; defaults next to the config file
    #[serde(default)]
    pub state_path: Option<PathBuf>,
}

fn default_withings_url() -> String {
    "https://wbsapi.withings.net".to_string()
}

fn default_garmin_upload_url() -> String {
    "https://connectapi.garmin.com/upload-service/upload/.fit".to_string()
}

fn default_trainerroad_weight_url() -> String {
    "https://www.trainerroad.com/app/api/member-info/weight".to_string()
}

impl AppConfig {
    /// Load configuration from the config file (optional) and environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => config_dir()?.join("config.json"),
        };
        Self::load_with_env(&path, config::Environment::with_prefix(ENV_PREFIX))
    }

    fn load_with_env(path: &Path, env: config::Environment) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(
                config::File::from(path)
                    .format(config::FileFormat::Json)
                    .required(false),
            )
            .add_source(env)
            .build()
            .with_context(|| format!("Failed to read configuration from {:?}", path))?;

        config
            .try_deserialize()
            .context("Failed to parse configuration")
    }

    /// Resolved location of the checkpoint state file
    pub fn state_path(&self) -> Result<PathBuf> {
        match &self.state_path {
            Some(path) => Ok(path.clone()),
            None => Ok(config_dir()?.join("state.json")),
        }
    }
}

fn config_dir() -> Result<PathBuf> {
    let home = dirs_next::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".config").join("bodysync"))
}

/// Username and password for one sink
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Resolve a sink's credentials.
///
/// `username`/`password` already hold the flag or environment value; when
/// absent, `<secrets_dir>/<service>_username` and `<service>_password` are
/// read. Values are trimmed and an empty value counts as absent. Returns
/// `None` unless both parts resolve.
pub fn resolve_credentials(
    service: &str,
    username: Option<String>,
    password: Option<String>,
    secrets_dir: &Path,
) -> Option<Credentials> {
    let username = resolve_value(username, secrets_dir, &format!("{service}_username"))?;
    let Some(password) = resolve_value(password, secrets_dir, &format!("{service}_password")) else {
        tracing::warn!(service = service, "Username set without a password, skipping sink");
        return None;
    };
    Some(Credentials { username, password })
}

fn resolve_value(explicit: Option<String>, secrets_dir: &Path, secret: &str) -> Option<String> {
    explicit
        .or_else(|| std::fs::read_to_string(secrets_dir.join(secret)).ok())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[derive(Debug, Serialize, Deserialize)]
struct SyncState {
    /// Unix seconds of the last checkpointed sync
    last_sync: i64,
}

/// JSON file holding the sync checkpoint
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored checkpoint, or `None` when no state was written yet
    pub fn load(&self) -> Result<Option<DateTime<Utc>>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read state file {:?}", self.path))?;
        let state: SyncState =
            serde_json::from_str(&content).context("Failed to parse state file")?;

        DateTime::from_timestamp(state.last_sync, 0)
            .map(Some)
            .context("Stored checkpoint is out of range")
    }

    pub fn save(&self, at: DateTime<Utc>) -> Result<()> {
        let state = SyncState {
            last_sync: at.timestamp(),
        };
        let content = serde_json::to_vec_pretty(&state).context("Failed to serialize state")?;
        write_atomic(&self.path, &content)
    }
}
