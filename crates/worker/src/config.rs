//! Worker configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Default polling interval for the claim loop.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Runtime configuration for the parse worker.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Root directory for uploaded and parsed files.
    pub data_root: PathBuf,
    /// Path to the packet schema JSON file.
    pub schema_file: PathBuf,
    /// How often to poll for pending jobs.
    pub poll_interval: Duration,
}

impl WorkerConfig {
    /// Read configuration from `DATA_ROOT` and `SCHEMA_FILE`, falling
    /// back to repo-relative defaults.
    pub fn from_env() -> Self {
        let data_root = env::var("DATA_ROOT").unwrap_or_else(|_| "./data".into());
        let schema_file = env::var("SCHEMA_FILE").unwrap_or_else(|_| "packet_schema.json".into());
        Self {
            data_root: PathBuf::from(data_root),
            schema_file: PathBuf::from(schema_file),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Directory for parsed CSV output.
    pub fn parsed_dir(&self) -> PathBuf {
        self.data_root.join("parsed")
    }

    /// Directory for raw uploads.
    pub fn uploads_dir(&self) -> PathBuf {
        self.data_root.join("uploads")
    }
}
