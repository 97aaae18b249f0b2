//! Client-side view of a server job and the update payloads that mutate it.

use serde::{Deserialize, Serialize};

/// Job lifecycle states as reported by the server.
///
/// The server is authoritative; the tracker only reads these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Success,
    Failed,
}

impl JobStatus {
    /// Whether no further transitions are expected.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Success | JobStatus::Failed)
    }
}

/// The tracked job as last reported by the server.
///
/// All fields are overwritten wholesale by each update; `logs` in
/// particular is a replaced snapshot, not an append log.
#[derive(Debug, Clone, PartialEq)]
pub struct JobView {
    pub status: JobStatus,
    pub progress: f64,
    pub message: String,
    pub logs: String,
}

impl Default for JobView {
    fn default() -> Self {
        Self {
            status: JobStatus::Pending,
            progress: 0.0,
            message: String::new(),
            logs: String::new(),
        }
    }
}

impl JobView {
    /// Overwrite the fields an update carries; absent fields keep their
    /// previous value.
    pub fn apply(&mut self, update: &StatusUpdate) {
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(progress) = update.progress {
            self.progress = progress;
        }
        if let Some(message) = &update.message {
            self.message = message.clone();
        }
        if let Some(logs) = &update.logs {
            self.logs = logs.clone();
        }
    }
}

/// One status payload, from either transport.
///
/// The poll endpoint returns the full job row (`status`, `progress`,
/// `message`, `logs`); push frames carry the same fields but may omit
/// any of them (log-only frames name the text `log`). Both decode into
/// this one shape so the overwrite rule lives in a single place.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusUpdate {
    pub status: Option<JobStatus>,
    pub progress: Option<f64>,
    pub message: Option<String>,
    #[serde(default, alias = "log")]
    pub logs: Option<String>,
}

impl StatusUpdate {
    /// Decode a push frame. Malformed payloads yield `None` and must be
    /// ignored by the caller.
    pub fn parse(text: &str) -> Option<Self> {
        serde_json::from_str(text).ok()
    }

    /// Whether this update reports a terminal status.
    pub fn terminal_status(&self) -> Option<JobStatus> {
        self.status.filter(|s| s.is_terminal())
    }
}
