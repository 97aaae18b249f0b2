//! Parse job entity model and the job status state machine.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use flightdeck_core::types::{DatasetId, DbId, JobId, Timestamp};

/// Lifecycle states for a parse job.
///
/// Stored in Postgres as the `job_status` enum type. `Success` and
/// `Failed` are terminal: once a job reaches either, its status never
/// changes again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "job_status", rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Success,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Success | JobStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Success => "success",
            JobStatus::Failed => "failed",
        }
    }
}

/// A row from the `jobs` table.
#[derive(Debug, Clone, FromRow)]
pub struct Job {
    pub id: JobId,
    pub user_id: Option<DbId>,
    pub dataset_id: Option<DatasetId>,
    pub status: JobStatus,
    pub progress: Option<f64>,
    pub message: Option<String>,
    pub created_at: Timestamp,
    pub finished_at: Option<Timestamp>,
}

/// Job representation for `GET /jobs/{id}` responses.
///
/// Worker log lines are streamed over the job event channel only and
/// never persisted, so `logs` is always empty here.
#[derive(Debug, Clone, Serialize)]
pub struct JobResponse {
    pub id: JobId,
    pub dataset_id: Option<DatasetId>,
    pub status: JobStatus,
    pub progress: Option<f64>,
    pub message: Option<String>,
    pub logs: String,
    pub created_at: Timestamp,
    pub finished_at: Option<Timestamp>,
}

impl From<Job> for JobResponse {
    fn from(job: Job) -> Self {
        Self {
            id: job.id,
            dataset_id: job.dataset_id,
            status: job.status,
            progress: job.progress,
            message: job.message,
            logs: String::new(),
            created_at: job.created_at,
            finished_at: job.finished_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
        assert!(JobStatus::Success.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&JobStatus::Running).unwrap(),
            "\"running\""
        );
        let parsed: JobStatus = serde_json::from_str("\"failed\"").unwrap();
        assert_eq!(parsed, JobStatus::Failed);
    }
}
