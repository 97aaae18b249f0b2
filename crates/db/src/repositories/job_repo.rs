//! Repository for the `jobs` table.
//!
//! The jobs table doubles as the work queue: the parse worker claims
//! pending rows with `FOR UPDATE SKIP LOCKED` so multiple workers never
//! double-claim a job.

use sqlx::PgPool;

use flightdeck_core::types::{DatasetId, DbId, JobId};

use crate::models::job::{Job, JobStatus};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, user_id, dataset_id, status, progress, message, created_at, finished_at";

/// Provides CRUD and queue operations for parse jobs.
pub struct JobRepo;

impl JobRepo {
    /// Create a new pending job for a dataset.
    pub async fn create(
        pool: &PgPool,
        id: JobId,
        user_id: Option<DbId>,
        dataset_id: DatasetId,
    ) -> Result<Job, sqlx::Error> {
        let query = format!(
            "INSERT INTO jobs (id, user_id, dataset_id, status)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(id)
            .bind(user_id)
            .bind(dataset_id)
            .bind(JobStatus::Pending)
            .fetch_one(pool)
            .await
    }

    /// Find a job by ID.
    pub async fn find_by_id(pool: &PgPool, id: JobId) -> Result<Option<Job>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM jobs WHERE id = $1");
        sqlx::query_as::<_, Job>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Atomically claim the oldest pending job.
    ///
    /// Uses `SELECT FOR UPDATE SKIP LOCKED` so concurrent workers each
    /// claim a distinct row or none at all.
    pub async fn claim_next(pool: &PgPool) -> Result<Option<Job>, sqlx::Error> {
        let query = format!(
            "UPDATE jobs
             SET status = $1
             WHERE id = (
                 SELECT id FROM jobs
                 WHERE status = $2
                 ORDER BY created_at ASC
                 LIMIT 1
                 FOR UPDATE SKIP LOCKED
             )
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(JobStatus::Running)
            .bind(JobStatus::Pending)
            .fetch_optional(pool)
            .await
    }

    /// Update a job's status, progress, and message in one statement.
    ///
    /// `finished_at` is stamped when the new status is terminal.
    pub async fn set_status(
        pool: &PgPool,
        id: JobId,
        status: JobStatus,
        progress: Option<f64>,
        message: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        let query = if status.is_terminal() {
            "UPDATE jobs SET status = $2, progress = COALESCE($3, progress), \
             message = COALESCE($4, message), finished_at = NOW() WHERE id = $1"
        } else {
            "UPDATE jobs SET status = $2, progress = COALESCE($3, progress), \
             message = COALESCE($4, message) WHERE id = $1"
        };
        sqlx::query(query)
            .bind(id)
            .bind(status)
            .bind(progress)
            .bind(message)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Update only the progress figure of a running job.
    pub async fn set_progress(
        pool: &PgPool,
        id: JobId,
        progress: f64,
        message: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE jobs SET progress = $2, message = COALESCE($3, message) WHERE id = $1",
        )
        .bind(id)
        .bind(progress)
        .bind(message)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Whether a dataset already has a pending or running parse job.
    pub async fn active_for_dataset(
        pool: &PgPool,
        dataset_id: DatasetId,
    ) -> Result<bool, sqlx::Error> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM jobs WHERE dataset_id = $1 AND status IN ($2, $3)",
        )
        .bind(dataset_id)
        .bind(JobStatus::Pending)
        .bind(JobStatus::Running)
        .fetch_one(pool)
        .await?;
        Ok(row.0 > 0)
    }
}
