//! Claim loop: polls for pending jobs and runs them one at a time.
//!
//! Uses `SELECT FOR UPDATE SKIP LOCKED` via [`JobRepo::claim_next`], so
//! any number of runner instances (embedded in the API process or in
//! standalone worker processes) can share the queue without
//! double-claiming.

use std::sync::Arc;

use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

use flightdeck_core::packet::schema::SchemaSet;
use flightdeck_db::repositories::JobRepo;
use flightdeck_events::JobEventHub;

use crate::config::WorkerConfig;
use crate::job::run_parse_job;

/// Long-lived parse job runner.
pub struct ParseRunner {
    pool: PgPool,
    hub: Arc<JobEventHub>,
    schema: Arc<SchemaSet>,
    config: WorkerConfig,
}

impl ParseRunner {
    pub fn new(
        pool: PgPool,
        hub: Arc<JobEventHub>,
        schema: Arc<SchemaSet>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            pool,
            hub,
            schema,
            config,
        }
    }

    /// Run the claim loop until the cancellation token is triggered.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.config.poll_interval);
        tracing::info!(
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            "Parse runner started",
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Parse runner shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.drain_queue().await {
                        tracing::error!(error = %e, "Claim cycle failed");
                    }
                }
            }
        }
    }

    /// Claim and run jobs until the queue is empty.
    async fn drain_queue(&self) -> Result<(), sqlx::Error> {
        while let Some(job) = JobRepo::claim_next(&self.pool).await? {
            tracing::info!(job_id = %job.id, "Job claimed");
            run_parse_job(&self.pool, &self.hub, &self.schema, &self.config, &job).await?;
        }
        Ok(())
    }
}
