//! Execution of a single claimed parse job.

use std::path::PathBuf;
use std::sync::Arc;

use sqlx::PgPool;

use flightdeck_core::packet::schema::SchemaSet;
use flightdeck_db::models::job::{Job, JobStatus};
use flightdeck_db::repositories::{DatasetRepo, JobRepo};
use flightdeck_events::{JobEvent, JobEventHub};

use crate::config::WorkerConfig;
use crate::parse::{parse_file_to_csv, ParseError};

/// Run one claimed job to completion.
///
/// Status is written to the database first, then mirrored onto the
/// event hub, so that a poller and a subscriber always converge on the
/// same terminal state. All failure paths mark the job failed; this
/// function only errors if the database itself is unavailable.
pub async fn run_parse_job(
    pool: &PgPool,
    hub: &Arc<JobEventHub>,
    schema: &Arc<SchemaSet>,
    config: &WorkerConfig,
    job: &Job,
) -> Result<(), sqlx::Error> {
    let Some(dataset_id) = job.dataset_id else {
        return fail(pool, hub, job, "job has no dataset").await;
    };
    let Some(dataset) = DatasetRepo::find_by_id(pool, dataset_id).await? else {
        return fail(pool, hub, job, "dataset not found").await;
    };

    tracing::info!(job_id = %job.id, dataset_id = %dataset_id, "Parse job started");
    update_status(pool, hub, job, JobStatus::Running, Some(0.0), "starting").await?;
    hub.publish(JobEvent::log(
        job.id,
        format!("parsing {}", dataset.original_filename),
        Some(0.0),
        None,
    ));

    let parsed_dir = config.parsed_dir();
    if let Err(err) = tokio::fs::create_dir_all(&parsed_dir).await {
        return fail(pool, hub, job, &format!("cannot create output dir: {err}")).await;
    }
    let csv_path: PathBuf = parsed_dir.join(format!("{dataset_id}.csv"));

    // The decode loop is pure blocking I/O; progress crosses back over
    // a channel so this task can keep the database and hub in sync.
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<(f64, u64)>();
    let raw_path = PathBuf::from(&dataset.raw_path);
    let out_path = csv_path.clone();
    let schema_task = Arc::clone(schema);
    let parse_task = tokio::task::spawn_blocking(move || {
        parse_file_to_csv(&schema_task, &raw_path, &out_path, &mut |progress, count| {
            let _ = tx.send((progress, count));
        })
    });

    while let Some((progress, count)) = rx.recv().await {
        JobRepo::set_progress(pool, job.id, progress, None).await?;
        hub.publish(JobEvent::status(
            job.id,
            JobStatus::Running.as_str(),
            Some(progress),
            Some(format!("parsed {count} packets")),
        ));
    }

    let outcome: Result<_, ParseError> = match parse_task.await {
        Ok(result) => result,
        Err(join_err) => {
            return fail(pool, hub, job, &format!("parse task panicked: {join_err}")).await;
        }
    };

    let summary = match outcome {
        Ok(summary) => summary,
        Err(err) => {
            let _ = tokio::fs::remove_file(csv_path.with_extension("csv.tmp")).await;
            return fail(pool, hub, job, &format!("parse failed: {err}")).await;
        }
    };

    update_status(pool, hub, job, JobStatus::Running, Some(95.0), "finalizing").await?;

    let columns = serde_json::json!(schema.columns());
    DatasetRepo::set_parse_result(
        pool,
        dataset_id,
        &csv_path.to_string_lossy(),
        &columns,
        summary.packet_count as i64,
    )
    .await?;

    if summary.skipped_frames > 0 {
        hub.publish(JobEvent::log(
            job.id,
            format!("skipped {} corrupt frames", summary.skipped_frames),
            None,
            None,
        ));
    }

    let message = format!("parsed {} packets", summary.packet_count);
    update_status(pool, hub, job, JobStatus::Success, Some(100.0), &message).await?;
    tracing::info!(
        job_id = %job.id,
        packet_count = summary.packet_count,
        skipped_frames = summary.skipped_frames,
        "Parse job finished",
    );
    Ok(())
}

async fn update_status(
    pool: &PgPool,
    hub: &Arc<JobEventHub>,
    job: &Job,
    status: JobStatus,
    progress: Option<f64>,
    message: &str,
) -> Result<(), sqlx::Error> {
    JobRepo::set_status(pool, job.id, status, progress, Some(message)).await?;
    hub.publish(JobEvent::status(
        job.id,
        status.as_str(),
        progress,
        Some(message.to_string()),
    ));
    Ok(())
}

async fn fail(
    pool: &PgPool,
    hub: &Arc<JobEventHub>,
    job: &Job,
    message: &str,
) -> Result<(), sqlx::Error> {
    tracing::warn!(job_id = %job.id, message, "Parse job failed");
    update_status(pool, hub, job, JobStatus::Failed, None, message).await
}
