//! Job status handler.
//!
//! This is the polling half of the job tracking contract: clients that
//! cannot hold a WebSocket open poll `GET /jobs/{id}` once a second and
//! receive exactly the same fields the socket pushes.

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use flightdeck_core::types::JobId;
use flightdeck_db::models::job::JobResponse;
use flightdeck_db::repositories::JobRepo;
use flightdeck_events::JobEvent;

use crate::error::{not_found, AppResult};
use crate::middleware::AuthUser;
use crate::state::AppState;

/// GET /jobs/{id} -- current status snapshot for a job.
pub async fn get_job(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<JobId>,
) -> AppResult<Json<JobResponse>> {
    let job = JobRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found("job", id))?;
    Ok(Json(job.into()))
}

#[derive(Debug, Serialize)]
pub struct LogDumpResponse {
    pub job_id: JobId,
    pub events: Vec<JobEvent>,
}

/// GET /jobs/{id}/logdump -- the buffered event history for a job.
///
/// Polling clients use this to catch up on progress lines they missed
/// between ticks. The buffer is bounded and in-memory, so a restarted
/// server dumps an empty list for old jobs.
pub async fn job_logdump(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<JobId>,
) -> AppResult<Json<LogDumpResponse>> {
    JobRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found("job", id))?;

    Ok(Json(LogDumpResponse {
        job_id: id,
        events: state.hub.history(id),
    }))
}
