//! Per-job WebSocket endpoint.
//!
//! This is the push half of the job tracking contract. On connect the
//! server sends one snapshot frame built from the database row, then
//! forwards hub events for the job until the client disconnects. A
//! subscription replays recent history, so a client that attaches
//! after a fast-finishing job still receives its terminal event.

use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};

use flightdeck_core::types::JobId;
use flightdeck_db::repositories::JobRepo;
use flightdeck_events::JobEvent;

use crate::middleware::AuthUser;
use crate::state::AppState;

/// GET /jobs/ws/{id} -- upgrade and stream job events.
pub async fn job_ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    _user: AuthUser,
    Path(job_id): Path<JobId>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, job_id))
}

/// Manage a single job subscription after upgrade.
async fn handle_socket(mut socket: WebSocket, state: AppState, job_id: JobId) {
    let job = match JobRepo::find_by_id(&state.pool, job_id).await {
        Ok(Some(job)) => job,
        Ok(None) => {
            tracing::debug!(job_id = %job_id, "WebSocket for unknown job rejected");
            let _ = socket
                .send(Message::Close(Some(CloseFrame {
                    code: close_code::POLICY,
                    reason: "unknown job".into(),
                })))
                .await;
            return;
        }
        Err(e) => {
            tracing::error!(job_id = %job_id, error = %e, "Job lookup failed on WebSocket connect");
            let _ = socket
                .send(Message::Close(Some(CloseFrame {
                    code: close_code::ERROR,
                    reason: "internal error".into(),
                })))
                .await;
            return;
        }
    };

    tracing::info!(job_id = %job_id, "Job WebSocket connected");

    // Subscribe before the snapshot so no event published in between is
    // lost; duplicates are fine, the client applies updates idempotently.
    let mut subscription = state.hub.subscribe(job_id);

    let snapshot = JobEvent::snapshot(
        job_id,
        job.status.as_str(),
        job.progress.unwrap_or(0.0),
        job.message.clone().unwrap_or_default(),
    );

    let (mut sink, mut stream) = socket.split();

    if let Ok(text) = serde_json::to_string(&snapshot) {
        if sink.send(Message::Text(text.into())).await.is_err() {
            return;
        }
    }

    // Sender task: forward hub events to the WebSocket sink.
    let send_task = tokio::spawn(async move {
        while let Some(event) = subscription.recv().await {
            let Ok(text) = serde_json::to_string(&event) else {
                continue;
            };
            if sink.send(Message::Text(text.into())).await.is_err() {
                tracing::debug!(job_id = %job_id, "Job WebSocket sink closed");
                break;
            }
        }
    });

    // Receiver loop: the client sends nothing meaningful; watch for close.
    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(job_id = %job_id, error = %e, "Job WebSocket receive error");
                break;
            }
        }
    }

    send_task.abort();
    tracing::info!(job_id = %job_id, "Job WebSocket disconnected");
}
