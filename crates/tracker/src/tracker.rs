//! The job tracker: drives one parse job to a terminal state.
//!
//! A call to [`JobTracker::track`] starts a tracking session as a single
//! tokio task. The session first tries the push channel
//! (`/jobs/ws/{job_id}`); if the socket cannot be opened, or closes
//! before a terminal status arrives, it falls back to polling
//! `GET /jobs/{job_id}` once per second. Both transports feed the same
//! apply/terminal-detection path, so the overwrite rule and the one-shot
//! completion side effects live in a single place.
//!
//! Exactly one session is live per tracker. Starting a new session tears
//! the previous one down first, and every state write is guarded by a
//! session generation so a superseded session can never mutate tracker
//! state, even if its task has not yet observed the cancellation.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use flightdeck_core::types::{DatasetId, JobId};

use crate::client::{ApiClient, DatasetSummary};
use crate::types::{JobStatus, JobView, StatusUpdate};

/// Fixed fallback polling period.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Shown when a job fails without a server-provided message.
pub const DEFAULT_FAILURE_MESSAGE: &str = "job failed";

/// One-shot completion notification, sent exactly once per session that
/// reaches a terminal state.
#[derive(Debug)]
pub enum TrackerNotification {
    /// The job succeeded; carries the freshly fetched dependent data.
    Success {
        job_id: JobId,
        dataset_id: DatasetId,
        columns: Vec<String>,
        datasets: Vec<DatasetSummary>,
    },
    /// The job failed; `message` is the last server message or
    /// [`DEFAULT_FAILURE_MESSAGE`].
    Failure { job_id: JobId, message: String },
}

struct Shared {
    generation: u64,
    view: JobView,
}

struct SessionHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Tracks one job at a time against a flight data server.
pub struct JobTracker {
    client: Arc<ApiClient>,
    poll_interval: Duration,
    shared: Arc<Mutex<Shared>>,
    notify: mpsc::UnboundedSender<TrackerNotification>,
    session: Mutex<Option<SessionHandle>>,
}

impl JobTracker {
    /// Create a tracker and the receiver for its completion
    /// notifications.
    pub fn new(client: Arc<ApiClient>) -> (Self, mpsc::UnboundedReceiver<TrackerNotification>) {
        Self::with_poll_interval(client, POLL_INTERVAL)
    }

    /// Create a tracker with a custom polling period (tests shorten it).
    pub fn with_poll_interval(
        client: Arc<ApiClient>,
        poll_interval: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<TrackerNotification>) {
        let (notify, notifications) = mpsc::unbounded_channel();
        let tracker = Self {
            client,
            poll_interval,
            shared: Arc::new(Mutex::new(Shared {
                generation: 0,
                view: JobView::default(),
            })),
            notify,
            session: Mutex::new(None),
        };
        (tracker, notifications)
    }

    /// The job as last reported by the server.
    pub fn current(&self) -> JobView {
        self.shared.lock().expect("state lock poisoned").view.clone()
    }

    /// Start tracking a job, tearing down any previous session first.
    ///
    /// Resets the local view to its pending defaults before the new
    /// session produces its first update.
    pub fn track(&self, job_id: JobId, dataset_id: DatasetId) {
        self.stop();

        let generation = {
            let mut shared = self.shared.lock().expect("state lock poisoned");
            shared.generation += 1;
            shared.view = JobView::default();
            shared.generation
        };

        let cancel = CancellationToken::new();
        let session = Session {
            client: Arc::clone(&self.client),
            job_id,
            dataset_id,
            shared: Arc::clone(&self.shared),
            generation,
            notify: self.notify.clone(),
            poll_interval: self.poll_interval,
            finished: false,
        };

        let session_cancel = cancel.clone();
        let task = tokio::spawn(async move {
            tokio::select! {
                _ = session_cancel.cancelled() => {}
                _ = session.run() => {}
            }
        });

        *self.session.lock().expect("session lock poisoned") =
            Some(SessionHandle { cancel, task });
        tracing::debug!(%job_id, %dataset_id, "Tracking session started");
    }

    /// Tear down the live session, if any. Safe to call repeatedly.
    pub fn stop(&self) {
        if let Some(session) = self
            .session
            .lock()
            .expect("session lock poisoned")
            .take()
        {
            session.cancel.cancel();
            session.task.abort();
        }
    }
}

impl Drop for JobTracker {
    fn drop(&mut self) {
        self.stop();
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Why a transport stopped feeding updates.
enum Feed {
    /// A terminal status was observed and handled.
    Terminal,
    /// A newer session owns the state now.
    Superseded,
    /// The channel ended without a terminal status.
    Exhausted,
}

struct Session {
    client: Arc<ApiClient>,
    job_id: JobId,
    dataset_id: DatasetId,
    shared: Arc<Mutex<Shared>>,
    generation: u64,
    notify: mpsc::UnboundedSender<TrackerNotification>,
    poll_interval: Duration,
    finished: bool,
}

impl Session {
    async fn run(mut self) {
        match self.run_push().await {
            Feed::Terminal | Feed::Superseded => return,
            Feed::Exhausted => {}
        }
        self.run_poll().await;
    }

    /// Push path: consume the job WebSocket until it closes or a
    /// terminal status arrives.
    async fn run_push(&mut self) -> Feed {
        let mut stream = match self.client.connect_job_ws(self.job_id).await {
            Ok(stream) => stream,
            Err(e) => {
                tracing::debug!(
                    job_id = %self.job_id,
                    error = %e,
                    "Push channel unavailable, falling back to polling",
                );
                return Feed::Exhausted;
            }
        };

        while let Some(frame) = stream.next().await {
            let text = match frame {
                Ok(Message::Text(text)) => text,
                Ok(Message::Close(_)) | Err(_) => break,
                Ok(_) => continue,
            };
            // Malformed payloads are ignored without touching state.
            let Some(update) = StatusUpdate::parse(&text) else {
                continue;
            };
            match self.handle_update(update).await {
                Feed::Exhausted => {}
                outcome => return outcome,
            }
        }
        Feed::Exhausted
    }

    /// Fallback path: fixed-period polling of the status endpoint.
    /// Failed ticks are skipped silently; the next tick tries again.
    async fn run_poll(&mut self) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let update = match self.client.job_status(self.job_id).await {
                Ok(update) => update,
                Err(e) => {
                    tracing::debug!(job_id = %self.job_id, error = %e, "Poll tick failed");
                    continue;
                }
            };
            match self.handle_update(update).await {
                Feed::Exhausted => {}
                _ => return,
            }
        }
    }

    /// Apply one update and run terminal handling when warranted.
    async fn handle_update(&mut self, update: StatusUpdate) -> Feed {
        if !self.apply(&update) {
            return Feed::Superseded;
        }
        if let Some(status) = update.terminal_status() {
            self.finish(status).await;
            return Feed::Terminal;
        }
        Feed::Exhausted
    }

    /// Overwrite the shared view. Returns false when this session has
    /// been superseded, in which case nothing was written.
    fn apply(&self, update: &StatusUpdate) -> bool {
        let mut shared = self.shared.lock().expect("state lock poisoned");
        if shared.generation != self.generation {
            return false;
        }
        shared.view.apply(update);
        true
    }

    /// Completion side effects, at most once per session.
    ///
    /// On success the dependent columns are fetched and the dataset list
    /// refreshed before the notification fires. Failures of those
    /// fetches degrade to empty payloads rather than suppressing the
    /// notification.
    async fn finish(&mut self, status: JobStatus) {
        if self.finished {
            return;
        }
        self.finished = true;

        match status {
            JobStatus::Success => {
                let columns = self
                    .client
                    .dataset_columns(self.dataset_id)
                    .await
                    .unwrap_or_else(|e| {
                        tracing::warn!(dataset_id = %self.dataset_id, error = %e, "Column fetch failed");
                        Vec::new()
                    });
                let datasets = self.client.list_datasets().await.unwrap_or_else(|e| {
                    tracing::warn!(error = %e, "Dataset list refresh failed");
                    Vec::new()
                });
                let _ = self.notify.send(TrackerNotification::Success {
                    job_id: self.job_id,
                    dataset_id: self.dataset_id,
                    columns,
                    datasets,
                });
            }
            JobStatus::Failed => {
                let message = {
                    let shared = self.shared.lock().expect("state lock poisoned");
                    let last = shared.view.message.trim();
                    if last.is_empty() {
                        DEFAULT_FAILURE_MESSAGE.to_string()
                    } else {
                        last.to_string()
                    }
                };
                let _ = self.notify.send(TrackerNotification::Failure {
                    job_id: self.job_id,
                    message,
                });
            }
            JobStatus::Pending | JobStatus::Running => {}
        }
        tracing::debug!(job_id = %self.job_id, ?status, "Tracking session finished");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stop_is_idempotent() {
        let client = Arc::new(ApiClient::new("http://127.0.0.1:1"));
        let (tracker, _notifications) = JobTracker::new(client);
        tracker.stop();
        tracker.stop();
        assert_eq!(tracker.current(), JobView::default());
    }

    #[tokio::test]
    async fn track_resets_the_view() {
        let client = Arc::new(ApiClient::new("http://127.0.0.1:1"));
        client.set_token("test");
        let (tracker, _notifications) = JobTracker::new(client);

        {
            let mut shared = tracker.shared.lock().unwrap();
            shared.view.status = JobStatus::Running;
            shared.view.progress = 55.0;
        }

        tracker.track(uuid::Uuid::new_v4(), uuid::Uuid::new_v4());
        assert_eq!(tracker.current(), JobView::default());
        tracker.stop();
    }

    #[tokio::test]
    async fn superseded_session_cannot_write() {
        let client = Arc::new(ApiClient::new("http://127.0.0.1:1"));
        let (tracker, _notifications) = JobTracker::new(client.clone());

        let stale = Session {
            client,
            job_id: uuid::Uuid::new_v4(),
            dataset_id: uuid::Uuid::new_v4(),
            shared: Arc::clone(&tracker.shared),
            generation: 0,
            notify: tracker.notify.clone(),
            poll_interval: POLL_INTERVAL,
            finished: false,
        };

        tracker.track(uuid::Uuid::new_v4(), uuid::Uuid::new_v4());

        let update = StatusUpdate {
            status: Some(JobStatus::Running),
            progress: Some(99.0),
            ..Default::default()
        };
        assert!(!stale.apply(&update));
        assert_eq!(tracker.current(), JobView::default());
        tracker.stop();
    }
}
