//! Per-job publish/subscribe hub with bounded history replay.
//!
//! Unlike a single global broadcast channel, each job id gets its own
//! channel so a WebSocket session scoped to one job never has to filter
//! other jobs' traffic. Publishing with no subscribers only appends to
//! history; per-job state is dropped when the last subscriber leaves.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use flightdeck_core::job_events::{MSG_TYPE_LOG, MSG_TYPE_SNAPSHOT, MSG_TYPE_STATUS};
use flightdeck_core::types::JobId;

/// Default per-job history buffer size.
const DEFAULT_HISTORY_SIZE: usize = 500;

/// Per-job broadcast channel capacity.
const CHANNEL_CAPACITY: usize = 1000;

// ---------------------------------------------------------------------------
// JobEvent
// ---------------------------------------------------------------------------

/// One event on a job's status stream.
///
/// Serialized verbatim as the WebSocket text frame. `kind` is one of the
/// `MSG_TYPE_*` constants; absent optional fields are omitted from the
/// JSON, matching the status-endpoint response shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobEvent {
    pub job_id: JobId,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ts: Option<DateTime<Utc>>,
}

impl JobEvent {
    /// A status transition event.
    pub fn status(
        job_id: JobId,
        status: impl Into<String>,
        progress: Option<f64>,
        message: Option<String>,
    ) -> Self {
        Self {
            job_id,
            kind: MSG_TYPE_STATUS.to_string(),
            status: Some(status.into()),
            progress,
            message,
            log: None,
            ts: None,
        }
    }

    /// An initial-state snapshot sent when a subscription is accepted.
    pub fn snapshot(
        job_id: JobId,
        status: impl Into<String>,
        progress: f64,
        message: impl Into<String>,
    ) -> Self {
        Self {
            job_id,
            kind: MSG_TYPE_SNAPSHOT.to_string(),
            status: Some(status.into()),
            progress: Some(progress),
            message: Some(message.into()),
            log: None,
            ts: None,
        }
    }

    /// A log line. Carried on the stream only, never persisted.
    pub fn log(
        job_id: JobId,
        text: impl Into<String>,
        progress: Option<f64>,
        message: Option<String>,
    ) -> Self {
        Self {
            job_id,
            kind: MSG_TYPE_LOG.to_string(),
            status: None,
            progress,
            message,
            log: Some(text.into()),
            ts: Some(Utc::now()),
        }
    }
}

// ---------------------------------------------------------------------------
// JobEventHub
// ---------------------------------------------------------------------------

struct JobChannel {
    sender: broadcast::Sender<JobEvent>,
    history: VecDeque<JobEvent>,
    subscribers: usize,
}

impl JobChannel {
    fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            sender,
            history: VecDeque::new(),
            subscribers: 0,
        }
    }
}

/// In-process fan-out hub for job events, keyed by job id.
///
/// Designed to be shared via `Arc<JobEventHub>` between the API server
/// and the embedded parse worker. The internal mutex is only ever held
/// for map/queue operations, never across an await point.
pub struct JobEventHub {
    channels: Mutex<HashMap<JobId, JobChannel>>,
    history_size: usize,
}

impl JobEventHub {
    pub fn new(history_size: usize) -> Self {
        Self {
            channels: Mutex::new(HashMap::new()),
            history_size,
        }
    }

    /// Publish an event on the job's stream.
    ///
    /// The event is appended to the job's bounded history (oldest entries
    /// evicted first) and fanned out to live subscribers, if any.
    pub fn publish(&self, event: JobEvent) {
        let mut channels = self.channels.lock().expect("hub lock poisoned");
        let channel = channels.entry(event.job_id).or_insert_with(JobChannel::new);

        if channel.history.len() >= self.history_size {
            channel.history.pop_front();
        }
        channel.history.push_back(event.clone());

        // SendError only means there are zero live receivers.
        let _ = channel.sender.send(event);
    }

    /// Subscribe to a job's stream.
    ///
    /// The returned subscription starts with a replay of the job's
    /// history, then yields live events. Dropping it releases the per-job
    /// state once no other subscribers remain.
    pub fn subscribe(self: &Arc<Self>, job_id: JobId) -> JobSubscription {
        let mut channels = self.channels.lock().expect("hub lock poisoned");
        let channel = channels.entry(job_id).or_insert_with(JobChannel::new);
        channel.subscribers += 1;

        JobSubscription {
            replay: channel.history.iter().cloned().collect(),
            receiver: channel.sender.subscribe(),
            hub: Arc::clone(self),
            job_id,
        }
    }

    /// Copy of the job's buffered history without subscribing.
    ///
    /// Serves one-shot history dumps for polling clients that never open
    /// the WebSocket.
    pub fn history(&self, job_id: JobId) -> Vec<JobEvent> {
        self.channels
            .lock()
            .expect("hub lock poisoned")
            .get(&job_id)
            .map(|c| c.history.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of live subscribers for a job (used by tests and metrics
    /// logging).
    pub fn subscriber_count(&self, job_id: JobId) -> usize {
        self.channels
            .lock()
            .expect("hub lock poisoned")
            .get(&job_id)
            .map(|c| c.subscribers)
            .unwrap_or(0)
    }

    fn release(&self, job_id: JobId) {
        let mut channels = self.channels.lock().expect("hub lock poisoned");
        if let Some(channel) = channels.get_mut(&job_id) {
            channel.subscribers = channel.subscribers.saturating_sub(1);
            if channel.subscribers == 0 {
                channels.remove(&job_id);
            }
        }
    }
}

impl Default for JobEventHub {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_SIZE)
    }
}

// ---------------------------------------------------------------------------
// JobSubscription
// ---------------------------------------------------------------------------

/// A live subscription to one job's event stream.
pub struct JobSubscription {
    replay: VecDeque<JobEvent>,
    receiver: broadcast::Receiver<JobEvent>,
    hub: Arc<JobEventHub>,
    job_id: JobId,
}

impl JobSubscription {
    /// Receive the next event: buffered history first, then live events.
    ///
    /// Returns `None` once the stream is closed. A lagged receiver skips
    /// the dropped events and keeps going rather than erroring out.
    pub async fn recv(&mut self) -> Option<JobEvent> {
        if let Some(event) = self.replay.pop_front() {
            return Some(event);
        }
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(job_id = %self.job_id, skipped, "Job event subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

impl Drop for JobSubscription {
    fn drop(&mut self) {
        self.hub.release(self.job_id);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[tokio::test]
    async fn subscriber_receives_published_event() {
        let hub = Arc::new(JobEventHub::default());
        let job_id = Uuid::new_v4();

        let mut sub = hub.subscribe(job_id);
        hub.publish(JobEvent::status(job_id, "running", Some(40.0), None));

        let event = sub.recv().await.expect("event should arrive");
        assert_eq!(event.status.as_deref(), Some("running"));
        assert_eq!(event.progress, Some(40.0));
    }

    #[tokio::test]
    async fn late_subscriber_gets_history_replay() {
        let hub = Arc::new(JobEventHub::default());
        let job_id = Uuid::new_v4();

        hub.publish(JobEvent::log(job_id, "Parsing started", Some(0.0), None));
        hub.publish(JobEvent::status(job_id, "success", Some(100.0), None));

        // Subscribe after the job already finished.
        let mut sub = hub.subscribe(job_id);
        let first = sub.recv().await.unwrap();
        let second = sub.recv().await.unwrap();

        assert_eq!(first.log.as_deref(), Some("Parsing started"));
        assert_eq!(second.status.as_deref(), Some("success"));
    }

    #[tokio::test]
    async fn history_is_bounded() {
        let hub = Arc::new(JobEventHub::new(3));
        let job_id = Uuid::new_v4();

        for i in 0..10 {
            hub.publish(JobEvent::log(job_id, format!("line {i}"), None, None));
        }

        let mut sub = hub.subscribe(job_id);
        let first = sub.recv().await.unwrap();
        // Only the newest three survive.
        assert_eq!(first.log.as_deref(), Some("line 7"));
    }

    #[test]
    fn history_returns_buffer_without_subscribing() {
        let hub = Arc::new(JobEventHub::default());
        let job_id = Uuid::new_v4();

        hub.publish(JobEvent::log(job_id, "Parsing started", Some(0.0), None));
        hub.publish(JobEvent::status(job_id, "running", Some(10.0), None));

        let events = hub.history(job_id);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].log.as_deref(), Some("Parsing started"));
        assert_eq!(hub.subscriber_count(job_id), 0);

        assert!(hub.history(Uuid::new_v4()).is_empty());
    }

    #[tokio::test]
    async fn jobs_are_isolated() {
        let hub = Arc::new(JobEventHub::default());
        let job_a = Uuid::new_v4();
        let job_b = Uuid::new_v4();

        let mut sub_a = hub.subscribe(job_a);
        hub.publish(JobEvent::status(job_b, "failed", None, None));
        hub.publish(JobEvent::status(job_a, "running", None, None));

        let event = sub_a.recv().await.unwrap();
        assert_eq!(event.job_id, job_a);
        assert_eq!(event.status.as_deref(), Some("running"));
    }

    #[tokio::test]
    async fn dropping_last_subscriber_releases_job_state() {
        let hub = Arc::new(JobEventHub::default());
        let job_id = Uuid::new_v4();

        let sub1 = hub.subscribe(job_id);
        let sub2 = hub.subscribe(job_id);
        assert_eq!(hub.subscriber_count(job_id), 2);

        drop(sub1);
        assert_eq!(hub.subscriber_count(job_id), 1);

        drop(sub2);
        assert_eq!(hub.subscriber_count(job_id), 0);

        // History is gone with the channel.
        let mut fresh = hub.subscribe(job_id);
        hub.publish(JobEvent::status(job_id, "pending", None, None));
        let event = fresh.recv().await.unwrap();
        assert_eq!(event.status.as_deref(), Some("pending"));
    }

    #[test]
    fn publish_with_no_subscribers_does_not_panic() {
        let hub = JobEventHub::default();
        hub.publish(JobEvent::status(Uuid::new_v4(), "running", None, None));
    }

    #[test]
    fn log_events_serialize_without_empty_fields() {
        let event = JobEvent::log(Uuid::new_v4(), "hello", None, None);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "log");
        assert_eq!(json["log"], "hello");
        assert!(json.get("status").is_none());
        assert!(json.get("progress").is_none());
    }
}
