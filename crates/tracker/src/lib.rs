//! Client-side job tracking for the flight data platform.
//!
//! The server parses uploaded captures in background jobs and announces
//! progress two ways: a WebSocket push channel per job, and a plain
//! status endpoint suitable for polling. [`JobTracker`] drives one job
//! to its terminal state using the push channel when available and a
//! 1-second poll otherwise, normalizing both into a single [`JobView`]
//! and a one-shot completion notification.

pub mod client;
pub mod tracker;
pub mod types;

pub use client::{ApiClient, ClientError};
pub use tracker::{JobTracker, TrackerNotification};
pub use types::{JobStatus, JobView, StatusUpdate};
