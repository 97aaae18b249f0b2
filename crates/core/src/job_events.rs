//! WebSocket message type constants for job status streams.
//!
//! Every frame sent on `/jobs/ws/{job_id}` carries a `type` field with one
//! of these values. The tracker client treats `snapshot` and `status`
//! identically; `log` frames only refresh the log snapshot.

/// Initial state frame sent when a WebSocket subscription is accepted.
pub const MSG_TYPE_SNAPSHOT: &str = "snapshot";

/// Status/progress transition persisted to the jobs table.
pub const MSG_TYPE_STATUS: &str = "status";

/// Log line emitted during parsing. Never persisted.
pub const MSG_TYPE_LOG: &str = "log";
