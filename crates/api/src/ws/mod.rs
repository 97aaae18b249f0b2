//! WebSocket endpoints.

pub mod jobs;

pub use jobs::job_ws_handler;
