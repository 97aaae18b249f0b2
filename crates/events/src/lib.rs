//! Flightdeck job event infrastructure.
//!
//! One building block lives here: [`JobEventHub`], the in-process
//! publish/subscribe hub that carries job status and log events from the
//! parse worker to WebSocket sessions. Each job gets its own channel with
//! a bounded history buffer, so a subscriber that attaches after a
//! fast-finishing job still sees what happened.

pub mod hub;

pub use hub::{JobEvent, JobEventHub, JobSubscription};
