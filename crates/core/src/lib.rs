//! Domain types shared across the flightdeck workspace: packet codec,
//! plot math, job event vocabulary, and the common error type.

pub mod error;
pub mod job_events;
pub mod packet;
pub mod plot;
pub mod types;

pub use error::CoreError;
