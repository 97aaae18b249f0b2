//! Parse worker: claims pending parse jobs from the database queue,
//! decodes serial captures into CSV, and streams progress over the
//! job event hub.

pub mod config;
pub mod job;
pub mod parse;
pub mod runner;

pub use config::WorkerConfig;
pub use runner::ParseRunner;
