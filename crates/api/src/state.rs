use std::sync::Arc;

use flightdeck_core::packet::schema::SchemaSet;
use flightdeck_events::JobEventHub;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: flightdeck_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Packet schema set, loaded once at startup.
    pub schema: Arc<SchemaSet>,
    /// In-process job event hub shared with the embedded parse worker.
    pub hub: Arc<JobEventHub>,
}
