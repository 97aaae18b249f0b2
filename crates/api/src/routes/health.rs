use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Overall service status.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    /// Whether the database is reachable.
    pub db_healthy: bool,
    /// Number of packet definitions loaded from the schema file.
    pub packet_schemas: usize,
    /// Whether this process runs its own parse worker.
    pub embedded_worker: bool,
}

/// GET /health -- returns service and database health.
///
/// A service with no packet definitions can accept uploads but never
/// parse them, so an empty schema set also reads as degraded.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let db_healthy = flightdeck_db::health_check(&state.pool).await.is_ok();
    let packet_schemas = state.schema.len();

    let status = if db_healthy && packet_schemas > 0 {
        "ok"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        db_healthy,
        packet_schemas,
        embedded_worker: state.config.embedded_worker,
    })
}

/// Mount health check routes at the root level.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
