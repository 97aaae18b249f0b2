//! Saved plot preset model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use flightdeck_core::types::{DbId, Timestamp};

/// A row from the `plot_presets` table. `config` holds the client's
/// plot request (columns, filters, downsample budget) as opaque JSON.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PlotPreset {
    pub id: DbId,
    pub owner_id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub config: serde_json::Value,
    pub created_at: Timestamp,
}

/// DTO for `POST /plots/presets`.
#[derive(Debug, Deserialize)]
pub struct CreatePreset {
    pub name: String,
    pub description: Option<String>,
    pub config: serde_json::Value,
}
