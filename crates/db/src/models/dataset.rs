//! Dataset entity model: an uploaded serial capture and its parsed output.

use serde::Serialize;
use sqlx::FromRow;

use flightdeck_core::types::{DatasetId, DbId, Timestamp};

/// A row from the `datasets` table.
///
/// `csv_path`, `columns_json`, and `packet_count` are populated by the
/// parse worker once a parse job for the dataset succeeds.
#[derive(Debug, Clone, FromRow)]
pub struct Dataset {
    pub id: DatasetId,
    pub project_id: Option<DbId>,
    pub owner_id: Option<DbId>,
    pub name: String,
    pub original_filename: String,
    pub raw_path: String,
    pub csv_path: Option<String>,
    pub columns_json: Option<serde_json::Value>,
    pub packet_count: Option<i64>,
    pub created_at: Timestamp,
}

impl Dataset {
    /// Column names recovered from `columns_json`, empty if unparsed.
    pub fn columns(&self) -> Vec<String> {
        match &self.columns_json {
            Some(value) => serde_json::from_value(value.clone()).unwrap_or_default(),
            None => Vec::new(),
        }
    }
}

/// Dataset representation for list and detail API responses.
#[derive(Debug, Clone, Serialize)]
pub struct DatasetResponse {
    pub id: DatasetId,
    pub name: String,
    pub original_filename: String,
    pub created_at: Timestamp,
    pub parsed: bool,
    pub packet_count: Option<i64>,
}

impl From<Dataset> for DatasetResponse {
    fn from(dataset: Dataset) -> Self {
        Self {
            id: dataset.id,
            name: dataset.name,
            original_filename: dataset.original_filename,
            created_at: dataset.created_at,
            parsed: dataset.csv_path.is_some(),
            packet_count: dataset.packet_count,
        }
    }
}

/// Fields for inserting a new dataset at upload time.
#[derive(Debug)]
pub struct NewDataset {
    pub id: DatasetId,
    pub owner_id: Option<DbId>,
    pub project_id: Option<DbId>,
    pub name: String,
    pub original_filename: String,
    pub raw_path: String,
}
