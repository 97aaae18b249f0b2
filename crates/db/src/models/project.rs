//! Project and membership models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use flightdeck_core::types::{DbId, Timestamp};

/// A row from the `projects` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Project {
    pub id: DbId,
    pub name: String,
    pub created_at: Timestamp,
}

/// A row from the `project_members` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ProjectMember {
    pub id: DbId,
    pub project_id: DbId,
    pub user_id: DbId,
    pub role: String,
}

/// DTO for `POST /projects`.
#[derive(Debug, Deserialize)]
pub struct CreateProject {
    pub name: String,
}

/// DTO for `POST /projects/{id}/members`.
#[derive(Debug, Deserialize)]
pub struct AddMember {
    pub user_id: DbId,
    pub role: Option<String>,
}
