//! Repository for the `datasets` table.

use sqlx::PgPool;

use flightdeck_core::types::{DatasetId, DbId};

use crate::models::dataset::{Dataset, NewDataset};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, project_id, owner_id, name, original_filename, \
                       raw_path, csv_path, columns_json, packet_count, created_at";

/// Provides CRUD operations for datasets.
pub struct DatasetRepo;

impl DatasetRepo {
    /// Insert a freshly uploaded dataset, returning the created row.
    pub async fn create(pool: &PgPool, input: &NewDataset) -> Result<Dataset, sqlx::Error> {
        let query = format!(
            "INSERT INTO datasets (id, owner_id, project_id, name, original_filename, raw_path)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Dataset>(&query)
            .bind(input.id)
            .bind(input.owner_id)
            .bind(input.project_id)
            .bind(&input.name)
            .bind(&input.original_filename)
            .bind(&input.raw_path)
            .fetch_one(pool)
            .await
    }

    /// Find a dataset by ID.
    pub async fn find_by_id(pool: &PgPool, id: DatasetId) -> Result<Option<Dataset>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM datasets WHERE id = $1");
        sqlx::query_as::<_, Dataset>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List all datasets, newest first.
    pub async fn list(pool: &PgPool) -> Result<Vec<Dataset>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM datasets ORDER BY created_at DESC");
        sqlx::query_as::<_, Dataset>(&query).fetch_all(pool).await
    }

    /// List datasets belonging to a project, newest first.
    pub async fn list_by_project(
        pool: &PgPool,
        project_id: DbId,
    ) -> Result<Vec<Dataset>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM datasets WHERE project_id = $1 ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, Dataset>(&query)
            .bind(project_id)
            .fetch_all(pool)
            .await
    }

    /// Record the output of a successful parse.
    pub async fn set_parse_result(
        pool: &PgPool,
        id: DatasetId,
        csv_path: &str,
        columns: &serde_json::Value,
        packet_count: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE datasets SET csv_path = $2, columns_json = $3, packet_count = $4 WHERE id = $1",
        )
        .bind(id)
        .bind(csv_path)
        .bind(columns)
        .bind(packet_count)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Delete a dataset row. Jobs referencing it cascade.
    ///
    /// Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DatasetId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM datasets WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
