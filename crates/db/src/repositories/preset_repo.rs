//! Repository for the `plot_presets` table.

use sqlx::PgPool;

use flightdeck_core::types::DbId;

use crate::models::preset::{CreatePreset, PlotPreset};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, owner_id, name, description, config, created_at";

/// Provides CRUD operations for saved plot presets.
pub struct PresetRepo;

impl PresetRepo {
    /// Insert a new preset owned by `owner_id`.
    pub async fn create(
        pool: &PgPool,
        owner_id: DbId,
        input: &CreatePreset,
    ) -> Result<PlotPreset, sqlx::Error> {
        let query = format!(
            "INSERT INTO plot_presets (owner_id, name, description, config)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, PlotPreset>(&query)
            .bind(owner_id)
            .bind(&input.name)
            .bind(&input.description)
            .bind(&input.config)
            .fetch_one(pool)
            .await
    }

    /// List presets owned by a user, newest first.
    pub async fn list_by_owner(
        pool: &PgPool,
        owner_id: DbId,
    ) -> Result<Vec<PlotPreset>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM plot_presets WHERE owner_id = $1 ORDER BY created_at DESC");
        sqlx::query_as::<_, PlotPreset>(&query)
            .bind(owner_id)
            .fetch_all(pool)
            .await
    }

    /// Delete a preset if it belongs to `owner_id`.
    ///
    /// Returns `true` if a row was removed.
    pub async fn delete_owned(
        pool: &PgPool,
        id: DbId,
        owner_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM plot_presets WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
