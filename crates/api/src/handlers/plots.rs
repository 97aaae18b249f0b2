//! Plot data handlers: single-dataset series, multi-dataset overlays,
//! and saved presets.

use std::path::PathBuf;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

use flightdeck_core::error::CoreError;
use flightdeck_core::plot::{Axis, Filter};
use flightdeck_core::types::{DatasetId, DbId};
use flightdeck_db::models::preset::{CreatePreset, PlotPreset};
use flightdeck_db::repositories::{DatasetRepo, PresetRepo};

use crate::error::{not_found, AppError, AppResult};
use crate::middleware::AuthUser;
use crate::series::{load_traces, DownsampleMethod, SeriesError, Trace, DEFAULT_MAX_POINTS};
use crate::state::AppState;

/// Query parameters for GET /plots/plot.
///
/// Query-string based (rather than a JSON body) so the SPA can open the
/// plot in a new tab; `filters` is a URL-encoded JSON array of
/// `{col, op, value}` objects.
#[derive(Debug, Deserialize)]
pub struct PlotQuery {
    pub dataset_id: DatasetId,
    pub x_col: String,
    /// Comma-separated list of column names.
    pub y_cols: String,
    #[serde(default)]
    pub method: DownsampleMethod,
    pub max_points: Option<usize>,
    pub filters: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PlotResponse {
    pub x_col: String,
    pub traces: Vec<Trace>,
}

/// GET /plots/plot -- downsampled series for one dataset.
pub async fn plot(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(query): Query<PlotQuery>,
) -> AppResult<Json<PlotResponse>> {
    let csv_path = parsed_csv_path(&state, query.dataset_id).await?;

    let y_cols = split_columns(&query.y_cols)?;
    let filters = parse_filters(query.filters.as_deref())?;
    let max_points = query.max_points.unwrap_or(DEFAULT_MAX_POINTS);

    let traces = run_load(csv_path, query.x_col.clone(), y_cols, filters, query.method, max_points)
        .await?;

    Ok(Json(PlotResponse {
        x_col: query.x_col,
        traces,
    }))
}

/// One series of an overlay: a column from one dataset, drawn against
/// the shared X column on the primary or secondary Y axis.
#[derive(Debug, Deserialize)]
pub struct OverlaySeries {
    pub dataset_id: DatasetId,
    pub y_col: String,
    /// Legend name; defaults to `<dataset>: <column>`.
    pub label: Option<String>,
    #[serde(default)]
    pub axis: Axis,
    #[serde(default)]
    pub filters: Vec<Filter>,
}

#[derive(Debug, Deserialize)]
pub struct OverlayRequest {
    pub x_col: String,
    pub series: Vec<OverlaySeries>,
    #[serde(default)]
    pub method: DownsampleMethod,
    pub max_points: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct OverlayTrace {
    pub name: String,
    pub axis: Axis,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

#[derive(Debug, Serialize)]
pub struct OverlayResponse {
    pub x_col: String,
    pub traces: Vec<OverlayTrace>,
}

/// POST /plots/overlay -- one trace per requested series, possibly
/// spanning several datasets. Each trace carries its axis assignment so
/// the client can set up a secondary Y axis.
pub async fn overlay(
    State(state): State<AppState>,
    _user: AuthUser,
    Json(body): Json<OverlayRequest>,
) -> AppResult<Json<OverlayResponse>> {
    if body.series.is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "series must not be empty".into(),
        )));
    }
    let max_points = body.max_points.unwrap_or(DEFAULT_MAX_POINTS);

    let mut traces = Vec::new();
    for series in &body.series {
        let dataset = DatasetRepo::find_by_id(&state.pool, series.dataset_id)
            .await?
            .ok_or_else(|| not_found("dataset", series.dataset_id))?;
        let csv_path = dataset.csv_path.clone().ok_or_else(|| {
            AppError::Core(CoreError::Validation(format!(
                "dataset {} has not been parsed yet",
                dataset.name
            )))
        })?;

        let loaded = run_load(
            PathBuf::from(csv_path),
            body.x_col.clone(),
            vec![series.y_col.clone()],
            series.filters.clone(),
            body.method,
            max_points,
        )
        .await?;

        let name = series
            .label
            .clone()
            .unwrap_or_else(|| format!("{}: {}", dataset.name, series.y_col));
        traces.extend(loaded.into_iter().map(|trace| OverlayTrace {
            name: name.clone(),
            axis: series.axis,
            x: trace.x,
            y: trace.y,
        }));
    }

    Ok(Json(OverlayResponse {
        x_col: body.x_col,
        traces,
    }))
}

// ---------------------------------------------------------------------------
// Presets
// ---------------------------------------------------------------------------

/// GET /plots/presets -- the caller's saved presets.
pub async fn list_presets(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<Vec<PlotPreset>>> {
    let presets = PresetRepo::list_by_owner(&state.pool, user.user_id).await?;
    Ok(Json(presets))
}

/// POST /plots/presets -- save a preset.
pub async fn create_preset(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<CreatePreset>,
) -> AppResult<Json<PlotPreset>> {
    if body.name.trim().is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "preset name must not be empty".into(),
        )));
    }
    let preset = PresetRepo::create(&state.pool, user.user_id, &body).await?;
    Ok(Json(preset))
}

/// DELETE /plots/presets/{id} -- remove one of the caller's presets.
pub async fn delete_preset(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<serde_json::Value>> {
    let removed = PresetRepo::delete_owned(&state.pool, id, user.user_id).await?;
    if !removed {
        return Err(not_found("preset", id));
    }
    Ok(Json(json!({ "ok": true })))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn parsed_csv_path(state: &AppState, dataset_id: DatasetId) -> AppResult<PathBuf> {
    let dataset = DatasetRepo::find_by_id(&state.pool, dataset_id)
        .await?
        .ok_or_else(|| not_found("dataset", dataset_id))?;
    let csv_path = dataset.csv_path.ok_or_else(|| {
        AppError::Core(CoreError::Validation(
            "dataset has not been parsed yet".into(),
        ))
    })?;
    Ok(PathBuf::from(csv_path))
}

/// CSV reads are blocking; hop to the blocking pool.
async fn run_load(
    path: PathBuf,
    x_col: String,
    y_cols: Vec<String>,
    filters: Vec<Filter>,
    method: DownsampleMethod,
    max_points: usize,
) -> AppResult<Vec<Trace>> {
    let result = tokio::task::spawn_blocking(move || {
        load_traces(&path, &x_col, &y_cols, &filters, method, max_points)
    })
    .await
    .map_err(|e| AppError::InternalError(format!("plot task panicked: {e}")))?;

    result.map_err(|err| match err {
        SeriesError::UnknownColumn(col) => {
            AppError::Core(CoreError::Validation(format!("unknown column: {col}")))
        }
        SeriesError::Csv(e) => AppError::InternalError(format!("failed to read parsed data: {e}")),
    })
}

fn split_columns(y_cols: &str) -> AppResult<Vec<String>> {
    let cols: Vec<String> = y_cols
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if cols.is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "y_cols must name at least one column".into(),
        )));
    }
    Ok(cols)
}

fn parse_filters(raw: Option<&str>) -> AppResult<Vec<Filter>> {
    match raw {
        None | Some("") => Ok(Vec::new()),
        Some(text) => serde_json::from_str(text).map_err(|e| {
            AppError::Core(CoreError::Validation(format!("invalid filters: {e}")))
        }),
    }
}
