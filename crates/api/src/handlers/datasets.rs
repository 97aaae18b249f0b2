//! Dataset lifecycle handlers: upload, parse, columns, download, delete.

use std::path::{Path as FsPath, PathBuf};

use axum::body::Body;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio_util::io::ReaderStream;
use uuid::Uuid;

use flightdeck_core::error::CoreError;
use flightdeck_core::types::{DatasetId, JobId};
use flightdeck_db::models::dataset::{DatasetResponse, NewDataset};
use flightdeck_db::repositories::{DatasetRepo, JobRepo};

use crate::error::{not_found, AppError, AppResult};
use crate::middleware::AuthUser;
use crate::state::AppState;

/// GET /datasets -- list all datasets, newest first.
pub async fn list_datasets(
    State(state): State<AppState>,
    _user: AuthUser,
) -> AppResult<Json<Vec<DatasetResponse>>> {
    let datasets = DatasetRepo::list(&state.pool).await?;
    Ok(Json(datasets.into_iter().map(Into::into).collect()))
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub dataset_id: DatasetId,
    pub job_id: JobId,
}

/// POST /datasets/upload -- accept a capture file and queue a parse job.
///
/// Multipart fields: `file` (required), `name` (optional display name,
/// defaults to the uploaded filename).
pub async fn upload_dataset(
    State(state): State<AppState>,
    user: AuthUser,
    mut multipart: Multipart,
) -> AppResult<Json<UploadResponse>> {
    let mut file_bytes: Option<(String, Vec<u8>)> = None;
    let mut name: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("invalid multipart body: {e}")))?
    {
        match field.name() {
            Some("file") => {
                let filename = field
                    .file_name()
                    .unwrap_or("upload.bin")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("failed to read upload: {e}")))?;
                file_bytes = Some((filename, bytes.to_vec()));
            }
            Some("name") => {
                name = field.text().await.ok().filter(|s| !s.trim().is_empty());
            }
            _ => {}
        }
    }

    let (filename, bytes) = file_bytes
        .ok_or_else(|| AppError::BadRequest("missing multipart field: file".into()))?;
    if bytes.is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "uploaded file is empty".into(),
        )));
    }

    let dataset_id = Uuid::new_v4();
    let raw_path = save_upload(&state, dataset_id, &filename, &bytes).await?;

    let dataset = DatasetRepo::create(
        &state.pool,
        &NewDataset {
            id: dataset_id,
            owner_id: Some(user.user_id),
            project_id: None,
            name: name.unwrap_or_else(|| filename.clone()),
            original_filename: filename,
            raw_path: raw_path.to_string_lossy().into_owned(),
        },
    )
    .await?;

    let job = JobRepo::create(&state.pool, Uuid::new_v4(), Some(user.user_id), dataset.id).await?;
    tracing::info!(
        dataset_id = %dataset.id,
        job_id = %job.id,
        size_bytes = bytes.len(),
        "Dataset uploaded, parse job queued",
    );

    Ok(Json(UploadResponse {
        dataset_id: dataset.id,
        job_id: job.id,
    }))
}

/// POST /datasets/demo_upload -- queue a parse of the bundled sample capture.
pub async fn demo_upload(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<UploadResponse>> {
    let demo = &state.config.demo_file;
    let bytes = tokio::fs::read(demo)
        .await
        .map_err(|e| AppError::InternalError(format!("demo capture unavailable: {e}")))?;
    let filename = demo
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "serial_data.txt".into());

    let dataset_id = Uuid::new_v4();
    let raw_path = save_upload(&state, dataset_id, &filename, &bytes).await?;

    let dataset = DatasetRepo::create(
        &state.pool,
        &NewDataset {
            id: dataset_id,
            owner_id: Some(user.user_id),
            project_id: None,
            name: "Demo capture".into(),
            original_filename: filename,
            raw_path: raw_path.to_string_lossy().into_owned(),
        },
    )
    .await?;

    let job = JobRepo::create(&state.pool, Uuid::new_v4(), Some(user.user_id), dataset.id).await?;
    tracing::info!(dataset_id = %dataset.id, job_id = %job.id, "Demo dataset queued");

    Ok(Json(UploadResponse {
        dataset_id: dataset.id,
        job_id: job.id,
    }))
}

/// POST /datasets/{id}/parse -- queue a re-parse of an existing dataset.
///
/// Returns 409 while another parse job for the dataset is pending or
/// running.
pub async fn parse_dataset(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DatasetId>,
) -> AppResult<Json<UploadResponse>> {
    let dataset = DatasetRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found("dataset", id))?;

    if JobRepo::active_for_dataset(&state.pool, dataset.id).await? {
        return Err(AppError::Core(CoreError::Conflict(
            "a parse job for this dataset is already in progress".into(),
        )));
    }

    let job = JobRepo::create(&state.pool, Uuid::new_v4(), Some(user.user_id), dataset.id).await?;
    tracing::info!(dataset_id = %dataset.id, job_id = %job.id, "Re-parse queued");

    Ok(Json(UploadResponse {
        dataset_id: dataset.id,
        job_id: job.id,
    }))
}

/// GET /datasets/{id}/columns -- column names of the parsed table.
pub async fn dataset_columns(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<DatasetId>,
) -> AppResult<Json<serde_json::Value>> {
    let dataset = DatasetRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found("dataset", id))?;

    if dataset.csv_path.is_none() {
        return Err(AppError::Core(CoreError::Validation(
            "dataset has not been parsed yet".into(),
        )));
    }

    Ok(Json(json!({ "columns": dataset.columns() })))
}

#[derive(Debug, Default, Deserialize)]
pub struct DownloadQuery {
    /// `raw` (default) or `csv`.
    pub file_type: Option<String>,
}

/// GET /datasets/{id}/download -- stream the raw capture or parsed CSV.
pub async fn download_dataset(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<DatasetId>,
    Query(query): Query<DownloadQuery>,
) -> AppResult<Response> {
    let dataset = DatasetRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found("dataset", id))?;

    let (path, download_name) = match query.file_type.as_deref().unwrap_or("raw") {
        "raw" => (
            PathBuf::from(&dataset.raw_path),
            dataset.original_filename.clone(),
        ),
        "csv" => {
            let csv_path = dataset.csv_path.clone().ok_or_else(|| {
                AppError::Core(CoreError::Validation(
                    "dataset has not been parsed yet".into(),
                ))
            })?;
            (PathBuf::from(csv_path), format!("{}.csv", dataset.name))
        }
        other => {
            return Err(AppError::BadRequest(format!(
                "unknown file_type: {other} (expected raw or csv)"
            )))
        }
    };

    let file = tokio::fs::File::open(&path)
        .await
        .map_err(|e| AppError::InternalError(format!("cannot open {}: {e}", path.display())))?;
    let stream = ReaderStream::new(file);

    let response = (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{download_name}\""),
            ),
        ],
        Body::from_stream(stream),
    );
    Ok(response.into_response())
}

/// DELETE /datasets/{id} -- remove a dataset and its files.
///
/// Rejected with 400 while a parse job for the dataset is in flight.
pub async fn delete_dataset(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<DatasetId>,
) -> AppResult<Json<serde_json::Value>> {
    let dataset = DatasetRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found("dataset", id))?;

    if JobRepo::active_for_dataset(&state.pool, dataset.id).await? {
        return Err(AppError::Core(CoreError::Validation(
            "cannot delete a dataset while a parse job is in progress".into(),
        )));
    }

    // File removal is best-effort; the row is the source of truth.
    for path in [Some(dataset.raw_path.clone()), dataset.csv_path.clone()]
        .into_iter()
        .flatten()
    {
        if let Err(e) = tokio::fs::remove_file(&path).await {
            tracing::warn!(path, error = %e, "Failed to remove dataset file");
        }
    }

    DatasetRepo::delete(&state.pool, dataset.id).await?;
    tracing::info!(dataset_id = %dataset.id, "Dataset deleted");
    Ok(Json(json!({ "ok": true })))
}

/// Persist an uploaded capture under `uploads/{dataset_id}_{filename}`.
async fn save_upload(
    state: &AppState,
    dataset_id: DatasetId,
    filename: &str,
    bytes: &[u8],
) -> AppResult<PathBuf> {
    let uploads = state.config.uploads_dir();
    tokio::fs::create_dir_all(&uploads)
        .await
        .map_err(|e| AppError::InternalError(format!("cannot create upload dir: {e}")))?;

    let safe_name = sanitize_filename(filename);
    let path = uploads.join(format!("{dataset_id}_{safe_name}"));
    tokio::fs::write(&path, bytes)
        .await
        .map_err(|e| AppError::InternalError(format!("cannot write upload: {e}")))?;
    Ok(path)
}

/// Keep only the final path component and replace shell-hostile bytes.
fn sanitize_filename(filename: &str) -> String {
    let base = FsPath::new(filename)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload.bin".into());
    base.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
