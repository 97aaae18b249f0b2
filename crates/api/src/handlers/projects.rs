//! Project and membership handlers.

use axum::extract::{Path, State};
use axum::Json;
use serde_json::json;

use flightdeck_core::error::CoreError;
use flightdeck_core::types::DbId;
use flightdeck_db::models::project::{AddMember, CreateProject, Project, ProjectMember};
use flightdeck_db::repositories::ProjectRepo;

use crate::error::{not_found, AppError, AppResult};
use crate::middleware::AuthUser;
use crate::state::AppState;

/// GET /projects -- projects the caller is a member of.
pub async fn list_projects(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<Vec<Project>>> {
    let projects = ProjectRepo::list_for_user(&state.pool, user.user_id).await?;
    Ok(Json(projects))
}

/// POST /projects -- create a project; the creator becomes its owner.
pub async fn create_project(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<CreateProject>,
) -> AppResult<Json<Project>> {
    if body.name.trim().is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "project name must not be empty".into(),
        )));
    }
    let project = ProjectRepo::create(&state.pool, body.name.trim()).await?;
    ProjectRepo::add_member(&state.pool, project.id, user.user_id, "owner").await?;
    tracing::info!(project_id = project.id, user_id = user.user_id, "Project created");
    Ok(Json(project))
}

/// GET /projects/{id} -- one project, members included.
pub async fn get_project(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<serde_json::Value>> {
    let project = ProjectRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found("project", id))?;

    if !ProjectRepo::is_member(&state.pool, project.id, user.user_id).await? {
        return Err(AppError::Core(CoreError::Forbidden(
            "not a member of this project".into(),
        )));
    }

    let members = ProjectRepo::members(&state.pool, project.id).await?;
    Ok(Json(json!({ "project": project, "members": members })))
}

/// POST /projects/{id}/members -- add a member (members only).
pub async fn add_member(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
    Json(body): Json<AddMember>,
) -> AppResult<Json<ProjectMember>> {
    let project = ProjectRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found("project", id))?;

    if !ProjectRepo::is_member(&state.pool, project.id, user.user_id).await? {
        return Err(AppError::Core(CoreError::Forbidden(
            "not a member of this project".into(),
        )));
    }

    let role = body.role.as_deref().unwrap_or("viewer");
    let member = ProjectRepo::add_member(&state.pool, project.id, body.user_id, role).await?;
    Ok(Json(member))
}
