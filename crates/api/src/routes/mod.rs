pub mod health;

use axum::routing::{delete, get, post};
use axum::Router;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the application route tree (health is mounted separately).
///
/// ```text
/// /auth/register                  register (public)
/// /auth/login                     login (public)
///
/// /datasets                       list
/// /datasets/upload                multipart upload + parse job
/// /datasets/demo_upload           parse the bundled sample capture
/// /datasets/{id}/parse            queue a re-parse
/// /datasets/{id}/columns          parsed column names
/// /datasets/{id}/download         raw or csv file stream
/// /datasets/{id}                  delete
///
/// /jobs/{id}                      status snapshot (1 Hz polling target)
/// /jobs/{id}/logdump              buffered event history
/// /jobs/ws/{id}                   status WebSocket
/// /jobs/{id}/ws                   status WebSocket (legacy path)
///
/// /plots/plot                     single-dataset series (GET, ?token= ok)
/// /plots/overlay                  multi-dataset overlay (POST)
/// /plots/presets                  list, create
/// /plots/presets/{id}             delete
///
/// /projects                       list, create
/// /projects/{id}                  get (members only)
/// /projects/{id}/members          add member
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/login", post(handlers::auth::login))
        .route("/datasets", get(handlers::datasets::list_datasets))
        .route("/datasets/upload", post(handlers::datasets::upload_dataset))
        .route("/datasets/demo_upload", post(handlers::datasets::demo_upload))
        .route("/datasets/{id}/parse", post(handlers::datasets::parse_dataset))
        .route("/datasets/{id}/columns", get(handlers::datasets::dataset_columns))
        .route("/datasets/{id}/download", get(handlers::datasets::download_dataset))
        .route("/datasets/{id}", delete(handlers::datasets::delete_dataset))
        .route("/jobs/{id}", get(handlers::jobs::get_job))
        .route("/jobs/{id}/logdump", get(handlers::jobs::job_logdump))
        .route("/jobs/ws/{id}", get(ws::job_ws_handler))
        // Older SPA builds used the suffix form.
        .route("/jobs/{id}/ws", get(ws::job_ws_handler))
        .route("/plots/plot", get(handlers::plots::plot))
        .route("/plots/overlay", post(handlers::plots::overlay))
        .route(
            "/plots/presets",
            get(handlers::plots::list_presets).post(handlers::plots::create_preset),
        )
        .route("/plots/presets/{id}", delete(handlers::plots::delete_preset))
        .route(
            "/projects",
            get(handlers::projects::list_projects).post(handlers::projects::create_project),
        )
        .route("/projects/{id}", get(handlers::projects::get_project))
        .route("/projects/{id}/members", post(handlers::projects::add_member))
}
