//! Integration tests for plot series, overlays, and saved presets.

mod common;

use axum::http::StatusCode;
use axum::Router;
use common::{body_json, delete_auth, get_auth, post_empty_auth, post_json_auth, register_and_login};
use sqlx::PgPool;

use flightdeck_api::app;
use flightdeck_api::state::AppState;
use flightdeck_db::repositories::JobRepo;
use flightdeck_worker::config::DEFAULT_POLL_INTERVAL;
use flightdeck_worker::job::run_parse_job;
use flightdeck_worker::WorkerConfig;

fn setup(pool: PgPool) -> (Router, AppState) {
    let state = common::build_test_state(pool);
    (app::build_app(state.clone()), state)
}

/// Upload the demo capture and run its parse job, returning the dataset id.
async fn parsed_demo_dataset(app: &Router, state: &AppState, token: &str) -> String {
    let response = post_empty_auth(app.clone(), "/datasets/demo_upload", token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let dataset_id = json["dataset_id"].as_str().unwrap().to_string();

    let job = JobRepo::claim_next(&state.pool)
        .await
        .expect("claim should succeed")
        .expect("a job should be queued");
    let config = WorkerConfig {
        data_root: state.config.data_root.clone(),
        schema_file: state.config.schema_file.clone(),
        poll_interval: DEFAULT_POLL_INTERVAL,
    };
    run_parse_job(&state.pool, &state.hub, &state.schema, &config, &job)
        .await
        .expect("parse job should complete");

    dataset_id
}

// ---------------------------------------------------------------------------
// Series
// ---------------------------------------------------------------------------

/// The plot endpoint returns one trace per requested column.
#[sqlx::test(migrations = "../db/migrations")]
async fn plot_returns_requested_traces(pool: PgPool) {
    let (app, state) = setup(pool);
    let token = register_and_login(&app, "plotter").await;
    let dataset_id = parsed_demo_dataset(&app, &state, &token).await;

    let uri = format!("/plots/plot?dataset_id={dataset_id}&x_col=PacketNum&y_cols=alt,mode");
    let response = get_auth(app, &uri, &token).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["x_col"], "PacketNum");

    let traces = json["traces"].as_array().unwrap();
    assert_eq!(traces.len(), 2);
    assert_eq!(traces[0]["name"], "alt");
    assert_eq!(traces[0]["x"], serde_json::json!([1.0, 2.0]));
    assert_eq!(traces[0]["y"], serde_json::json!([1.0, 2.0]));
    assert_eq!(traces[1]["name"], "mode");
    assert_eq!(traces[1]["y"], serde_json::json!([7.0, 3.0]));
}

/// A filter expressed as URL-encoded JSON narrows the rows.
#[sqlx::test(migrations = "../db/migrations")]
async fn plot_applies_filters(pool: PgPool) {
    let (app, state) = setup(pool);
    let token = register_and_login(&app, "filterer").await;
    let dataset_id = parsed_demo_dataset(&app, &state, &token).await;

    // filters=[{"col":"mode","op":"==","value":7}]
    let filters = "%5B%7B%22col%22%3A%22mode%22%2C%22op%22%3A%22%3D%3D%22%2C%22value%22%3A7%7D%5D";
    let uri = format!(
        "/plots/plot?dataset_id={dataset_id}&x_col=PacketNum&y_cols=alt&filters={filters}"
    );
    let response = get_auth(app, &uri, &token).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["traces"][0]["y"], serde_json::json!([1.0]));
}

/// Requesting an unknown column is a 400.
#[sqlx::test(migrations = "../db/migrations")]
async fn plot_unknown_column_is_rejected(pool: PgPool) {
    let (app, state) = setup(pool);
    let token = register_and_login(&app, "typo_user").await;
    let dataset_id = parsed_demo_dataset(&app, &state, &token).await;

    let uri = format!("/plots/plot?dataset_id={dataset_id}&x_col=PacketNum&y_cols=altitude");
    let response = get_auth(app, &uri, &token).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

/// Plotting an unparsed dataset is a 400.
#[sqlx::test(migrations = "../db/migrations")]
async fn plot_unparsed_dataset_is_rejected(pool: PgPool) {
    let (app, _state) = setup(pool);
    let token = register_and_login(&app, "eager_plotter").await;

    let response = post_empty_auth(app.clone(), "/datasets/demo_upload", &token).await;
    let json = body_json(response).await;
    let dataset_id = json["dataset_id"].as_str().unwrap().to_string();

    let uri = format!("/plots/plot?dataset_id={dataset_id}&x_col=PacketNum&y_cols=alt");
    let response = get_auth(app, &uri, &token).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

/// Overlay defaults trace names to "<dataset>: <column>" on the
/// primary axis.
#[sqlx::test(migrations = "../db/migrations")]
async fn overlay_prefixes_trace_names(pool: PgPool) {
    let (app, state) = setup(pool);
    let token = register_and_login(&app, "overlayer").await;
    let dataset_id = parsed_demo_dataset(&app, &state, &token).await;

    let body = serde_json::json!({
        "x_col": "PacketNum",
        "series": [{ "dataset_id": dataset_id, "y_col": "alt" }],
    });
    let response = post_json_auth(app, "/plots/overlay", &token, body).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["traces"][0]["name"], "Demo capture: alt");
    assert_eq!(json["traces"][0]["axis"], "y");
}

/// A series can carry its own label and a secondary-axis assignment,
/// echoed back on the trace.
#[sqlx::test(migrations = "../db/migrations")]
async fn overlay_supports_secondary_axis(pool: PgPool) {
    let (app, state) = setup(pool);
    let token = register_and_login(&app, "dual_axis").await;
    let dataset_id = parsed_demo_dataset(&app, &state, &token).await;

    let body = serde_json::json!({
        "x_col": "PacketNum",
        "series": [
            { "dataset_id": dataset_id, "y_col": "alt" },
            { "dataset_id": dataset_id, "y_col": "mode", "label": "Mode flags", "axis": "y2" },
        ],
    });
    let response = post_json_auth(app, "/plots/overlay", &token, body).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let traces = json["traces"].as_array().unwrap();
    assert_eq!(traces.len(), 2);
    assert_eq!(traces[0]["axis"], "y");
    assert_eq!(traces[1]["name"], "Mode flags");
    assert_eq!(traces[1]["axis"], "y2");
    assert_eq!(traces[1]["y"], serde_json::json!([7.0, 3.0]));
}

// ---------------------------------------------------------------------------
// Presets
// ---------------------------------------------------------------------------

/// Presets round-trip: create, list, delete, 404 on double delete.
#[sqlx::test(migrations = "../db/migrations")]
async fn preset_lifecycle(pool: PgPool) {
    let (app, _state) = setup(pool);
    let token = register_and_login(&app, "preset_user").await;

    let body = serde_json::json!({
        "name": "Altitude overview",
        "description": "alt vs packet number",
        "config": { "x_col": "PacketNum", "y_cols": ["alt"] },
    });
    let response = post_json_auth(app.clone(), "/plots/presets", &token, body).await;
    assert_eq!(response.status(), StatusCode::OK);
    let created = body_json(response).await;
    let preset_id = created["id"].as_i64().unwrap();
    assert_eq!(created["name"], "Altitude overview");

    let response = get_auth(app.clone(), "/plots/presets", &token).await;
    let listed = body_json(response).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["config"]["y_cols"], serde_json::json!(["alt"]));

    let response = delete_auth(app.clone(), &format!("/plots/presets/{preset_id}"), &token).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = delete_auth(app, &format!("/plots/presets/{preset_id}"), &token).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

/// Presets are scoped to their owner.
#[sqlx::test(migrations = "../db/migrations")]
async fn presets_are_per_owner(pool: PgPool) {
    let (app, _state) = setup(pool);
    let owner = register_and_login(&app, "preset_owner").await;
    let other = register_and_login(&app, "preset_other").await;

    let body = serde_json::json!({
        "name": "Private",
        "config": { "y_cols": ["mode"] },
    });
    let response = post_json_auth(app.clone(), "/plots/presets", &owner, body).await;
    assert_eq!(response.status(), StatusCode::OK);
    let preset_id = body_json(response).await["id"].as_i64().unwrap();

    // The other user sees nothing and cannot delete it.
    let response = get_auth(app.clone(), "/plots/presets", &other).await;
    assert!(body_json(response).await.as_array().unwrap().is_empty());

    let response = delete_auth(app, &format!("/plots/presets/{preset_id}"), &other).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
