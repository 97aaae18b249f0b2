use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use flightdeck_api::config::ServerConfig;
use flightdeck_api::{app, state};
use flightdeck_core::packet::schema::SchemaSet;
use flightdeck_events::JobEventHub;
use flightdeck_worker::{ParseRunner, WorkerConfig};

use state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "flightdeck_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = flightdeck_db::create_pool(&database_url, flightdeck_db::DEFAULT_POOL_SIZE)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    flightdeck_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    flightdeck_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    app::seed_admin(&pool).await.expect("Failed to seed admin account");

    // --- Packet schema ---
    let schema = Arc::new(
        SchemaSet::load(&config.schema_file).expect("Failed to load packet schema file"),
    );
    tracing::info!(
        path = %config.schema_file.display(),
        packets = schema.len(),
        "Packet schema loaded"
    );

    // --- Job event hub ---
    let hub = Arc::new(JobEventHub::default());

    // --- Embedded parse worker ---
    let worker_cancel = tokio_util::sync::CancellationToken::new();
    let worker_handle = if config.embedded_worker {
        let worker_config = WorkerConfig {
            data_root: config.data_root.clone(),
            schema_file: config.schema_file.clone(),
            poll_interval: flightdeck_worker::config::DEFAULT_POLL_INTERVAL,
        };
        let runner = ParseRunner::new(
            pool.clone(),
            Arc::clone(&hub),
            Arc::clone(&schema),
            worker_config,
        );
        let cancel = worker_cancel.clone();
        tracing::info!("Embedded parse worker started");
        Some(tokio::spawn(async move { runner.run(cancel).await }))
    } else {
        tracing::info!("Embedded parse worker disabled, expecting external worker process");
        None
    };

    // --- App state ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        schema,
        hub,
    };

    // --- Router ---
    let app = app::build_app(state);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    worker_cancel.cancel();
    if let Some(handle) = worker_handle {
        let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
        tracing::info!("Embedded parse worker stopped");
    }

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process
/// manager (e.g. systemd, Docker, Kubernetes).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl-C, shutting down"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
