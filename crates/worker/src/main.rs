use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use flightdeck_core::packet::schema::SchemaSet;
use flightdeck_events::JobEventHub;
use flightdeck_worker::{ParseRunner, WorkerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "flightdeck_worker=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let database_url = std::env::var("DATABASE_URL")?;
    let pool = flightdeck_db::create_pool(&database_url, flightdeck_db::DEFAULT_POOL_SIZE).await?;
    flightdeck_db::run_migrations(&pool).await?;

    let config = WorkerConfig::from_env();
    let schema = Arc::new(SchemaSet::load(&config.schema_file)?);
    // Standalone workers have no WebSocket subscribers; the hub is
    // still wired so job.rs stays identical in both deployments.
    let hub = Arc::new(JobEventHub::default());

    let cancel = CancellationToken::new();
    let runner = ParseRunner::new(pool, hub, schema, config);

    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            shutdown.cancel();
        }
    });

    runner.run(cancel).await;
    Ok(())
}
