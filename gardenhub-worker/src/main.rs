//! # GardenHub Worker
//!
//! Runs the scheduled jobs against the shared database:
//! - Deadline reminders daily at 08:00 UTC
//! - Recurring task generation daily at 00:05 UTC
//! - Weather alerts daily at 18:00 UTC
//! - Job log cleanup Mondays at 03:00 UTC
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p gardenhub-worker
//! ```

use anyhow::Context;
use gardenhub_shared::db::migrations::run_migrations;
use gardenhub_shared::db::pool::{create_pool, DatabaseConfig};
use gardenhub_shared::notify::{HttpPushGateway, NoopPushGateway, PushGateway};
use gardenhub_shared::services::Services;
use gardenhub_shared::store::postgres::PgStore;
use gardenhub_worker::config::Config;
use gardenhub_worker::jobs::weather_alerts::WeatherAlertJob;
use gardenhub_worker::jobs::JobContext;
use gardenhub_worker::scheduler::WorkerScheduler;
use gardenhub_worker::weather::{OpenMeteoForecast, OpenMeteoGeocoder};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    tracing::info!(
        "GardenHub Worker v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env()?;

    let pool = create_pool(DatabaseConfig::with_url(
        config.database.url.clone(),
        config.database.max_connections,
    ))
    .await
    .context("failed to connect to database")?;
    run_migrations(&pool).await.context("failed to run migrations")?;

    let push: Arc<dyn PushGateway> = match &config.push.server_key {
        Some(key) => Arc::new(HttpPushGateway::new(config.push.endpoint.clone(), key.clone())?),
        None => {
            tracing::warn!("PUSH_SERVER_KEY not set, push delivery disabled");
            Arc::new(NoopPushGateway)
        }
    };

    let services = Services::build(Arc::new(PgStore::new(pool.clone())), push);
    let weather = WeatherAlertJob::new(
        services.store.clone(),
        services.dispatcher.clone(),
        Arc::new(OpenMeteoGeocoder::new(config.weather.geocoding_url.clone())?),
        Arc::new(OpenMeteoForecast::new(config.weather.forecast_url.clone())?),
    );

    if config.recurring_dry_run {
        tracing::warn!("Recurring generation runs in dry-run mode");
    }

    let scheduler = WorkerScheduler::new(JobContext {
        services,
        weather: Arc::new(weather),
        recurring_dry_run: config.recurring_dry_run,
    });

    let shutdown = CancellationToken::new();
    let scheduler_task = tokio::spawn(scheduler.run(shutdown.clone()));

    tracing::info!("Worker ready");

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received, exiting...");
    shutdown.cancel();

    scheduler_task.await??;
    pool.close().await;

    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "gardenhub_worker=info,gardenhub_shared=info".into());

    let json = std::env::var("LOG_FORMAT").map_or(false, |f| f.eq_ignore_ascii_case("json"));
    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}
