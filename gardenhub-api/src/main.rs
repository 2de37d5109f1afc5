//! # GardenHub API Server
//!
//! JSON API for community gardens. Every write that triggers badges or
//! notifications goes through the shared domain services.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p gardenhub-api
//! ```

use anyhow::Context;
use gardenhub_api::{
    app::{build_router, AppState},
    config::Config,
};
use gardenhub_shared::db::migrations::{ensure_database_exists, run_migrations};
use gardenhub_shared::db::pool::{close_pool, create_pool, DatabaseConfig};
use gardenhub_shared::notify::{HttpPushGateway, NoopPushGateway, PushGateway};
use gardenhub_shared::services::Services;
use gardenhub_shared::store::postgres::PgStore;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    tracing::info!(
        "GardenHub API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env()?;

    ensure_database_exists(&config.database.url)
        .await
        .context("failed to prepare database")?;
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
    let bind_address = config.bind_address();
    let app = build_router(AppState::new(pool.clone(), config, services));

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("failed to bind {}", bind_address))?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    close_pool(pool).await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received, draining connections...");
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "gardenhub_api=info,gardenhub_shared=info,tower_http=info".into());

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
