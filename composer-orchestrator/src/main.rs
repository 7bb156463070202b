use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod api;
pub mod config;
pub mod db;
pub mod repository;
pub mod service;

use crate::config::Config;
use crate::repository::{JobStore, MemoryJobStore, PgJobStore};
use crate::service::workers::Workers;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "composer_orchestrator=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load();
    config.validate().context("invalid configuration")?;

    tracing::info!("Starting Composer Orchestrator...");

    let store: Arc<dyn JobStore> = match &config.database_url {
        Some(database_url) => {
            tracing::info!("Connecting to database...");

            let pool = db::create_pool(database_url, config.db_max_connections)
                .await
                .context("failed to create database pool")?;

            tracing::info!("Database connection pool created");

            db::run_migrations(&pool)
                .await
                .context("failed to run database migrations")?;

            Arc::new(PgJobStore::new(pool))
        }
        None => {
            tracing::warn!("No database configured, jobs are kept in memory only");
            Arc::new(MemoryJobStore::new())
        }
    };

    if config.local_save {
        tracing::warn!("Local save is enabled, images may be kept on the worker server");
    }

    let addr = config.bind_addr.clone();

    // Build router with all API endpoints
    let app = api::create_router(api::AppState {
        workers: Workers::new(store),
        config: Arc::new(config),
    });

    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;

    axum::serve(listener, app)
        .await
        .context("server error")?;

    Ok(())
}
