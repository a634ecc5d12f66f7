//! Lectern server binary.
//!
//! Boots structured logging, loads configuration from the environment,
//! connects the database pool, and serves the API.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use lectern::config::AppConfig;
use lectern::{build_router, database, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Structured JSON logs; RUST_LOG overrides the default filter.
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,lectern=debug".into()),
        )
        .json()
        .init();

    let config = Arc::new(AppConfig::from_env()?);

    let pool = database::create_pool(&config.database)
        .await
        .context("database connection failed")?;
    database::init_schema(&pool)
        .await
        .context("schema bootstrap failed")?;
    info!(event = "database.connected", "Database ready");

    let state = AppState::new(Arc::clone(&config), pool);
    let app = build_router(state);

    info!(event = "server.started", address = %config.bind_addr, "Server listening");
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}
