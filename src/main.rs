use anyhow::Context;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use estate_api::auth::JwtMaker;
use estate_api::database::{DatabaseManager, PgStore};
use estate_api::services::FsBlobStore;
use estate_api::{config, router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so DATABASE_URL and TOKEN_SYMMETRIC_KEY are picked up
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("estate_api=debug,tower_http=info")),
        )
        .init();

    let config = config::config().clone();
    tracing::info!("Starting Estate API in {:?} mode", config.environment);

    let tokens = JwtMaker::new(&config.security.token_symmetric_key).context("TOKEN_SYMMETRIC_KEY is unusable")?;

    let pool = DatabaseManager::connect(&config.database)
        .await
        .context("failed to connect to the database")?;
    if config.database.run_migrations {
        DatabaseManager::migrate(&pool).await?;
    }

    let blobs = FsBlobStore::new(config.storage.upload_root.clone());
    tokio::fs::create_dir_all(blobs.root().join("uploads"))
        .await
        .context("failed to create the uploads directory")?;

    let bind_addr = config.server.bind_addr();
    let state = AppState::new(
        Arc::new(PgStore::new(pool.clone())),
        Arc::new(tokens),
        Arc::new(blobs),
        config,
    );

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    tracing::info!("Estate API listening on http://{}", bind_addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    DatabaseManager::close(pool).await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    tracing::info!("Shutdown signal received");
}
