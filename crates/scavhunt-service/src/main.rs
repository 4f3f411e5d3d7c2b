//! Scavhunt Service - HTTP API for the scavenger hunt backend
//!
//! This is the main entry point for the scavhunt service.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scavhunt_service::sweeper::start_chunk_sweeper;
use scavhunt_service::{create_router, AppState, ServiceConfig};
use scavhunt_store::{BucketClient, SheetsClient};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,scavhunt_service=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Scavhunt Service");

    // Load configuration from environment
    let config = ServiceConfig::from_env();

    tracing::info!(
        listen_addr = %config.listen_addr,
        workbook = %config.workbook_id,
        bucket = %config.blob_bucket,
        organizer_gate = %config.organizer_access_key.is_some(),
        "Service configuration loaded"
    );

    // Connect the backing stores
    let tables = Arc::new(SheetsClient::new(
        &config.sheets_api_url,
        &config.workbook_id,
        &config.sheets_api_token,
    ));
    let blob = Arc::new(BucketClient::new(
        &config.blob_api_url,
        &config.blob_bucket,
        &config.blob_api_token,
    ));

    // Build app state
    let state = AppState::new(tables, blob, config.clone());

    // Start the scratch sweeper for abandoned upload chunks
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper = start_chunk_sweeper(
        state.chunks.clone(),
        Duration::from_secs(config.chunk_ttl_seconds),
        Duration::from_secs(config.chunk_sweep_interval_seconds),
        shutdown_rx,
    );

    // Create the router
    let app = create_router(state);
    tracing::info!("Router configured with all API endpoints");

    // Start HTTP server
    tracing::info!(listen_addr = %config.listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    axum::serve(listener, app).await?;

    // Stop the sweeper before exiting
    let _ = shutdown_tx.send(true);
    sweeper.await?;

    Ok(())
}
