//! Standalone REST API server binary.
//!
//! ## Purpose
//! Runs the storage REST API server on its own.
//!
//! ## Intended use
//! This binary is useful for development and debugging; the workspace's main
//! `sncop-run` binary is the deployment entry point and serves the same
//! router.

use api_rest::{build_router, shutdown_signal, AppState};
use sncop_core::{resolve_config, StorageService};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the SNCOP storage REST API server.
///
/// # Environment Variables
/// - `SNCOP_ADDR`: Server address (default: "0.0.0.0:3001")
/// - `SNCOP_STORAGE_DIR`: Root of the storage tree (default: "storage")
/// - `SNCOP_METADATA_FILE`: Path of the flat metadata store (default: beside the storage tree)
/// - `SNCOP_DEV_MODE`: Include debug detail in error responses when truthy
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - the storage directory or catalog cannot be prepared,
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("api_rest=info".parse()?)
                .add_directive("sncop_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = std::env::var("SNCOP_ADDR").unwrap_or_else(|_| "0.0.0.0:3001".into());

    let cfg = Arc::new(resolve_config(
        std::env::var("SNCOP_STORAGE_DIR").ok(),
        std::env::var("SNCOP_METADATA_FILE").ok(),
        std::env::var("SNCOP_DEV_MODE").ok(),
    )?);

    tracing::info!("-- Starting SNCOP storage API on {}", addr);
    tracing::info!("-- Storage directory: {}", cfg.storage_dir().display());

    let service = StorageService::new(cfg)?;
    let app = build_router(AppState::new(service));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
