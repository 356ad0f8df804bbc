//! Voice Agent Classification Service
//!
//! Serves a text classifier (end-of-turn detection and similar) behind a
//! micro-batching executor. Exposes a REST (Axum) API.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use rovoice::api::{create_rest_router, AppState};
use rovoice::config::Config;
use rovoice::registry;
use rovoice::service::Classifier;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| Config::default_path().to_string());
    let loaded = Config::load(&config_path);
    let config = loaded.as_ref().cloned().unwrap_or_default();

    // Initialize logging
    let level = Level::from_str(&config.logging.level).unwrap_or(Level::INFO);
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .init();

    info!("Starting Voice Classification Service v{}", env!("CARGO_PKG_VERSION"));
    match &loaded {
        Ok(_) => info!("Configuration loaded from {}", config_path),
        Err(e) => info!("Using default config ({:#})", e),
    }

    info!("  REST port: {}", config.server.rest_port);
    info!("  Backend: {} (fallback: {:?})", config.inference.backend.as_str(), config.inference.fallback_backend);
    info!("  Device: {}", config.inference.device);
    info!("  Batch max size: {}", config.inference.batch_max_size);
    info!("  Batch delay: {}ms", config.inference.batch_timeout_ms);
    info!("  Request timeout: {}ms", config.inference.request_timeout_ms);

    // Load model and start the batch worker
    let classifier = Arc::new(Classifier::start(&config).context("starting classifier")?);
    registry::configure(classifier.clone());

    let app_state = Arc::new(AppState {
        service: classifier.clone(),
        start_time: Instant::now(),
    });
    let rest_router = create_rest_router(app_state);

    let addr = format!("0.0.0.0:{}", config.server.rest_port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    info!("REST API listening on http://{}", addr);
    info!("Voice Classification Service is ready!");

    axum::serve(listener, rest_router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received, cleaning up...");
        })
        .await?;

    // Finish queued requests before exiting
    registry::reset();
    let stats = tokio::task::spawn_blocking(move || {
        classifier.close();
        classifier.stats()
    })
    .await?;
    info!(
        "Served {} requests in {} batches ({} failed)",
        stats.completed, stats.batches, stats.failed
    );

    info!("Goodbye!");
    Ok(())
}
