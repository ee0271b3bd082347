//! Pitchside Daemon
//!
//! Run with: cargo run --bin pitchside
//!
//! Captures diagnostics for the analytics dashboard, optionally keeps
//! dashboard resources refreshed, and serves the report API until Ctrl+C
//! or SIGTERM. The session is flushed to disk on the way out.
//!
//! # Configuration
//!
//! `PITCHSIDE_CONFIG` points at a TOML file; otherwise the default
//! locations are searched. `PITCHSIDE_*` variables override either.

use anyhow::Context;
use pitchside::api::{serve, AppState};
use pitchside::capture::{install, DiagnosticsService, ErrorCaptureLayer, FileStore};
use pitchside::config::Config;
use pitchside::dashboard::{DashboardClient, DashboardPoller};
use pitchside::telemetry;
use std::path::PathBuf;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = match std::env::var("PITCHSIDE_CONFIG") {
        Ok(path) => Config::load_with_env(&PathBuf::from(path))?,
        Err(_) => Config::load_default(),
    };

    let store = Arc::new(FileStore::new(config.data_dir()));
    let service = Arc::new(DiagnosticsService::new(store, config.service_config()));

    telemetry::init_tracing(
        &config.logging,
        Some(ErrorCaptureLayer::new(Arc::clone(&service))),
    )
    .context("Failed to initialize logging")?;

    tracing::info!("Starting Pitchside v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Data directory: {:?}", config.data_dir());

    let guard = install(Arc::clone(&service), config.hook_options());

    let stats = service.stats();
    tracing::info!(
        session_id = %service.session_id(),
        persisted_errors = stats.persisted_errors,
        persisted_api_calls = stats.persisted_api_calls,
        "Diagnostics session started"
    );

    let client = Arc::new(
        DashboardClient::new(config.dashboard_config(), Some(Arc::clone(&service)))
            .context("Failed to build dashboard client")?,
    );

    match client.health().await {
        Ok(()) => tracing::info!("Dashboard API reachable at {}", config.dashboard.base_url),
        Err(e) => tracing::warn!("Dashboard API not available: {} (calls will be captured as failures)", e),
    }

    let api_config = config.api_config();
    let poll_config = config.poll_config();

    let (state, poller) = if poll_config.enabled {
        tracing::info!(
            interval_secs = poll_config.interval_secs,
            resources = poll_config.resources.len(),
            "Starting dashboard poller"
        );
        let poller = Arc::new(
            DashboardPoller::new(Arc::clone(&client), poll_config)
                .observed_by(Arc::clone(&service)),
        );
        Arc::clone(&poller).start();
        (
            AppState::with_poller(Arc::clone(&service), api_config.clone(), Arc::clone(&poller)),
            Some(poller),
        )
    } else {
        tracing::info!("Dashboard polling disabled");
        (AppState::new(Arc::clone(&service), api_config.clone()), None)
    };

    let served = serve(state, &api_config).await;

    if let Some(poller) = poller {
        poller.stop().await;
    }

    let stats = service.stats();
    tracing::info!(
        errors = stats.errors,
        api_calls = stats.api_calls,
        persist_failures = stats.persist_failures,
        "Flushing diagnostics session"
    );
    drop(guard);

    served?;
    tracing::info!("Pitchside stopped");
    Ok(())
}
