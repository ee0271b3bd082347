//! # Pitchside
//!
//! Client-side diagnostics for the sports-betting analytics dashboard:
//! captures failures and API traffic, keeps a bounded persisted mirror
//! across restarts, and produces exportable error reports.
//!
//! ## Features
//!
//! - **Capture**: panics, failed detached tasks, ERROR log events and
//!   dashboard API calls all flow into one [`DiagnosticsService`]
//! - **Bounded persistence**: the newest 100 events and 50 API calls
//!   survive restarts under `app_errors` / `app_api_calls`
//! - **Reports**: JSON export as `error_report_<epoch-millis>.json`
//! - **Report API**: report, export, ingest and clear over HTTP
//!
//! ## Modules
//!
//! - [`capture`]: Records, ring buffer, stores, service, hooks, tracing layer
//! - [`http`]: Observed HTTP client with interceptor chain
//! - [`dashboard`]: Dashboard REST client and resource poller
//! - [`api`]: Report API server with Axum
//! - [`config`]: TOML configuration with environment overrides
//! - [`telemetry`]: Subscriber setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pitchside::capture::{install, DiagnosticsService, FileStore, HookOptions, ServiceConfig};
//! use pitchside::dashboard::{DashboardClient, DashboardConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(FileStore::new("./diagnostics"));
//!     let service = Arc::new(DiagnosticsService::new(store, ServiceConfig::default()));
//!     let _guard = install(Arc::clone(&service), HookOptions::default());
//!
//!     let client = DashboardClient::new(DashboardConfig::default(), Some(Arc::clone(&service)))?;
//!     if let Err(e) = client.predictions().await {
//!         eprintln!("predictions unavailable: {}", e);
//!     }
//!
//!     let path = service.export_report(std::path::Path::new("."))?;
//!     println!("Report written to {:?}", path);
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod capture;
pub mod config;
pub mod dashboard;
pub mod http;
pub mod telemetry;

// Re-export top-level types for convenience
pub use capture::{
    ApiCallRecord, CaptureError, CaptureGuard, CaptureResult, DiagnosticEvent,
    DiagnosticsService, ErrorCaptureLayer, ErrorReport, EventKind, FileStore, LogStore,
    MemoryStore, ServiceConfig,
};

pub use http::{DiagnosticsInterceptor, Interceptor, ObservedClient};

pub use dashboard::{DashboardClient, DashboardConfig, DashboardError, DashboardPoller};

pub use api::{build_router, serve, ApiConfig, ApiError, AppState};

pub use config::{Config, ConfigError, LoggingConfig};
