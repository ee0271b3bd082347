//! Pitchside Diagnostics Capture
//!
//! This module provides the capture core:
//!
//! - **types**: Records (`DiagnosticEvent`, `ApiCallRecord`, `ErrorReport`)
//! - **ring**: Fixed-capacity circular buffer for the persisted mirrors
//! - **store**: Durable key/value stores and the capped JSON-array projection
//! - **service**: The session-owning `DiagnosticsService`
//! - **hooks**: Panic hook installation, shutdown flush guard, observed tasks
//! - **layer**: `tracing` layer turning ERROR events into diagnostics
//! - **error**: Error types
//!
//! # Architecture
//!
//! ```text
//! panic hook ─────────┐
//! spawn_observed ─────┤
//! ErrorCaptureLayer ──┼─→ DiagnosticsService ─→ session (full)
//! http interceptor ───┘          │
//!                                └─→ RingBuffer(100 / 50) ─→ LogStore
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use pitchside::capture::{
//!     install, DiagnosticEvent, DiagnosticsService, FileStore, HookOptions, ServiceConfig,
//! };
//! use std::sync::Arc;
//!
//! let store = Arc::new(FileStore::new("./diagnostics"));
//! let service = Arc::new(DiagnosticsService::new(store, ServiceConfig::default()));
//! let _guard = install(Arc::clone(&service), HookOptions::default());
//!
//! service.log_error(DiagnosticEvent::console_error("lineup fetch failed"));
//! let report = service.generate_report();
//! println!("{} events this session", report.errors.len());
//! ```

pub mod error;
pub mod hooks;
pub mod layer;
pub mod ring;
pub mod service;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use error::{CaptureError, CaptureResult, StoreError, StoreResult};
pub use hooks::{install, is_installed, spawn_observed, CaptureGuard, HookOptions};
pub use layer::ErrorCaptureLayer;
pub use ring::RingBuffer;
pub use service::{
    default_user_agent, CaptureStats, DiagnosticsService, ServiceConfig,
    DEFAULT_API_CALL_CAPACITY, DEFAULT_ERROR_CAPACITY,
};
pub use store::{FileStore, LogStore, MemoryStore, PersistedLog, API_CALLS_KEY, ERRORS_KEY};
pub use types::{ApiCallRecord, DiagnosticEvent, ErrorReport, EventKind, PersistedLogs};
