//! Process-wide capture hooks
//!
//! [`install`] registers the panic hook once per process; later calls are
//! no-ops that still hand back a flush guard. The hook records an uncaught
//! event and then chains to whatever hook was registered before, so panic
//! output and unwinding behave exactly as without capture.
//!
//! Detached tasks go through [`spawn_observed`]: an `Err` that no caller
//! can see is recorded as an unhandled rejection.

use crate::capture::service::DiagnosticsService;
use crate::capture::types::DiagnosticEvent;
use std::any::Any;
use std::backtrace::{Backtrace, BacktraceStatus};
use std::future::Future;
use std::sync::{Arc, OnceLock};
use tokio::task::JoinHandle;

static INSTALLED: OnceLock<String> = OnceLock::new();

/// Options for [`install`]
#[derive(Debug, Clone, Copy)]
pub struct HookOptions {
    /// Register the panic hook
    pub capture_panics: bool,
    /// Capture a backtrace even when `RUST_BACKTRACE` is unset
    pub force_backtrace: bool,
}

impl Default for HookOptions {
    fn default() -> Self {
        Self {
            capture_panics: true,
            force_backtrace: false,
        }
    }
}

/// Flushes the persisted logs when dropped
///
/// Hold it for the lifetime of `main`; dropping it is the shutdown flush.
#[must_use = "dropping the guard flushes immediately"]
pub struct CaptureGuard {
    service: Arc<DiagnosticsService>,
}

impl CaptureGuard {
    pub fn service(&self) -> &Arc<DiagnosticsService> {
        &self.service
    }
}

impl Drop for CaptureGuard {
    fn drop(&mut self) {
        match self.service.flush() {
            Ok(()) => tracing::debug!(session_id = %self.service.session_id(), "Diagnostics flushed"),
            Err(e) => tracing::warn!(error = %e, "Final diagnostics flush failed"),
        }
    }
}

/// Install the process-wide hooks for `service`
///
/// Only the first call registers anything; the hooks stay bound to that
/// first service for the rest of the process.
pub fn install(service: Arc<DiagnosticsService>, options: HookOptions) -> CaptureGuard {
    let mut first = false;
    let owner = INSTALLED.get_or_init(|| {
        first = true;
        if options.capture_panics {
            install_panic_hook(Arc::clone(&service), options.force_backtrace);
        }
        service.session_id().to_string()
    });

    if first {
        tracing::info!(
            session_id = %owner,
            capture_panics = options.capture_panics,
            "Diagnostics capture installed"
        );
    } else {
        tracing::debug!(session_id = %owner, "Diagnostics capture already installed");
    }

    CaptureGuard { service }
}

/// Whether [`install`] has run in this process
pub fn is_installed() -> bool {
    INSTALLED.get().is_some()
}

fn install_panic_hook(service: Arc<DiagnosticsService>, force_backtrace: bool) {
    let previous = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |info| {
        let mut event = DiagnosticEvent::uncaught(panic_message(info.payload()));

        if let Some(location) = info.location() {
            event = event.location(location.file(), location.line(), location.column());
        }

        let backtrace = if force_backtrace {
            Backtrace::force_capture()
        } else {
            Backtrace::capture()
        };
        if backtrace.status() == BacktraceStatus::Captured {
            event = event.stack(backtrace.to_string());
        }

        service.try_log_error(event);
        previous(info);
    }));
}

/// Extract the message from a panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Spawn a detached task whose failure is recorded instead of lost
///
/// `name` prefixes the recorded reason. The task's own outcome is not
/// changed; the handle resolves once recording is done.
pub fn spawn_observed<F, T, E>(
    service: Arc<DiagnosticsService>,
    name: impl Into<String>,
    future: F,
) -> JoinHandle<()>
where
    F: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let name = name.into();
    tokio::spawn(async move {
        if let Err(e) = future.await {
            tracing::warn!(task = %name, error = %e, "Detached task failed");
            service.log_error(DiagnosticEvent::unhandled_rejection(format!("{}: {}", name, e)));
        }
    })
}
