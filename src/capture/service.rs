//! Diagnostics capture service
//!
//! The service owns the session: full in-memory sequences of events and
//! API calls for the process lifetime, plus the capped ring mirrors that are
//! written through to the [`LogStore`] on every append.
//!
//! ```text
//! Append path:
//!   hook/interceptor → log_error / log_api_call
//!     → session sequence (unbounded)
//!     → ring mirror (O(1), evicts oldest) → store.set (best effort)
//! ```
//!
//! A failed store write is counted and logged as a warning; it never
//! reaches the caller. The next successful write or [`flush`] rewrites the
//! whole ring, so a transient failure loses nothing that is still in the ring.
//!
//! [`flush`]: DiagnosticsService::flush

use crate::capture::error::{CaptureError, CaptureResult, StoreError};
use crate::capture::ring::RingBuffer;
use crate::capture::store::{
    LogStore, MemoryStore, PersistedLog, API_CALLS_KEY, ERRORS_KEY,
};
use crate::capture::types::{ApiCallRecord, DiagnosticEvent, ErrorReport, PersistedLogs};
use chrono::{DateTime, Utc};
use std::cell::Cell;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// Default cap for the persisted error log
pub const DEFAULT_ERROR_CAPACITY: usize = 100;

/// Default cap for the persisted API call log
pub const DEFAULT_API_CALL_CAPACITY: usize = 50;

thread_local! {
    /// Address of the session mutex this thread currently holds, or 0
    static HELD_SESSION: Cell<usize> = const { Cell::new(0) };
}

/// Settings for a diagnostics service instance
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Maximum persisted diagnostic events
    pub error_capacity: usize,
    /// Maximum persisted API call records
    pub api_call_capacity: usize,
    /// Client identification reported in exports
    pub user_agent: String,
    /// Location the client is currently working against (dashboard base URL)
    pub location: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            error_capacity: DEFAULT_ERROR_CAPACITY,
            api_call_capacity: DEFAULT_API_CALL_CAPACITY,
            user_agent: default_user_agent(),
            location: String::new(),
        }
    }
}

impl ServiceConfig {
    /// Builder method: set the reported location
    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }
}

/// User agent string identifying this client build
pub fn default_user_agent() -> String {
    format!(
        "pitchside/{} ({}; {})",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH
    )
}

/// Session-scoped state guarded by the service mutex
struct Session {
    errors: Vec<DiagnosticEvent>,
    api_calls: Vec<ApiCallRecord>,
    persisted_errors: RingBuffer<DiagnosticEvent>,
    persisted_api_calls: RingBuffer<ApiCallRecord>,
    last_error_at: Option<DateTime<Utc>>,
    last_call_at: Option<DateTime<Utc>>,
    persist_failures: u64,
}

/// Session lock that marks the holding thread until dropped
struct SessionGuard<'a> {
    inner: MutexGuard<'a, Session>,
    previous: usize,
}

impl Deref for SessionGuard<'_> {
    type Target = Session;

    fn deref(&self) -> &Session {
        &self.inner
    }
}

impl DerefMut for SessionGuard<'_> {
    fn deref_mut(&mut self) -> &mut Session {
        &mut self.inner
    }
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        HELD_SESSION.with(|held| held.set(self.previous));
    }
}

/// Counters describing the current session
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CaptureStats {
    pub errors: usize,
    pub api_calls: usize,
    pub persisted_errors: usize,
    pub persisted_api_calls: usize,
    pub persist_failures: u64,
}

impl std::fmt::Display for CaptureStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "errors={} (persisted {}), api_calls={} (persisted {}), persist_failures={}",
            self.errors,
            self.persisted_errors,
            self.api_calls,
            self.persisted_api_calls,
            self.persist_failures
        )
    }
}

/// Process-wide diagnostics capture, shared as `Arc<DiagnosticsService>`
pub struct DiagnosticsService {
    session: Mutex<Session>,
    store: Arc<dyn LogStore>,
    errors_log: PersistedLog<DiagnosticEvent>,
    api_calls_log: PersistedLog<ApiCallRecord>,
    config: ServiceConfig,
    session_id: String,
}

impl DiagnosticsService {
    /// Create a service over `store`, resuming the persisted tails it holds
    pub fn new(store: Arc<dyn LogStore>, config: ServiceConfig) -> Self {
        let errors_log = PersistedLog::new(ERRORS_KEY, config.error_capacity);
        let api_calls_log = PersistedLog::new(API_CALLS_KEY, config.api_call_capacity);

        let persisted_errors = errors_log.load_ring(store.as_ref());
        let persisted_api_calls = api_calls_log.load_ring(store.as_ref());

        let session_id = uuid::Uuid::new_v4().to_string();
        tracing::debug!(
            session_id = %session_id,
            persisted_errors = persisted_errors.len(),
            persisted_api_calls = persisted_api_calls.len(),
            "Diagnostics session started"
        );

        Self {
            session: Mutex::new(Session {
                errors: Vec::new(),
                api_calls: Vec::new(),
                persisted_errors,
                persisted_api_calls,
                last_error_at: None,
                last_call_at: None,
                persist_failures: 0,
            }),
            store,
            errors_log,
            api_calls_log,
            config,
            session_id,
        }
    }

    /// Service backed by a fresh [`MemoryStore`]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()), ServiceConfig::default())
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn LogStore> {
        &self.store
    }

    fn session_addr(&self) -> usize {
        &self.session as *const Mutex<Session> as usize
    }

    /// Whether the current thread is already inside this service's lock
    fn held_by_current_thread(&self) -> bool {
        HELD_SESSION.with(|held| held.get() == self.session_addr())
    }

    /// Diagnostics must keep working after a panic elsewhere poisoned the lock.
    fn lock(&self) -> SessionGuard<'_> {
        let inner = self
            .session
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let previous = HELD_SESSION.with(|held| held.replace(self.session_addr()));
        SessionGuard { inner, previous }
    }

    /// Append a diagnostic event and persist the capped tail
    ///
    /// Events raised on this thread while it is already appending (a store
    /// that logs or panics mid-write) are dropped instead of deadlocking.
    pub fn log_error(&self, event: DiagnosticEvent) {
        self.try_log_error(event);
    }

    /// Variant used from the panic hook; `false` if the event was dropped
    ///
    /// Waits for other threads holding the lock. Only re-entry from the
    /// thread that already holds it is refused.
    pub fn try_log_error(&self, event: DiagnosticEvent) -> bool {
        if self.held_by_current_thread() {
            return false;
        }
        let failure = {
            let mut session = self.lock();
            self.append_error(&mut session, event)
        };
        self.report_persist_failure(ERRORS_KEY, failure);
        true
    }

    /// Append an API call record and persist the capped tail
    pub fn log_api_call(&self, record: ApiCallRecord) {
        if self.held_by_current_thread() {
            return;
        }
        let failure = {
            let mut session = self.lock();
            self.append_api_call(&mut session, record)
        };
        self.report_persist_failure(API_CALLS_KEY, failure);
    }

    fn append_error(&self, session: &mut Session, mut event: DiagnosticEvent) -> Option<StoreError> {
        // Keep timestamps non-decreasing in insertion order
        if let Some(last) = session.last_error_at {
            if event.timestamp < last {
                event.timestamp = last;
            }
        }
        session.last_error_at = Some(event.timestamp);

        session.persisted_errors.push(event.clone());
        session.errors.push(event);

        match self.errors_log.save(self.store.as_ref(), &session.persisted_errors) {
            Ok(()) => None,
            Err(e) => {
                session.persist_failures += 1;
                Some(e)
            }
        }
    }

    fn append_api_call(&self, session: &mut Session, mut record: ApiCallRecord) -> Option<StoreError> {
        if let Some(last) = session.last_call_at {
            if record.timestamp < last {
                record.timestamp = last;
            }
        }
        session.last_call_at = Some(record.timestamp);

        session.persisted_api_calls.push(record.clone());
        session.api_calls.push(record);

        match self
            .api_calls_log
            .save(self.store.as_ref(), &session.persisted_api_calls)
        {
            Ok(()) => None,
            Err(e) => {
                session.persist_failures += 1;
                Some(e)
            }
        }
    }

    // Emitted after the session lock is released.
    fn report_persist_failure(&self, key: &str, failure: Option<StoreError>) {
        if let Some(e) = failure {
            tracing::warn!(key = %key, error = %e, "Failed to persist diagnostics log");
        }
    }

    /// In-memory events for this session, in insertion order
    pub fn errors(&self) -> Vec<DiagnosticEvent> {
        self.lock().errors.clone()
    }

    /// In-memory API calls for this session, in insertion order
    pub fn api_calls(&self) -> Vec<ApiCallRecord> {
        self.lock().api_calls.clone()
    }

    pub fn stats(&self) -> CaptureStats {
        let session = self.lock();
        CaptureStats {
            errors: session.errors.len(),
            api_calls: session.api_calls.len(),
            persisted_errors: session.persisted_errors.len(),
            persisted_api_calls: session.persisted_api_calls.len(),
            persist_failures: session.persist_failures,
        }
    }

    /// Snapshot of the session and the currently persisted logs
    ///
    /// Reads only; the persisted part reflects what the store actually holds.
    pub fn generate_report(&self) -> ErrorReport {
        let (errors, api_calls) = {
            let session = self.lock();
            (session.errors.clone(), session.api_calls.clone())
        };

        let persisted = PersistedLogs {
            errors: self.errors_log.load_or_empty(self.store.as_ref()),
            api_calls: self.api_calls_log.load_or_empty(self.store.as_ref()),
        };

        ErrorReport {
            generated: Utc::now(),
            session_id: self.session_id.clone(),
            user_agent: self.config.user_agent.clone(),
            url: self.config.location.clone(),
            errors,
            api_calls,
            persisted,
        }
    }

    /// Write the report as `error_report_<epoch-millis>.json` under `dir`
    pub fn export_report(&self, dir: &Path) -> CaptureResult<PathBuf> {
        let report = self.generate_report();
        let json = serde_json::to_string_pretty(&report)?;
        let path = dir.join(report.file_name());

        std::fs::create_dir_all(dir)
            .and_then(|_| std::fs::write(&path, json))
            .map_err(|e| CaptureError::Export {
                path: path.clone(),
                error: e.to_string(),
            })?;

        tracing::info!(
            path = %path.display(),
            errors = report.errors.len(),
            api_calls = report.api_calls.len(),
            "Exported diagnostics report"
        );
        Ok(path)
    }

    /// Empty the session and remove both persisted logs
    ///
    /// In-memory state is cleared even if a store removal fails. Both
    /// removals are attempted; the first failure is returned.
    pub fn clear(&self) -> CaptureResult<()> {
        let mut session = self.lock();
        session.errors.clear();
        session.api_calls.clear();
        session.persisted_errors.clear();
        session.persisted_api_calls.clear();
        session.last_error_at = None;
        session.last_call_at = None;

        let errors = self.errors_log.clear(self.store.as_ref());
        let api_calls = self.api_calls_log.clear(self.store.as_ref());
        errors.and(api_calls)?;
        Ok(())
    }

    /// Rewrite both persisted logs from the ring mirrors
    pub fn flush(&self) -> CaptureResult<()> {
        let session = self.lock();
        self.errors_log
            .save(self.store.as_ref(), &session.persisted_errors)?;
        self.api_calls_log
            .save(self.store.as_ref(), &session.persisted_api_calls)?;
        Ok(())
    }
}

impl std::fmt::Debug for DiagnosticsService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiagnosticsService")
            .field("session_id", &self.session_id)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::error::StoreResult;
    use crate::capture::store::FileStore;
    use crate::capture::types::EventKind;
    use chrono::Duration;
    use tempfile::tempdir;

    fn memory_service() -> (DiagnosticsService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let service = DiagnosticsService::new(store.clone(), ServiceConfig::default());
        (service, store)
    }

    #[test]
    fn test_persisted_errors_keep_latest_100() {
        let (service, _store) = memory_service();

        for i in 0..250 {
            service.log_error(DiagnosticEvent::console_error(format!("error {}", i)));
        }

        let report = service.generate_report();
        assert_eq!(report.errors.len(), 250);
        assert_eq!(report.persisted.errors.len(), 100);

        let messages: Vec<_> = report.persisted.errors.iter().map(|e| e.message.clone()).collect();
        let expected: Vec<_> = (150..250).map(|i| format!("error {}", i)).collect();
        assert_eq!(messages, expected);
    }

    #[test]
    fn test_persisted_api_calls_keep_latest_50() {
        let (service, _store) = memory_service();

        for i in 0..75u64 {
            service.log_api_call(ApiCallRecord::new(format!("/call/{}", i), None, 200, i));
        }

        let report = service.generate_report();
        assert_eq!(report.api_calls.len(), 75);
        assert_eq!(report.persisted.api_calls.len(), 50);
        assert_eq!(report.persisted.api_calls[0].url, "/call/25");
        assert_eq!(report.persisted.api_calls[49].url, "/call/74");
    }

    #[test]
    fn test_report_preserves_insertion_order() {
        let (service, _store) = memory_service();

        service.log_error(DiagnosticEvent::uncaught("panic"));
        service.log_error(DiagnosticEvent::api_error("/predictions", "GET", 500, ""));
        service.log_error(DiagnosticEvent::console_error("logged"));

        let report = service.generate_report();
        let kinds: Vec<_> = report.errors.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![EventKind::Uncaught, EventKind::ApiError, EventKind::ConsoleError]
        );
    }

    #[test]
    fn test_timestamps_never_decrease() {
        let (service, _store) = memory_service();
        let now = Utc::now();

        service.log_error(DiagnosticEvent::console_error("first").at(now));
        service.log_error(DiagnosticEvent::console_error("earlier clock").at(now - Duration::seconds(5)));

        let errors = service.errors();
        assert_eq!(errors[1].timestamp, now);
    }

    #[test]
    fn test_clear_empties_everything() {
        let (service, store) = memory_service();
        service.log_error(DiagnosticEvent::console_error("x"));
        service.log_api_call(ApiCallRecord::new("/x", None, 200, 1));

        service.clear().unwrap();
        service.clear().unwrap();

        let report = service.generate_report();
        assert!(report.errors.is_empty());
        assert!(report.api_calls.is_empty());
        assert!(report.persisted.errors.is_empty());
        assert!(report.persisted.api_calls.is_empty());
        assert_eq!(store.get(ERRORS_KEY).unwrap(), None);
        assert_eq!(store.get(API_CALLS_KEY).unwrap(), None);
    }

    #[test]
    fn test_quota_failure_is_swallowed() {
        let store = Arc::new(MemoryStore::with_quota(64));
        let service = DiagnosticsService::new(store, ServiceConfig::default());

        for i in 0..10 {
            service.log_error(DiagnosticEvent::console_error(format!("a long message number {}", i)));
        }

        let stats = service.stats();
        assert_eq!(stats.errors, 10);
        assert!(stats.persist_failures > 0);
    }

    #[test]
    fn test_corrupt_store_is_replaced_on_append() {
        let store = Arc::new(MemoryStore::new());
        store.set(ERRORS_KEY, "not json at all").unwrap();

        let service = DiagnosticsService::new(store.clone(), ServiceConfig::default());
        service.log_error(DiagnosticEvent::console_error("fresh"));

        let report = service.generate_report();
        assert_eq!(report.persisted.errors.len(), 1);
        assert_eq!(report.persisted.errors[0].message, "fresh");
    }

    #[test]
    fn test_resumes_persisted_tail_across_sessions() {
        let dir = tempdir().unwrap();

        {
            let store = Arc::new(FileStore::new(dir.path()));
            let service = DiagnosticsService::new(store, ServiceConfig::default());
            for i in 0..3 {
                service.log_error(DiagnosticEvent::console_error(format!("old {}", i)));
            }
        }

        let store = Arc::new(FileStore::new(dir.path()));
        let service = DiagnosticsService::new(store, ServiceConfig::default());
        service.log_error(DiagnosticEvent::console_error("new"));

        let report = service.generate_report();
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.persisted.errors.len(), 4);
        assert_eq!(report.persisted.errors[3].message, "new");
    }

    #[test]
    fn test_export_report_file() {
        let dir = tempdir().unwrap();
        let (service, _store) = memory_service();
        service.log_error(DiagnosticEvent::console_error("exported"));

        let path = service.export_report(dir.path()).unwrap();
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("error_report_"));
        assert!(name.ends_with(".json"));

        let content = std::fs::read_to_string(&path).unwrap();
        let report: ErrorReport = serde_json::from_str(&content).unwrap();
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.session_id, service.session_id());
    }

    /// Store whose writes take a while, holding the session lock meanwhile
    struct SlowStore {
        inner: MemoryStore,
        delay: std::time::Duration,
    }

    impl LogStore for SlowStore {
        fn get(&self, key: &str) -> StoreResult<Option<String>> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> StoreResult<()> {
            std::thread::sleep(self.delay);
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> StoreResult<()> {
            self.inner.remove(key)
        }
    }

    /// Store that cannot delete the error log
    struct StuckErrorsStore {
        inner: MemoryStore,
    }

    impl LogStore for StuckErrorsStore {
        fn get(&self, key: &str) -> StoreResult<Option<String>> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> StoreResult<()> {
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> StoreResult<()> {
            if key == ERRORS_KEY {
                return Err(StoreError::Io(std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    "read-only",
                )));
            }
            self.inner.remove(key)
        }
    }

    #[test]
    fn test_try_log_error_waits_for_other_threads() {
        let store = Arc::new(SlowStore {
            inner: MemoryStore::new(),
            delay: std::time::Duration::from_millis(300),
        });
        let service = Arc::new(DiagnosticsService::new(store, ServiceConfig::default()));

        let writer = {
            let service = Arc::clone(&service);
            std::thread::spawn(move || {
                service.log_error(DiagnosticEvent::console_error("slow write"));
            })
        };
        // Let the writer take the lock and sit in the store write
        std::thread::sleep(std::time::Duration::from_millis(50));

        assert!(service.try_log_error(DiagnosticEvent::uncaught("meanwhile")));
        writer.join().unwrap();

        let uncaught = service
            .errors()
            .iter()
            .filter(|e| e.kind == EventKind::Uncaught)
            .count();
        assert_eq!(uncaught, 1);
        assert_eq!(service.errors().len(), 2);
    }

    #[test]
    fn test_clear_removes_api_calls_when_errors_removal_fails() {
        let store = Arc::new(StuckErrorsStore {
            inner: MemoryStore::new(),
        });
        let service = DiagnosticsService::new(store.clone(), ServiceConfig::default());
        service.log_error(DiagnosticEvent::console_error("kept on disk"));
        service.log_api_call(ApiCallRecord::new("/api/lineup", None, 200, 3));

        let result = service.clear();
        assert!(matches!(
            result,
            Err(CaptureError::Store(StoreError::Io(_)))
        ));

        assert!(service.errors().is_empty());
        assert_eq!(store.get(API_CALLS_KEY).unwrap(), None);
        assert!(service.generate_report().persisted.api_calls.is_empty());
    }

    #[test]
    fn test_try_log_error_refuses_reentry() {
        let (service, _store) = memory_service();

        let guard = service.lock();
        assert!(!service.try_log_error(DiagnosticEvent::uncaught("while locked")));
        drop(guard);

        assert!(service.try_log_error(DiagnosticEvent::uncaught("after")));
        assert_eq!(service.errors().len(), 1);
    }
}
