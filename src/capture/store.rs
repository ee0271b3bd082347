//! Persisted log stores
//!
//! A [`LogStore`] is a small string key/value store, the durable side of the
//! capture layer. Each capped log lives under one key as a UTF-8 JSON array:
//!
//! - `app_errors`: up to 100 `DiagnosticEvent`s
//! - `app_api_calls`: up to 50 `ApiCallRecord`s
//!
//! [`FileStore`] keeps one `<key>.json` file per key in a directory and
//! replaces files atomically. [`MemoryStore`] is process-local, with an
//! optional byte quota.

use crate::capture::error::{StoreError, StoreResult};
use crate::capture::ring::RingBuffer;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Storage key for persisted diagnostic events
pub const ERRORS_KEY: &str = "app_errors";

/// Storage key for persisted API call records
pub const API_CALLS_KEY: &str = "app_api_calls";

/// Durable string key/value storage for capped logs
pub trait LogStore: Send + Sync {
    /// Read the value under `key`, `None` if absent
    fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Replace the value under `key`
    fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Remove `key`; removing an absent key is not an error
    fn remove(&self, key: &str) -> StoreResult<()>;
}

fn validate_key(key: &str) -> StoreResult<()> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidKey(key.to_string()))
    }
}

/// Directory-backed store, one JSON file per key
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open a store rooted at `dir`; the directory is created on first write
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> StoreResult<PathBuf> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl LogStore for FileStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let path = self.path_for(key)?;
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => Err(StoreError::Corrupt {
                key: key.to_string(),
                error: e.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let path = self.path_for(key)?;
        std::fs::create_dir_all(&self.dir)?;

        // Write-then-rename so readers never see a half-written array
        let tmp = self.dir.join(format!("{}.json.tmp", key));
        std::fs::write(&tmp, value)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        let path = self.path_for(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-process store with an optional total byte quota
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
    quota_bytes: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that rejects writes once stored values would exceed `quota_bytes`
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            quota_bytes: Some(quota_bytes),
        }
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl LogStore for MemoryStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.entries().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let mut entries = self.entries();

        if let Some(quota) = self.quota_bytes {
            let used: usize = entries
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(_, v)| v.len())
                .sum();
            let available = quota.saturating_sub(used);
            if value.len() > available {
                return Err(StoreError::QuotaExceeded {
                    key: key.to_string(),
                    needed: value.len(),
                    available,
                });
            }
        }

        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        self.entries().remove(key);
        Ok(())
    }
}

/// Typed, capped JSON-array projection stored under one key
#[derive(Debug, Clone)]
pub struct PersistedLog<T> {
    key: String,
    capacity: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<T> PersistedLog<T>
where
    T: Serialize + DeserializeOwned + Clone,
{
    pub fn new(key: impl Into<String>, capacity: usize) -> Self {
        Self {
            key: key.into(),
            capacity,
            _marker: PhantomData,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Read the stored array, keeping at most the newest `capacity` entries
    pub fn load(&self, store: &dyn LogStore) -> StoreResult<Vec<T>> {
        let Some(content) = store.get(&self.key)? else {
            return Ok(Vec::new());
        };

        let mut items: Vec<T> =
            serde_json::from_str(&content).map_err(|e| StoreError::Corrupt {
                key: self.key.clone(),
                error: e.to_string(),
            })?;

        if items.len() > self.capacity {
            items.drain(..items.len() - self.capacity);
        }
        Ok(items)
    }

    /// Like [`load`](Self::load), treating unreadable content as empty
    pub fn load_or_empty(&self, store: &dyn LogStore) -> Vec<T> {
        match self.load(store) {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "Ignoring unreadable persisted log");
                Vec::new()
            }
        }
    }

    /// Load into a ring sized to this log's capacity
    pub fn load_ring(&self, store: &dyn LogStore) -> RingBuffer<T> {
        RingBuffer::from_vec(self.capacity, self.load_or_empty(store))
    }

    /// Overwrite the stored array with the ring's contents
    pub fn save(&self, store: &dyn LogStore, ring: &RingBuffer<T>) -> StoreResult<()> {
        let items: Vec<&T> = ring.iter().collect();
        let json = serde_json::to_string(&items)?;
        store.set(&self.key, &json)
    }

    pub fn clear(&self, store: &dyn LogStore) -> StoreResult<()> {
        store.remove(&self.key)
    }
}
