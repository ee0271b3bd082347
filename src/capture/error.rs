//! Capture layer error types
//!
//! Errors raised by the persisted log stores and the diagnostics service.
//! Store failures are swallowed by the service's append path; they surface
//! only from explicit operations such as export.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from a [`LogStore`](crate::capture::store::LogStore) backend
#[derive(Error, Debug)]
pub enum StoreError {
    /// I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Writing the value would exceed the store's quota
    #[error("Quota exceeded writing {key}: {needed} bytes needed, {available} available")]
    QuotaExceeded {
        key: String,
        needed: usize,
        available: usize,
    },

    /// Stored content could not be decoded
    #[error("Corrupt content under {key}: {error}")]
    Corrupt { key: String, error: String },

    /// Serialization of a value failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Key contains characters that cannot map to a storage location
    #[error("Invalid key: {0}")]
    InvalidKey(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors from the diagnostics service's explicit operations
#[derive(Error, Debug)]
pub enum CaptureError {
    /// Persisted store failure
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Report serialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Report file could not be written
    #[error("Failed to write report {path:?}: {error}")]
    Export { path: PathBuf, error: String },
}

/// Result type alias for capture operations
pub type CaptureResult<T> = Result<T, CaptureError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quota_error_display() {
        let err = StoreError::QuotaExceeded {
            key: "app_errors".to_string(),
            needed: 512,
            available: 100,
        };
        assert_eq!(
            err.to_string(),
            "Quota exceeded writing app_errors: 512 bytes needed, 100 available"
        );
    }

    #[test]
    fn test_store_error_converts_into_capture_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let err: CaptureError = StoreError::from(io_err).into();
        assert!(matches!(err, CaptureError::Store(StoreError::Io(_))));
    }
}
