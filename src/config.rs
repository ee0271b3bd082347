//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::api::ApiConfig;
use crate::capture::{
    default_user_agent, HookOptions, ServiceConfig, DEFAULT_API_CALL_CAPACITY,
    DEFAULT_ERROR_CAPACITY,
};
use crate::dashboard::{DashboardConfig, PollConfig, Resource};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub capture: CaptureConfig,

    #[serde(default)]
    pub dashboard: DashboardSection,

    #[serde(default)]
    pub api: ApiSection,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Diagnostics capture configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CaptureConfig {
    /// Directory holding the persisted `app_errors` / `app_api_calls` logs
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    #[serde(default = "default_error_capacity")]
    pub error_capacity: usize,

    #[serde(default = "default_api_call_capacity")]
    pub api_call_capacity: usize,

    #[serde(default = "default_true")]
    pub capture_panics: bool,

    #[serde(default)]
    pub force_backtrace: bool,

    /// Where `export` writes report files; current directory when unset
    #[serde(default)]
    pub export_dir: Option<String>,
}

fn default_data_dir() -> String {
    dirs::data_local_dir()
        .map(|p| p.join("pitchside").to_string_lossy().to_string())
        .unwrap_or_else(|| "./pitchside_data".to_string())
}

fn default_error_capacity() -> usize {
    DEFAULT_ERROR_CAPACITY
}

fn default_api_call_capacity() -> usize {
    DEFAULT_API_CALL_CAPACITY
}

fn default_true() -> bool {
    true
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            error_capacity: default_error_capacity(),
            api_call_capacity: default_api_call_capacity(),
            capture_panics: true,
            force_backtrace: false,
            export_dir: None,
        }
    }
}

/// Dashboard API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DashboardSection {
    #[serde(default = "default_dashboard_url")]
    pub base_url: String,

    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    #[serde(default)]
    pub poll_enabled: bool,

    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    #[serde(default = "default_resources")]
    pub resources: Vec<Resource>,
}

fn default_dashboard_url() -> String {
    "http://localhost:8000/api".to_string()
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_poll_interval() -> u64 {
    60
}

fn default_resources() -> Vec<Resource> {
    Resource::all().to_vec()
}

impl Default for DashboardSection {
    fn default() -> Self {
        Self {
            base_url: default_dashboard_url(),
            request_timeout_ms: default_request_timeout_ms(),
            poll_enabled: false,
            poll_interval_secs: default_poll_interval(),
            resources: default_resources(),
        }
    }
}

/// Report API server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiSection {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_true")]
    pub enable_ingest: bool,

    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,

    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8086
}

fn default_max_body_size() -> usize {
    1024 * 1024 // 1 MB
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            enable_ingest: true,
            max_body_size: default_max_body_size(),
            cors_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::parse(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("pitchside").join("config.toml")),
            Some(PathBuf::from("./pitchside.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                match Self::load_with_env(path) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(data_dir) = lookup("PITCHSIDE_DATA_DIR") {
            self.capture.data_dir = data_dir;
        }

        if let Some(url) = lookup("PITCHSIDE_DASHBOARD_URL") {
            self.dashboard.base_url = url;
        }

        if let Some(host) = lookup("PITCHSIDE_API_HOST") {
            self.api.host = host;
        }
        if let Some(port) = lookup("PITCHSIDE_API_PORT") {
            match port.parse() {
                Ok(p) => self.api.port = p,
                Err(_) => tracing::warn!(value = %port, "Ignoring invalid PITCHSIDE_API_PORT"),
            }
        }

        if let Some(level) = lookup("PITCHSIDE_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("PITCHSIDE_LOG_FORMAT") {
            self.logging.format = format;
        }
    }

    /// Directory of the persisted logs
    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.capture.data_dir)
    }

    /// Directory report exports are written to
    pub fn export_dir(&self) -> PathBuf {
        self.capture
            .export_dir
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            error_capacity: self.capture.error_capacity,
            api_call_capacity: self.capture.api_call_capacity,
            user_agent: default_user_agent(),
            location: self.dashboard.base_url.clone(),
        }
    }

    pub fn hook_options(&self) -> HookOptions {
        HookOptions {
            capture_panics: self.capture.capture_panics,
            force_backtrace: self.capture.force_backtrace,
        }
    }

    pub fn dashboard_config(&self) -> DashboardConfig {
        DashboardConfig {
            base_url: self.dashboard.base_url.clone(),
            request_timeout_ms: self.dashboard.request_timeout_ms,
        }
    }

    pub fn poll_config(&self) -> PollConfig {
        PollConfig {
            enabled: self.dashboard.poll_enabled,
            interval_secs: self.dashboard.poll_interval_secs.max(1),
            resources: self.dashboard.resources.clone(),
        }
    }

    pub fn api_config(&self) -> ApiConfig {
        ApiConfig {
            host: self.api.host.clone(),
            port: self.api.port,
            max_body_size: self.api.max_body_size,
            enable_ingest: self.api.enable_ingest,
            cors_origins: self.api.cors_origins.clone(),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Pitchside Configuration
#
# Environment variables override these settings:
# - PITCHSIDE_DATA_DIR
# - PITCHSIDE_DASHBOARD_URL
# - PITCHSIDE_API_HOST
# - PITCHSIDE_API_PORT
# - PITCHSIDE_LOG_LEVEL
# - PITCHSIDE_LOG_FORMAT

[capture]
# Directory for the persisted app_errors / app_api_calls logs
data_dir = "~/.local/share/pitchside"

# Most recent diagnostic events kept across restarts
error_capacity = 100

# Most recent API calls kept across restarts
api_call_capacity = 50

# Record panics as javascript-error events
capture_panics = true

# Capture a backtrace even when RUST_BACKTRACE is unset
force_backtrace = false

# Directory for exported error_report_<ms>.json files
# export_dir = "./reports"

[dashboard]
# Dashboard REST API base URL
base_url = "http://localhost:8000/api"

# Per-request timeout (ms)
request_timeout_ms = 10000

# Periodically refresh dashboard resources
poll_enabled = false

# Refresh interval (seconds)
poll_interval_secs = 60

# Resources to refresh
resources = ["predictions", "lineup", "analytics", "shap", "settings"]

[api]
# Report API host
host = "127.0.0.1"

# Report API port
port = 8086

# Accept events forwarded by front-ends
enable_ingest = true

# Maximum request body (bytes)
max_body_size = 1048576

# Allowed CORS origins (empty allows any)
cors_origins = ["http://localhost:3000", "http://127.0.0.1:3000"]

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.capture.error_capacity, 100);
        assert_eq!(config.capture.api_call_capacity, 50);
        assert_eq!(config.dashboard.base_url, "http://localhost:8000/api");
        assert!(!config.dashboard.poll_enabled);
        assert_eq!(config.api.port, 8086);
    }

    #[test]
    fn test_generated_config_parses() {
        let config = Config::parse(&generate_default_config()).unwrap();
        assert_eq!(config.capture.error_capacity, 100);
        assert_eq!(config.dashboard.resources.len(), 5);
        assert_eq!(config.api.host, "127.0.0.1");
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = Config::parse(
            r#"
            [dashboard]
            base_url = "http://stats.internal/api"
            resources = ["lineup"]
            "#,
        )
        .unwrap();

        assert_eq!(config.dashboard.base_url, "http://stats.internal/api");
        assert_eq!(config.dashboard.resources, vec![Resource::Lineup]);
        assert_eq!(config.capture.api_call_capacity, 50);
        assert_eq!(config.service_config().location, "http://stats.internal/api");
    }

    #[test]
    fn test_unknown_resource_rejected() {
        let result = Config::parse(
            r#"
            [dashboard]
            resources = ["odds"]
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("PITCHSIDE_DATA_DIR", "/tmp/pitchside"),
            ("PITCHSIDE_DASHBOARD_URL", "http://10.0.0.5:8000/api"),
            ("PITCHSIDE_API_PORT", "not-a-port"),
            ("PITCHSIDE_LOG_FORMAT", "json"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.data_dir(), PathBuf::from("/tmp/pitchside"));
        assert_eq!(config.dashboard_config().base_url, "http://10.0.0.5:8000/api");
        assert_eq!(config.api.port, 8086);
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load(Path::new("/nonexistent/pitchside.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pitchside.toml");
        std::fs::write(&path, "[capture]\nerror_capacity = 10\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.service_config().error_capacity, 10);
    }

    #[test]
    fn test_poll_interval_floor() {
        let mut config = Config::default();
        config.dashboard.poll_interval_secs = 0;
        assert_eq!(config.poll_config().interval_secs, 1);
    }
}
