//! Logging setup
//!
//! One subscriber per process: an `EnvFilter`, a fmt layer (pretty or
//! json), and optionally the [`ErrorCaptureLayer`] so ERROR events also
//! land in the diagnostics session.

use crate::capture::ErrorCaptureLayer;
use crate::config::LoggingConfig;
use tracing_subscriber::{
    layer::SubscriberExt, util::SubscriberInitExt, util::TryInitError, EnvFilter,
};

/// Build the filter: `RUST_LOG` wins, otherwise the configured level.
///
/// A bare level such as `debug` applies to this crate only; anything
/// containing a directive (`=` or `,`) is used verbatim.
pub fn env_filter(logging: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives(&logging.level)))
}

fn directives(level: &str) -> String {
    if level.contains('=') || level.contains(',') {
        level.to_string()
    } else {
        format!("pitchside={},tower_http=info", level)
    }
}

/// Install the global subscriber
pub fn init_tracing(
    logging: &LoggingConfig,
    capture: Option<ErrorCaptureLayer>,
) -> Result<(), TryInitError> {
    let json = logging.format.eq_ignore_ascii_case("json");

    tracing_subscriber::registry()
        .with(env_filter(logging))
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(|| tracing_subscriber::fmt::layer()))
        .with(capture)
        .try_init()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_level_scoped_to_crate() {
        assert_eq!(directives("debug"), "pitchside=debug,tower_http=info");
    }

    #[test]
    fn test_directives_used_verbatim() {
        assert_eq!(directives("pitchside=trace,hyper=warn"), "pitchside=trace,hyper=warn");
    }
}
