//! Tracing initialisation.
//!
//! `RUST_LOG` wins when set; otherwise the configured level applies to every
//! target.

use tracing_subscriber::EnvFilter;

use crate::config::ConfigError;
use crate::error::{AppResult, BenchError};

/// Install the global `fmt` subscriber.
///
/// A level that is not a valid filter directive is a configuration fault;
/// a second installation is a [`BenchError::Logging`] fault.
pub fn init(level: &str) -> AppResult<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => level_filter(level)?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|e| BenchError::Logging(format!("tracing already initialised: {}", e)))
}

/// Filter for the configured `level`, ignoring `RUST_LOG`.
pub fn level_filter(level: &str) -> AppResult<EnvFilter> {
    EnvFilter::try_new(level).map_err(|e| {
        ConfigError::ValidationError(format!("invalid log level '{}': {}", level, e)).into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_filter_accepts_directives() {
        assert!(level_filter("debug").is_ok());
        assert!(level_filter("bench_daq=trace,warn").is_ok());
    }

    #[test]
    fn test_bad_level_is_config_fault() {
        let err = level_filter("bench_daq=loud").unwrap_err();
        assert!(matches!(
            err,
            BenchError::Config(ConfigError::ValidationError(_))
        ));
        assert!(err.to_string().contains("bench_daq=loud"));
    }
}
