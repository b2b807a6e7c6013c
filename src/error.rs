//! Custom error types for the application.
//!
//! `BenchError` is the single fault taxonomy shared by every workflow. Each
//! variant corresponds to one way a bench run can fail:
//!
//! - **`Config`**: loading or validating the TOML/environment configuration.
//! - **`Io`**, **`Csv`**, **`Json`**: file system and export failures.
//! - **`Timeout`**: an instrument did not answer within its configured bound.
//! - **`Transport`**, **`NotConnected`**, **`Unsupported`**: link-level faults
//!   and operations the selected transport cannot perform.
//! - **`Parse`**, **`ShapeMismatch`**: instrument replies that do not match
//!   the expected format or sweep shape.
//! - **`Numerical`**: an ill-conditioned spline fit.
//! - **`Touchstone`**: malformed network parameter files.
//! - **`Plot`**: figure rendering failures.
//! - **`Logging`**: the tracing subscriber could not be installed.
//!
//! `#[from]` conversions let the `?` operator lift library errors directly.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::config::ConfigError;

/// Convenience alias for results using the application error type.
pub type AppResult<T> = std::result::Result<T, BenchError>;

/// Every failure a bench run can report.
#[derive(Error, Debug)]
pub enum BenchError {
    /// Configuration could not be loaded or is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// File system failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV encoding or decoding failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Manifest serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// No answer within the bound.
    #[error("Timed out after {after:?} during {operation}")]
    Timeout {
        /// What was being waited for
        operation: String,
        /// Bound that expired
        after: Duration,
    },

    /// The link failed while talking to the instrument.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The session was used after it was closed.
    #[error("Instrument not connected")]
    NotConnected,

    /// The transport cannot perform this operation.
    #[error("Operation not supported: {0}")]
    Unsupported(String),

    /// Support for this transport was not compiled in.
    #[error("Feature '{0}' is not enabled. Please build with --features {0}")]
    FeatureNotEnabled(String),

    /// A reply or file value could not be interpreted.
    #[error("Parse error: {0}")]
    Parse(String),

    /// A reply held the wrong number of readings.
    #[error("Reply holds {found} values, expected {expected}")]
    ShapeMismatch {
        /// Readings the sweep shape requires
        expected: usize,
        /// Readings actually received
        found: usize,
    },

    /// Bad axis parameters or an ill-conditioned fit.
    #[error("Numerical error: {0}")]
    Numerical(String),

    /// A network file is malformed.
    #[error("Touchstone error in {}: {message}", path.display())]
    Touchstone {
        /// File being read
        path: PathBuf,
        /// Location and cause
        message: String,
    },

    /// Figure rendering or encoding failed.
    #[error("Plot error: {0}")]
    Plot(String),

    /// A global tracing subscriber is already installed.
    #[error("Logging setup failed: {0}")]
    Logging(String),
}

impl BenchError {
    /// Build a timeout error for the named operation.
    pub fn timeout(operation: impl Into<String>, after: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            after,
        }
    }
}
