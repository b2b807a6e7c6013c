//! Bench configuration system
//!
//! Configuration management using Figment. Sources, in order of precedence:
//! 1. Environment variables prefixed with `BENCHDAQ_` (`__` separates keys)
//! 2. TOML configuration file (default: `config/bench.toml`)
//!
//! # Example
//!
//! ```no_run
//! use bench_daq::config::BenchConfig;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = BenchConfig::load_from("config/bench.toml")?;
//!     let tracer = config.curve_tracer()?;
//!     println!("Device: {}", tracer.device_name);
//!     Ok(())
//! }
//! ```

pub mod bench_config;

pub use bench_config::{
    bare_extension, ApplicationConfig, BenchConfig, ConfigError, CurveTracerConfig, DrainSweep, FigureSize,
    GateSweep, InstrumentConfig, IntegrationTime, NoiseFigureConfig, SmithViewConfig,
    TransferConfig, TransportKind, DEFAULT_CONFIG_PATH,
};
