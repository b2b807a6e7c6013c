//! Bench configuration using Figment
//!
//! Configuration is loaded from:
//! 1. a TOML file (default `config/bench.toml`)
//! 2. environment variables prefixed with `BENCHDAQ_`, using `__` between
//!    key path segments
//!
//! ```text
//! BENCHDAQ_APPLICATION__LOG_LEVEL=debug
//! BENCHDAQ_CURVE_TRACER__DEVICE_NAME="Diramics 4F250"
//! BENCHDAQ_CURVE_TRACER__INSTRUMENT__TIMEOUT_MS=60000
//! ```
//!
//! Every workflow section is optional so a single file can hold only the
//! benches present on a given station. Validation runs once at load time.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::analysis::spline::SplineSettings;
use crate::hardware::settle::SettleStrategy;
use crate::instruments::n8975a::NoiseMeasurement;
use crate::rf::network::FrequencyUnit;

/// Default location of the configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "config/bench.toml";

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Figment could not read or deserialize the sources.
    #[error("Configuration load error: {0}")]
    LoadError(#[from] Box<figment::Error>),
    /// A value is out of range or inconsistent.
    #[error("Configuration validation error: {0}")]
    ValidationError(String),
    /// A workflow was requested without its section.
    #[error("Configuration section '{0}' is missing")]
    MissingSection(&'static str),
}

/// Top-level bench configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BenchConfig {
    /// Application settings
    #[serde(default)]
    pub application: ApplicationConfig,
    /// HP 4145B curve tracer workflow
    #[serde(default)]
    pub curve_tracer: Option<CurveTracerConfig>,
    /// Noise figure analyzer capture workflow
    #[serde(default)]
    pub noise_figure: Option<NoiseFigureConfig>,
    /// S-parameter viewer workflow
    #[serde(default)]
    pub smith_view: Option<SmithViewConfig>,
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Logging level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Directory receiving CSV tables, figures and manifests
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// chrono format string for the per-run timestamp in file names
    #[serde(default = "default_timestamp_format")]
    pub timestamp_format: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            output_dir: default_output_dir(),
            timestamp_format: default_timestamp_format(),
        }
    }
}

/// How the host reaches the GPIB device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    /// Raw line-oriented TCP socket (`host:port`)
    Tcp,
    /// Prologix GPIB-ETHERNET controller (`host:port`)
    PrologixTcp,
    /// Prologix GPIB-USB controller (serial device path)
    PrologixSerial,
    /// VISA resource string, e.g. `GPIB0::17::INSTR`
    Visa,
}

impl TransportKind {
    /// Whether the transport needs a GPIB primary address of its own.
    pub fn needs_gpib_address(self) -> bool {
        matches!(self, Self::PrologixTcp | Self::PrologixSerial)
    }
}

/// Connection settings for one instrument.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentConfig {
    /// Transport used to reach the instrument
    pub transport: TransportKind,
    /// Address understood by the transport (`host:port`, device path or VISA string)
    pub resource: String,
    /// GPIB primary address (0-30) behind a Prologix controller
    #[serde(default)]
    pub gpib_address: Option<u8>,
    /// Per-operation timeout in milliseconds
    #[serde(default = "default_instrument_timeout")]
    pub timeout_ms: u64,
    /// Appended to every command
    #[serde(default = "default_terminator")]
    pub write_terminator: String,
    /// Marks the end of a response
    #[serde(default = "default_terminator")]
    pub read_terminator: String,
    /// Serial baud rate (Prologix GPIB-USB ignores it, but the OS driver does not)
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
}

impl InstrumentConfig {
    /// Per-operation timeout as a `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Last byte of the read terminator, used as the line delimiter.
    pub fn read_delimiter(&self) -> u8 {
        self.read_terminator.bytes().last().unwrap_or(b'\n')
    }
}

/// 4145B A/D integration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IntegrationTime {
    /// Fastest, noisiest
    #[default]
    Short,
    /// Between the two in speed and noise
    Medium,
    /// Slowest, averaged over several line cycles
    Long,
}

/// Primary (VAR1) drain-source sweep of the output characteristic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrainSweep {
    /// First VDS value in volts
    pub start: f64,
    /// Last VDS value in volts (inclusive)
    pub stop: f64,
    /// Number of VDS points, endpoints included
    pub points: usize,
    /// Drain current compliance in amperes
    pub compliance: f64,
}

/// Stepped (VAR2) gate-source sweep of the output characteristic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateSweep {
    /// First VGS step in volts
    pub start: f64,
    /// VGS increment per step in volts
    pub step: f64,
    /// Number of VGS steps
    pub points: usize,
    /// Gate current compliance in amperes
    pub compliance: f64,
}

impl GateSweep {
    /// Last VGS value of the stepped sweep.
    pub fn stop(&self) -> f64 {
        self.start + self.step * (self.points.saturating_sub(1)) as f64
    }
}

/// Second pass: VGS swept, VDS stepped, followed by the Gm estimate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferConfig {
    /// Run the transfer sweep and transconductance estimate
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Also write the raw transfer curves (CSV + figure)
    #[serde(default)]
    pub export_curves: bool,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            export_curves: false,
        }
    }
}

/// Pixel size of rendered figures.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FigureSize {
    /// Width in pixels (points for PDF)
    pub width: u32,
    /// Height in pixels (points for PDF)
    pub height: u32,
}

impl Default for FigureSize {
    fn default() -> Self {
        Self {
            width: 1600,
            height: 1200,
        }
    }
}

/// HP 4145B curve tracer workflow configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurveTracerConfig {
    /// Device under test, used in titles and file names
    pub device_name: String,
    /// Instrument connection
    pub instrument: InstrumentConfig,
    /// A/D integration time
    #[serde(default)]
    pub integration_time: IntegrationTime,
    /// How to wait for the measurement to finish
    #[serde(default)]
    pub settle: SettleStrategy,
    /// VDS sweep (VAR1 in the first pass)
    pub drain: DrainSweep,
    /// VGS steps (VAR2 in the first pass)
    pub gate: GateSweep,
    /// Transfer sweep settings
    #[serde(default)]
    pub transfer: TransferConfig,
    /// Spline used for the transconductance estimate
    #[serde(default)]
    pub transconductance: SplineSettings,
    /// Factor applied to returned currents (1000 converts A to mA)
    #[serde(default = "default_current_scale")]
    pub current_scale: f64,
    /// Rendered figure size
    #[serde(default)]
    pub figure: FigureSize,
}

/// Noise figure analyzer capture configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoiseFigureConfig {
    /// Output file stem
    pub title: String,
    /// Instrument connection
    pub instrument: InstrumentConfig,
    /// Trace to fetch
    #[serde(default)]
    pub measurement: NoiseMeasurement,
    /// Fetch the corrected (true) or uncorrected (false) trace
    #[serde(default = "default_true")]
    pub corrected: bool,
}

/// S-parameter viewer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmithViewConfig {
    /// Figure title and output file stem
    pub title: String,
    /// Directory holding the network files
    pub directory: PathBuf,
    /// File extension to pick up; a leading dot is dropped at load
    #[serde(default = "default_extension", deserialize_with = "deserialize_extension")]
    pub extension: String,
    /// Unit used on frequency axes
    #[serde(default)]
    pub frequency_unit: FrequencyUnit,
    /// Where the grid figure is written
    #[serde(default = "default_figure_dir")]
    pub output_dir: PathBuf,
    /// Rendered figure size
    #[serde(default = "default_grid_size")]
    pub figure: FigureSize,
}

// ============================================================================
// Default value functions
// ============================================================================

fn default_log_level() -> String {
    "info".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_timestamp_format() -> String {
    "%d_%m_%Y_%H-%M".to_string()
}

fn default_instrument_timeout() -> u64 {
    30_000
}

fn default_terminator() -> String {
    "\n".to_string()
}

fn default_baud_rate() -> u32 {
    9600
}

fn default_true() -> bool {
    true
}

fn default_current_scale() -> f64 {
    1000.0
}

fn default_extension() -> String {
    "s2p".to_string()
}

/// `".S2P "` and `"S2P"` name the same files.
pub fn bare_extension(extension: &str) -> &str {
    extension.trim().trim_start_matches('.')
}

fn deserialize_extension<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let raw = String::deserialize(deserializer)?;
    Ok(bare_extension(&raw).to_string())
}

fn default_figure_dir() -> PathBuf {
    PathBuf::from("Figs")
}

fn default_grid_size() -> FigureSize {
    FigureSize {
        width: 1000,
        height: 1000,
    }
}

// ============================================================================
// Configuration Loading and Validation
// ============================================================================

impl BenchConfig {
    /// Load configuration from the default file and environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from a specific file path.
    ///
    /// Environment variables override file values. A missing file is not an
    /// error by itself: defaults plus environment may still form a valid
    /// configuration.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config: Self = Figment::new()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("BENCHDAQ_").split("__"))
            .extract()
            .map_err(|e| ConfigError::LoadError(Box::new(e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string (no environment overrides).
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = Figment::new()
            .merge(Toml::string(text))
            .extract()
            .map_err(|e| ConfigError::LoadError(Box::new(e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration after loading.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.application.log_level.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.application.log_level,
                valid_levels.join(", ")
            )));
        }

        if self.application.timestamp_format.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "timestamp_format cannot be empty".to_string(),
            ));
        }

        if let Some(tracer) = &self.curve_tracer {
            tracer.validate()?;
        }
        if let Some(nfa) = &self.noise_figure {
            nfa.validate()?;
        }
        if let Some(view) = &self.smith_view {
            view.validate()?;
        }
        Ok(())
    }

    /// Curve tracer section, or an error naming the missing section.
    pub fn curve_tracer(&self) -> Result<&CurveTracerConfig, ConfigError> {
        self.curve_tracer
            .as_ref()
            .ok_or(ConfigError::MissingSection("curve_tracer"))
    }

    /// Noise figure section, or an error naming the missing section.
    pub fn noise_figure(&self) -> Result<&NoiseFigureConfig, ConfigError> {
        self.noise_figure
            .as_ref()
            .ok_or(ConfigError::MissingSection("noise_figure"))
    }

    /// Smith view section, or an error naming the missing section.
    pub fn smith_view(&self) -> Result<&SmithViewConfig, ConfigError> {
        self.smith_view
            .as_ref()
            .ok_or(ConfigError::MissingSection("smith_view"))
    }

    /// A complete configuration covering all three workflows, used by
    /// `init-config` as a starting point.
    pub fn example() -> Self {
        Self {
            application: ApplicationConfig::default(),
            curve_tracer: Some(CurveTracerConfig {
                device_name: "Diramics 2F200".to_string(),
                instrument: InstrumentConfig {
                    transport: TransportKind::PrologixTcp,
                    resource: "192.168.1.50:1234".to_string(),
                    gpib_address: Some(17),
                    timeout_ms: default_instrument_timeout(),
                    write_terminator: default_terminator(),
                    read_terminator: default_terminator(),
                    baud_rate: default_baud_rate(),
                },
                integration_time: IntegrationTime::Short,
                settle: SettleStrategy::default(),
                drain: DrainSweep {
                    start: 0.0,
                    stop: 1.0,
                    points: 101,
                    compliance: 100e-3,
                },
                gate: GateSweep {
                    start: -0.2,
                    step: 0.05,
                    points: 9,
                    compliance: 100e-6,
                },
                transfer: TransferConfig::default(),
                transconductance: SplineSettings::default(),
                current_scale: default_current_scale(),
                figure: FigureSize::default(),
            }),
            noise_figure: Some(NoiseFigureConfig {
                title: "Diramics_2F200_T50_8mA".to_string(),
                instrument: InstrumentConfig {
                    transport: TransportKind::PrologixTcp,
                    resource: "192.168.1.50:1234".to_string(),
                    gpib_address: Some(8),
                    timeout_ms: default_instrument_timeout(),
                    write_terminator: default_terminator(),
                    read_terminator: default_terminator(),
                    baud_rate: default_baud_rate(),
                },
                measurement: NoiseMeasurement::EffectiveTemperature,
                corrected: true,
            }),
            smith_view: Some(SmithViewConfig {
                title: "Diramics 4F250".to_string(),
                directory: PathBuf::from("4F250_13K"),
                extension: default_extension(),
                frequency_unit: FrequencyUnit::GHz,
                output_dir: default_figure_dir(),
                figure: default_grid_size(),
            }),
        }
    }
}

impl InstrumentConfig {
    fn validate(&self, section: &str) -> Result<(), ConfigError> {
        if self.resource.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "{}: 'resource' cannot be empty",
                section
            )));
        }
        if self.timeout_ms == 0 {
            return Err(ConfigError::ValidationError(format!(
                "{}: 'timeout_ms' must be > 0",
                section
            )));
        }
        if self.read_terminator.is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "{}: 'read_terminator' cannot be empty",
                section
            )));
        }
        if self.transport.needs_gpib_address() {
            match self.gpib_address {
                Some(address) if address <= 30 => {}
                Some(address) => {
                    return Err(ConfigError::ValidationError(format!(
                        "{}: gpib_address {} out of range (0-30)",
                        section, address
                    )))
                }
                None => {
                    return Err(ConfigError::ValidationError(format!(
                        "{}: transport {:?} requires 'gpib_address'",
                        section, self.transport
                    )))
                }
            }
        }
        Ok(())
    }
}

impl CurveTracerConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let section = "curve_tracer";
        if self.device_name.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "{}: 'device_name' cannot be empty",
                section
            )));
        }
        self.instrument.validate("curve_tracer.instrument")?;

        let drain = &self.drain;
        if !(drain.start.is_finite() && drain.stop.is_finite()) || drain.stop <= drain.start {
            return Err(ConfigError::ValidationError(format!(
                "{}.drain: stop ({}) must be greater than start ({})",
                section, drain.stop, drain.start
            )));
        }
        if drain.points < 2 {
            return Err(ConfigError::ValidationError(format!(
                "{}.drain: 'points' must be >= 2",
                section
            )));
        }
        let gate = &self.gate;
        if gate.points == 0 {
            return Err(ConfigError::ValidationError(format!(
                "{}.gate: 'points' must be >= 1",
                section
            )));
        }
        if !gate.start.is_finite() || !gate.step.is_finite() || (gate.points > 1 && gate.step <= 0.0)
        {
            return Err(ConfigError::ValidationError(format!(
                "{}.gate: 'step' must be a positive number",
                section
            )));
        }
        for (name, value) in [("drain", drain.compliance), ("gate", gate.compliance)] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::ValidationError(format!(
                    "{}.{}: 'compliance' must be > 0",
                    section, name
                )));
            }
        }
        if !(self.current_scale.is_finite() && self.current_scale > 0.0) {
            return Err(ConfigError::ValidationError(format!(
                "{}: 'current_scale' must be > 0",
                section
            )));
        }

        let spline = &self.transconductance;
        spline
            .validate()
            .map_err(|msg| ConfigError::ValidationError(format!("{}.transconductance: {}", section, msg)))?;
        if self.transfer.enabled {
            if gate.points < 2 {
                return Err(ConfigError::ValidationError(format!(
                    "{}.transfer: the transfer sweep needs at least 2 gate points",
                    section
                )));
            }
            if drain.points < spline.degree + 2 {
                return Err(ConfigError::ValidationError(format!(
                    "{}.transfer: {} transfer points cannot support a degree {} spline",
                    section, drain.points, spline.degree
                )));
            }
        }
        self.settle
            .validate()
            .map_err(|msg| ConfigError::ValidationError(format!("{}.settle: {}", section, msg)))?;
        Ok(())
    }
}

impl NoiseFigureConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.title.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "noise_figure: 'title' cannot be empty".to_string(),
            ));
        }
        self.instrument.validate("noise_figure.instrument")
    }
}

impl SmithViewConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.title.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "smith_view: 'title' cannot be empty".to_string(),
            ));
        }
        if bare_extension(&self.extension).is_empty() {
            return Err(ConfigError::ValidationError(
                "smith_view: 'extension' cannot be empty".to_string(),
            ));
        }
        if self.directory.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(
                "smith_view: 'directory' cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CURVE_TRACER_TOML: &str = r#"
        [application]
        log_level = "debug"
        output_dir = "runs"

        [curve_tracer]
        device_name = "Diramics 2F200"

        [curve_tracer.instrument]
        transport = "prologix_tcp"
        resource = "10.0.0.5:1234"
        gpib_address = 17

        [curve_tracer.drain]
        start = 0.0
        stop = 1.0
        points = 101
        compliance = 0.1

        [curve_tracer.gate]
        start = -0.2
        step = 0.05
        points = 9
        compliance = 1e-4
    "#;

    #[test]
    fn test_parse_curve_tracer_with_defaults() {
        let config = BenchConfig::from_toml_str(CURVE_TRACER_TOML).unwrap();
        assert_eq!(config.application.log_level, "debug");
        assert_eq!(config.application.output_dir, PathBuf::from("runs"));
        assert_eq!(config.application.timestamp_format, "%d_%m_%Y_%H-%M");

        let tracer = config.curve_tracer().unwrap();
        assert_eq!(tracer.instrument.transport, TransportKind::PrologixTcp);
        assert_eq!(tracer.instrument.timeout_ms, 30_000);
        assert_eq!(tracer.integration_time, IntegrationTime::Short);
        assert!(tracer.transfer.enabled);
        assert!(!tracer.transfer.export_curves);
        assert_eq!(tracer.transconductance.degree, 5);
        assert!((tracer.transconductance.smoothing - 3.0).abs() < 1e-12);
        assert!((tracer.current_scale - 1000.0).abs() < 1e-12);
        assert!((tracer.gate.stop() - 0.2).abs() < 1e-12);
        assert!(matches!(
            tracer.settle,
            SettleStrategy::FixedDelay { delay_ms: 10_000 }
        ));
        assert!(config.noise_figure.is_none());
    }

    #[test]
    fn test_extension_loses_leading_dot() {
        let config = BenchConfig::from_toml_str(
            r#"
            [smith_view]
            title = "LNA"
            directory = "data"
            extension = ".s2p"
            "#,
        )
        .unwrap();
        assert_eq!(config.smith_view().unwrap().extension, "s2p");
        assert_eq!(bare_extension(" .S2P"), "S2P");
    }

    #[test]
    fn test_missing_section_reported() {
        let config = BenchConfig::from_toml_str("").unwrap();
        let err = config.smith_view().unwrap_err();
        assert!(err.to_string().contains("smith_view"));
    }

    #[test]
    fn test_invalid_log_level() {
        let mut config = BenchConfig::default();
        config.application.log_level = "chatty".to_string();
        let result = config.validate();
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Invalid log_level"));
    }

    #[test]
    fn test_reversed_drain_sweep_rejected() {
        let mut config = BenchConfig::example();
        if let Some(tracer) = config.curve_tracer.as_mut() {
            tracer.drain.start = 1.0;
            tracer.drain.stop = 0.0;
        }
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("must be greater than start"));
    }

    #[test]
    fn test_prologix_requires_gpib_address() {
        let mut config = BenchConfig::example();
        if let Some(nfa) = config.noise_figure.as_mut() {
            nfa.instrument.gpib_address = None;
        }
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("requires 'gpib_address'"));
    }

    #[test]
    fn test_gpib_address_out_of_range() {
        let mut config = BenchConfig::example();
        if let Some(tracer) = config.curve_tracer.as_mut() {
            tracer.instrument.gpib_address = Some(31);
        }
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn test_transfer_needs_enough_points_for_spline() {
        let mut config = BenchConfig::example();
        if let Some(tracer) = config.curve_tracer.as_mut() {
            tracer.drain.points = 6;
        }
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("cannot support a degree 5 spline"));
    }

    #[test]
    fn test_unknown_measurement_rejected() {
        let text = r#"
            [noise_figure]
            title = "amp"
            measurement = "PHASE"
            [noise_figure.instrument]
            transport = "tcp"
            resource = "10.0.0.9:5025"
        "#;
        let err = BenchConfig::from_toml_str(text).unwrap_err();
        assert!(matches!(err, ConfigError::LoadError(_)));
    }

    #[test]
    fn test_unknown_transport_rejected() {
        let text = r#"
            [noise_figure]
            title = "amp"
            [noise_figure.instrument]
            transport = "carrier_pigeon"
            resource = "roof"
        "#;
        assert!(BenchConfig::from_toml_str(text).is_err());
    }

    #[test]
    fn test_example_round_trips_through_toml() {
        let example = BenchConfig::example();
        let text = toml::to_string_pretty(&example).unwrap();
        let parsed = BenchConfig::from_toml_str(&text).unwrap();
        assert_eq!(
            parsed.curve_tracer().unwrap().device_name,
            example.curve_tracer().unwrap().device_name
        );
        assert_eq!(
            parsed.smith_view().unwrap().frequency_unit,
            FrequencyUnit::GHz
        );
    }
}
