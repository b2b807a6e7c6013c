//! Agilent N8975A-class noise figure analyzer.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::analysis::reply::parse_comma_separated;
use crate::analysis::Axis;
use crate::error::{AppResult, BenchError};
use crate::hardware::Transport;

/// Trace the analyzer can return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum NoiseMeasurement {
    /// Noise figure in dB
    #[serde(rename = "NFIG")]
    NoiseFigure,
    /// Linear noise factor
    #[serde(rename = "NFAC")]
    NoiseFactor,
    /// Gain in dB
    #[serde(rename = "GAIN")]
    Gain,
    /// Effective noise temperature in kelvin
    #[default]
    #[serde(rename = "TEFF")]
    EffectiveTemperature,
    /// Hot power density
    #[serde(rename = "PHOT")]
    HotPower,
    /// Cold power density
    #[serde(rename = "PCOL")]
    ColdPower,
}

impl NoiseMeasurement {
    /// SCPI mnemonic, also used as the CSV column name.
    pub fn mnemonic(self) -> &'static str {
        match self {
            Self::NoiseFigure => "NFIG",
            Self::NoiseFactor => "NFAC",
            Self::Gain => "GAIN",
            Self::EffectiveTemperature => "TEFF",
            Self::HotPower => "PHOT",
            Self::ColdPower => "PCOL",
        }
    }

    /// `FETC:CORR:<m>?` or `FETC:UNC:<m>?`.
    pub fn fetch_command(self, corrected: bool) -> String {
        let source = if corrected { "CORR" } else { "UNC" };
        format!("FETC:{}:{}?", source, self.mnemonic())
    }
}

impl fmt::Display for NoiseMeasurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// One fetched trace with its frequency axis (Hz).
#[derive(Debug, Clone)]
pub struct NoiseTrace {
    /// Trace that was fetched
    pub measurement: NoiseMeasurement,
    /// Sweep frequencies in Hz
    pub frequencies: Axis,
    /// One value per frequency point
    pub values: Vec<f64>,
}

/// N8975A session speaking SCPI.
pub struct NoiseFigureAnalyzer {
    transport: Box<dyn Transport>,
}

impl NoiseFigureAnalyzer {
    /// Driver over an open link.
    pub fn new(transport: Box<dyn Transport>) -> Self {
        Self { transport }
    }

    /// `*IDN?` reply, trimmed.
    pub async fn identify(&mut self) -> AppResult<String> {
        let id = self.transport.query("*IDN?").await?;
        let id = id.trim().to_string();
        info!(identity = %id, link = %self.transport.describe(), "Connected to noise figure analyzer");
        Ok(id)
    }

    /// Closed linear axis from the analyzer's start, stop and point count.
    pub async fn frequency_axis(&mut self) -> AppResult<Axis> {
        let start = self.query_number("SENS:FREQ:STAR?").await?;
        let stop = self.query_number("SENS:FREQ:STOP?").await?;
        let points = self.query_number("SENS:SWE:POIN?").await?;
        if points < 1.0 || points.fract() != 0.0 {
            return Err(BenchError::Parse(format!(
                "sweep point count must be a positive integer, got {}",
                points
            )));
        }
        info!(start, stop, points, "Frequency sweep");
        Axis::linspace(start, stop, points as usize)
    }

    /// Fetch a trace and require exactly `expected` values.
    pub async fn fetch(
        &mut self,
        measurement: NoiseMeasurement,
        corrected: bool,
        expected: usize,
    ) -> AppResult<Vec<f64>> {
        let reply = self
            .transport
            .query(&measurement.fetch_command(corrected))
            .await?;
        let values = parse_comma_separated(&reply)?;
        if values.len() != expected {
            return Err(BenchError::ShapeMismatch {
                expected,
                found: values.len(),
            });
        }
        Ok(values)
    }

    /// Frequency axis plus the configured trace.
    pub async fn capture(
        &mut self,
        measurement: NoiseMeasurement,
        corrected: bool,
    ) -> AppResult<NoiseTrace> {
        let frequencies = self.frequency_axis().await?;
        let values = self.fetch(measurement, corrected, frequencies.len()).await?;
        Ok(NoiseTrace {
            measurement,
            frequencies,
            values,
        })
    }

    /// Release the link.
    pub async fn close(mut self) -> AppResult<()> {
        self.transport.close().await
    }

    async fn query_number(&mut self, command: &str) -> AppResult<f64> {
        let reply = self.transport.query(command).await?;
        reply
            .trim()
            .parse::<f64>()
            .map_err(|e| BenchError::Parse(format!("reply to {} '{}': {}", command, reply.trim(), e)))
    }
}
