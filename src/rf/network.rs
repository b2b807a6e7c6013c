//! Two-port network data.

use std::fmt;

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

/// Display and file unit for frequencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum FrequencyUnit {
    /// Hertz
    #[serde(rename = "Hz")]
    Hz,
    /// Kilohertz
    #[serde(rename = "kHz")]
    KHz,
    /// Megahertz
    #[serde(rename = "MHz")]
    MHz,
    /// Gigahertz
    #[default]
    #[serde(rename = "GHz")]
    GHz,
}

impl FrequencyUnit {
    /// Hertz per unit.
    pub fn multiplier(self) -> f64 {
        match self {
            Self::Hz => 1.0,
            Self::KHz => 1e3,
            Self::MHz => 1e6,
            Self::GHz => 1e9,
        }
    }

    /// Unit symbol.
    pub fn label(self) -> &'static str {
        match self {
            Self::Hz => "Hz",
            Self::KHz => "kHz",
            Self::MHz => "MHz",
            Self::GHz => "GHz",
        }
    }

    /// Case-insensitive parse of a Touchstone unit token.
    pub fn from_token(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "hz" => Some(Self::Hz),
            "khz" => Some(Self::KHz),
            "mhz" => Some(Self::MHz),
            "ghz" => Some(Self::GHz),
            _ => None,
        }
    }
}

impl fmt::Display for FrequencyUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// 2x2 scattering matrix at one frequency, indexed `[m][n]` for `S(m+1)(n+1)`.
pub type SMatrix = [[Complex64; 2]; 2];

/// One record of a two-port noise parameter block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseParameters {
    /// Frequency in Hz
    pub frequency_hz: f64,
    /// Minimum noise figure in dB
    pub nf_min_db: f64,
    /// Optimum source reflection coefficient
    pub gamma_opt: Complex64,
    /// Equivalent noise resistance normalised to the reference impedance
    pub rn_normalized: f64,
}

/// S-parameters of one two-port over frequency.
#[derive(Debug, Clone)]
pub struct TwoPortNetwork {
    name: String,
    frequencies_hz: Vec<f64>,
    s: Vec<SMatrix>,
    z0: f64,
    noise: Vec<NoiseParameters>,
}

impl TwoPortNetwork {
    /// `s` holds one matrix per entry of `frequencies_hz`.
    pub fn new(
        name: impl Into<String>,
        frequencies_hz: Vec<f64>,
        s: Vec<SMatrix>,
        z0: f64,
        noise: Vec<NoiseParameters>,
    ) -> Self {
        Self {
            name: name.into(),
            frequencies_hz,
            s,
            z0,
            noise,
        }
    }

    /// File stem the network was read from.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of frequency points.
    pub fn len(&self) -> usize {
        self.frequencies_hz.len()
    }

    /// True for a network without frequency points.
    pub fn is_empty(&self) -> bool {
        self.frequencies_hz.is_empty()
    }

    /// Frequencies in Hz.
    pub fn frequencies_hz(&self) -> &[f64] {
        &self.frequencies_hz
    }

    /// Frequencies expressed in `unit`.
    pub fn frequencies(&self, unit: FrequencyUnit) -> Vec<f64> {
        let scale = unit.multiplier();
        self.frequencies_hz.iter().map(|f| f / scale).collect()
    }

    /// `S(m+1)(n+1)` over frequency; `m` and `n` are 0 or 1.
    pub fn s(&self, m: usize, n: usize) -> Vec<Complex64> {
        self.s.iter().map(|matrix| matrix[m][n]).collect()
    }

    /// `|S(m+1)(n+1)|` in dB over frequency.
    pub fn s_db(&self, m: usize, n: usize) -> Vec<f64> {
        self.s
            .iter()
            .map(|matrix| 20.0 * matrix[m][n].norm().log10())
            .collect()
    }

    /// Reference impedance in ohms.
    pub fn z0(&self) -> f64 {
        self.z0
    }

    /// Noise parameter block, empty when the file has none.
    pub fn noise(&self) -> &[NoiseParameters] {
        &self.noise
    }
}
