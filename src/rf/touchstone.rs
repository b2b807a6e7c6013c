//! Touchstone v1 reader for two-port (`.s2p`) files.
//!
//! ```text
//! ! comment
//! # GHz S MA R 50
//! 1.0  0.9 -20  3.1 160  0.01 80  0.5 -30
//! ```
//!
//! Data records hold nine values in the order `f S11 S21 S12 S22` and may be
//! split across lines. A record whose frequency does not exceed the previous
//! one starts the noise parameter block (five values per record).

use std::fs;
use std::path::Path;

use num_complex::Complex64;
use tracing::debug;

use super::network::{FrequencyUnit, NoiseParameters, SMatrix, TwoPortNetwork};
use crate::error::{AppResult, BenchError};

const S_RECORD_LEN: usize = 9;
const NOISE_RECORD_LEN: usize = 5;

/// Number pair encoding of complex values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFormat {
    /// Real, imaginary
    RealImaginary,
    /// Linear magnitude, angle in degrees
    MagnitudeAngle,
    /// Magnitude in dB, angle in degrees
    DecibelAngle,
}

impl DataFormat {
    fn complex(self, a: f64, b: f64) -> Complex64 {
        match self {
            Self::RealImaginary => Complex64::new(a, b),
            Self::MagnitudeAngle => Complex64::from_polar(a, b.to_radians()),
            Self::DecibelAngle => Complex64::from_polar(10f64.powf(a / 20.0), b.to_radians()),
        }
    }
}

/// Contents of the `#` option line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OptionLine {
    /// Frequency unit of the data lines
    pub unit: FrequencyUnit,
    /// Pair format of the data lines
    pub format: DataFormat,
    /// Reference impedance in ohms
    pub z0: f64,
}

impl Default for OptionLine {
    fn default() -> Self {
        Self {
            unit: FrequencyUnit::GHz,
            format: DataFormat::MagnitudeAngle,
            z0: 50.0,
        }
    }
}

impl OptionLine {
    fn parse(line: &str) -> Result<Self, String> {
        let mut options = Self::default();
        let mut tokens = line.trim_start_matches('#').split_whitespace();
        while let Some(token) = tokens.next() {
            if let Some(unit) = FrequencyUnit::from_token(token) {
                options.unit = unit;
                continue;
            }
            match token.to_ascii_uppercase().as_str() {
                "S" => {}
                "Y" | "Z" | "H" | "G" => {
                    return Err(format!(
                        "{} parameters are not supported, only S",
                        token.to_ascii_uppercase()
                    ))
                }
                "RI" => options.format = DataFormat::RealImaginary,
                "MA" => options.format = DataFormat::MagnitudeAngle,
                "DB" => options.format = DataFormat::DecibelAngle,
                "R" => {
                    let value = tokens
                        .next()
                        .ok_or_else(|| "option 'R' needs a reference impedance".to_string())?;
                    options.z0 = value
                        .parse::<f64>()
                        .ok()
                        .filter(|z| *z > 0.0)
                        .ok_or_else(|| format!("invalid reference impedance '{}'", value))?;
                }
                _ => return Err(format!("unknown option '{}'", token)),
            }
        }
        Ok(options)
    }
}

/// Read a `.s2p` file; the network is named after the file stem.
pub fn read_touchstone(path: &Path) -> AppResult<TwoPortNetwork> {
    let text = fs::read_to_string(path)?;
    let name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    parse_touchstone(&text, &name, path)
}

/// Parse Touchstone text; `path` only labels errors.
pub fn parse_touchstone(text: &str, name: &str, path: &Path) -> AppResult<TwoPortNetwork> {
    let fault = |line: usize, message: String| BenchError::Touchstone {
        path: path.to_path_buf(),
        message: format!("line {}: {}", line, message),
    };

    let mut options: Option<OptionLine> = None;
    let mut frequencies = Vec::new();
    let mut s: Vec<SMatrix> = Vec::new();
    let mut noise: Vec<NoiseParameters> = Vec::new();
    let mut last_raw_frequency = f64::NEG_INFINITY;
    let mut in_noise = false;
    let mut pending: Vec<f64> = Vec::with_capacity(S_RECORD_LEN);
    let mut record_line = 0;

    for (index, raw) in text.lines().enumerate() {
        let line_no = index + 1;
        let line = raw.split('!').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with('#') {
            if options.is_none() {
                options = Some(OptionLine::parse(line).map_err(|m| fault(line_no, m))?);
            } else {
                debug!(line = line_no, "Ignoring repeated option line");
            }
            continue;
        }
        let opts = *options.get_or_insert_with(OptionLine::default);

        for token in line.split_whitespace() {
            let value = token
                .parse::<f64>()
                .map_err(|_| fault(line_no, format!("'{}' is not a number", token)))?;

            if pending.is_empty() {
                record_line = line_no;
                if !in_noise && !frequencies.is_empty() && value <= last_raw_frequency {
                    in_noise = true;
                    last_raw_frequency = f64::NEG_INFINITY;
                }
            }
            pending.push(value);

            let width = if in_noise {
                NOISE_RECORD_LEN
            } else {
                S_RECORD_LEN
            };
            if pending.len() < width {
                continue;
            }

            let f = pending[0];
            if in_noise {
                if f <= last_raw_frequency {
                    return Err(fault(
                        record_line,
                        "noise block frequencies must increase".to_string(),
                    ));
                }
                noise.push(NoiseParameters {
                    frequency_hz: f * opts.unit.multiplier(),
                    nf_min_db: pending[1],
                    gamma_opt: DataFormat::MagnitudeAngle.complex(pending[2], pending[3]),
                    rn_normalized: pending[4],
                });
            } else {
                let c = |i: usize| opts.format.complex(pending[i], pending[i + 1]);
                s.push([[c(1), c(5)], [c(3), c(7)]]);
                frequencies.push(f * opts.unit.multiplier());
            }
            last_raw_frequency = f;
            pending.clear();
        }
    }

    if !pending.is_empty() {
        return Err(fault(
            record_line,
            format!(
                "incomplete record: {} values, expected {}",
                pending.len(),
                if in_noise {
                    NOISE_RECORD_LEN
                } else {
                    S_RECORD_LEN
                }
            ),
        ));
    }
    if frequencies.is_empty() {
        return Err(BenchError::Touchstone {
            path: path.to_path_buf(),
            message: "no network data".to_string(),
        });
    }

    let opts = options.unwrap_or_default();
    debug!(
        network = name,
        points = frequencies.len(),
        noise_points = noise.len(),
        "Parsed Touchstone file"
    );
    Ok(TwoPortNetwork::new(name, frequencies, s, opts.z0, noise))
}
