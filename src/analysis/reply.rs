//! Instrument reply parsing.
//!
//! The 4145B returns data as a free-form ASCII list where every value may be
//! preceded by a one-letter status flag, e.g. `N-1.234E-03,N 2.500E-03`.
//! Noise figure analyzers return plain comma-separated floats.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

use crate::error::{AppResult, BenchError};

/// Optional status letter, optional whitespace, then a signed decimal or
/// scientific literal.
static READING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:([A-Za-z])\s*)?([+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?)")
        .expect("reading pattern is a valid regex")
});

/// Per-value status reported by the 4145B.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadingStatus {
    /// `N`: normal data
    Normal,
    /// `L`: interval too short
    IntervalTooShort,
    /// `V`: A/D converter overflow
    Overflow,
    /// `X`: oscillation
    Oscillation,
    /// `C`: another channel reached compliance
    OtherChannelCompliance,
    /// `T`: this channel reached compliance
    Compliance,
    /// Any other leading letter
    Other(char),
}

impl ReadingStatus {
    /// Classify a status letter.
    pub fn from_flag(flag: char) -> Self {
        match flag.to_ascii_uppercase() {
            'N' => Self::Normal,
            'L' => Self::IntervalTooShort,
            'V' => Self::Overflow,
            'X' => Self::Oscillation,
            'C' => Self::OtherChannelCompliance,
            'T' => Self::Compliance,
            other => Self::Other(other),
        }
    }

    /// Whether the flag marks a questionable reading.
    pub fn is_flagged(&self) -> bool {
        matches!(
            self,
            Self::IntervalTooShort
                | Self::Overflow
                | Self::Oscillation
                | Self::OtherChannelCompliance
                | Self::Compliance
        )
    }
}

/// One numeric value extracted from a reply.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    /// Status letter, `None` when the reply carried no prefix
    pub status: Option<ReadingStatus>,
    /// Numeric value as sent
    pub value: f64,
}

/// Extract every reading in reply order.
pub fn parse_readings(text: &str) -> AppResult<Vec<Reading>> {
    READING
        .captures_iter(text)
        .map(|caps| {
            let literal = &caps[2];
            let value = literal
                .parse::<f64>()
                .map_err(|e| BenchError::Parse(format!("'{}': {}", literal, e)))?;
            let status = caps
                .get(1)
                .and_then(|m| m.as_str().chars().next())
                .map(ReadingStatus::from_flag);
            Ok(Reading { status, value })
        })
        .collect()
}

/// Extract values and require exactly `expected` of them.
///
/// Readings carrying a warning flag are logged but kept; the count contract
/// is what decides success.
pub fn parse_values_exact(text: &str, expected: usize) -> AppResult<Vec<f64>> {
    let readings = parse_readings(text)?;
    if readings.len() != expected {
        return Err(BenchError::ShapeMismatch {
            expected,
            found: readings.len(),
        });
    }

    let flagged: Vec<(usize, ReadingStatus)> = readings
        .iter()
        .enumerate()
        .filter_map(|(i, r)| r.status.filter(|s| s.is_flagged()).map(|s| (i, s)))
        .collect();
    if let Some((first, status)) = flagged.first() {
        warn!(
            count = flagged.len(),
            first_index = first,
            first_status = ?status,
            "Reply contains flagged readings"
        );
    }

    Ok(readings.into_iter().map(|r| r.value).collect())
}

/// Parse a plain comma-separated list of floats.
///
/// Empty fields (a trailing comma, or blank padding) are skipped; anything
/// else that is not a number is an error.
pub fn parse_comma_separated(text: &str) -> AppResult<Vec<f64>> {
    text.split(',')
        .map(str::trim)
        .filter(|field| !field.is_empty())
        .map(|field| {
            field
                .parse::<f64>()
                .map_err(|e| BenchError::Parse(format!("'{}': {}", field, e)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[test]
    fn test_status_prefixed_and_bare_values() {
        let values = parse_values_exact("A 1.0E-3, -2.5E-4,", 2).unwrap();
        assert_eq!(values, vec![0.001, -0.00025]);
    }

    #[test]
    fn test_4145b_style_reply() {
        let readings = parse_readings("N 1.250E-03,N-2.000E-06,T 1.000E-01\r\n").unwrap();
        assert_eq!(readings.len(), 3);
        assert_eq!(readings[0].status, Some(ReadingStatus::Normal));
        assert!((readings[0].value - 1.25e-3).abs() < 1e-15);
        assert!((readings[1].value + 2.0e-6).abs() < 1e-18);
        assert_eq!(readings[2].status, Some(ReadingStatus::Compliance));
    }

    #[test]
    fn test_exponent_is_not_mistaken_for_status() {
        let readings = parse_readings("5.0E+01,6E2").unwrap();
        let values: Vec<f64> = readings.iter().map(|r| r.value).collect();
        assert_eq!(values, vec![50.0, 600.0]);
        assert!(readings.iter().all(|r| r.status.is_none()));
    }

    #[test]
    fn test_count_mismatch_is_shape_error() {
        let err = parse_values_exact("N 1.0,N 2.0,N 3.0", 4).unwrap_err();
        assert!(matches!(
            err,
            BenchError::ShapeMismatch {
                expected: 4,
                found: 3
            }
        ));
    }

    #[test]
    fn test_empty_reply() {
        assert!(parse_readings("").unwrap().is_empty());
        assert!(parse_values_exact("   ", 0).unwrap().is_empty());
    }

    #[test]
    #[traced_test]
    fn test_flagged_readings_are_logged() {
        let values = parse_values_exact("N 1.0E-3,C 2.0E-3", 2).unwrap();
        assert_eq!(values.len(), 2);
        assert!(logs_contain("Reply contains flagged readings"));
    }

    #[test]
    fn test_comma_separated_trace() {
        let values = parse_comma_separated("+2.9011E+02,+2.8803E+02, +2.7999E+02\n").unwrap();
        assert_eq!(values, vec![290.11, 288.03, 279.99]);
    }

    #[test]
    fn test_comma_separated_rejects_garbage() {
        let err = parse_comma_separated("1.0,abc,2.0").unwrap_err();
        assert!(err.to_string().contains("abc"));
    }
}
