//! Sweep axis construction.
//!
//! One builder serves every sweep direction. Values are always computed as
//! `start + i * step`, never by accumulation, and the point count is decided
//! with an explicit boundary rule so that floating rounding of `stop` cannot
//! add or drop a point.

use crate::error::{AppResult, BenchError};

/// Fraction of a step within which `stop` counts as lying on the grid.
const GRID_TOLERANCE: f64 = 1e-9;

/// Largest axis any builder will allocate.
pub const MAX_POINTS: usize = 1_000_000;

/// Whether `stop` belongs to a stepped axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    /// `[start, stop]`
    Closed,
    /// `[start, stop)`
    HalfOpen,
}

/// Ordered independent-variable values of a sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct Axis {
    values: Vec<f64>,
}

impl Axis {
    /// `points` evenly spaced values, first == `start`, last == `stop`.
    pub fn linspace(start: f64, stop: f64, points: usize) -> AppResult<Self> {
        check_finite(&[start, stop])?;
        check_count(points as f64)?;
        let values = match points {
            0 => Vec::new(),
            1 => vec![start],
            n => {
                let step = (stop - start) / (n - 1) as f64;
                (0..n)
                    .map(|i| if i == n - 1 { stop } else { start + step * i as f64 })
                    .collect()
            }
        };
        Ok(Self { values })
    }

    /// Values `start, start + step, ...` up to `stop` under `boundary`.
    pub fn stepped(start: f64, stop: f64, step: f64, boundary: Boundary) -> AppResult<Self> {
        check_finite(&[start, stop, step])?;
        if step <= 0.0 {
            return Err(BenchError::Numerical(format!(
                "axis step must be positive, got {}",
                step
            )));
        }
        if stop < start {
            return Ok(Self { values: Vec::new() });
        }

        let span = (stop - start) / step;
        check_count(span + 1.0)?;
        let nearest = span.round();
        let on_grid = (span - nearest).abs() <= GRID_TOLERANCE * span.max(1.0);
        let intervals = if on_grid { nearest } else { span.floor() } as usize;

        let count = match (boundary, on_grid) {
            (Boundary::Closed, _) => intervals + 1,
            (Boundary::HalfOpen, true) => intervals,
            (Boundary::HalfOpen, false) => intervals + 1,
        };
        Ok(Self::from_start_step(start, step, count))
    }

    /// Exactly `count` values `start + i * step`.
    pub fn from_start_step(start: f64, step: f64, count: usize) -> Self {
        Self {
            values: (0..count).map(|i| start + step * i as f64).collect(),
        }
    }

    /// Values in sweep order.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True for an axis without points.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// First value, if any.
    pub fn first(&self) -> Option<f64> {
        self.values.first().copied()
    }

    /// Last value, if any.
    pub fn last(&self) -> Option<f64> {
        self.values.last().copied()
    }

    /// Spacing between the first two points, if there are two.
    pub fn step(&self) -> Option<f64> {
        match self.values.as_slice() {
            [a, b, ..] => Some(b - a),
            _ => None,
        }
    }

    /// Consume the axis, keeping its values.
    pub fn into_values(self) -> Vec<f64> {
        self.values
    }
}

fn check_count(points: f64) -> AppResult<()> {
    if points.is_finite() && points <= MAX_POINTS as f64 {
        Ok(())
    } else {
        Err(BenchError::Numerical(format!(
            "axis would need {:.3e} points, limit is {}",
            points, MAX_POINTS
        )))
    }
}

fn check_finite(values: &[f64]) -> AppResult<()> {
    if values.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(BenchError::Numerical(format!(
            "axis bounds must be finite: {:?}",
            values
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_non_decreasing(values: &[f64]) -> bool {
        values.windows(2).all(|w| w[0] <= w[1])
    }

    #[test]
    fn test_stepped_closed_includes_stop() {
        let axis = Axis::stepped(0.0, 1.0, 0.01, Boundary::Closed).unwrap();
        assert_eq!(axis.len(), 101);
        assert!(is_non_decreasing(axis.values()));
        assert_eq!(axis.first(), Some(0.0));
        assert!((axis.last().unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_stepped_half_open_excludes_stop() {
        let axis = Axis::stepped(0.0, 1.0, 0.01, Boundary::HalfOpen).unwrap();
        assert_eq!(axis.len(), 100);
        assert!(is_non_decreasing(axis.values()));
        assert!((axis.last().unwrap() - 0.99).abs() < 1e-12);
    }

    #[test]
    fn test_stepped_off_grid_stop() {
        // 0, 0.3, 0.6, 0.9: stop 1.0 is not reachable either way.
        let closed = Axis::stepped(0.0, 1.0, 0.3, Boundary::Closed).unwrap();
        let open = Axis::stepped(0.0, 1.0, 0.3, Boundary::HalfOpen).unwrap();
        assert_eq!(closed.len(), 4);
        assert_eq!(open.len(), 4);
    }

    #[test]
    fn test_stepped_rounding_prone_bounds() {
        // (0.2 - -0.2) / 0.05 is 7.999999999999999 in binary floating point.
        let axis = Axis::stepped(-0.2, 0.2, 0.05, Boundary::Closed).unwrap();
        assert_eq!(axis.len(), 9);
        let axis = Axis::stepped(-0.2, 0.2, 0.05, Boundary::HalfOpen).unwrap();
        assert_eq!(axis.len(), 8);
    }

    #[test]
    fn test_stepped_rejects_bad_step() {
        assert!(Axis::stepped(0.0, 1.0, 0.0, Boundary::Closed).is_err());
        assert!(Axis::stepped(0.0, 1.0, -0.1, Boundary::Closed).is_err());
        assert!(Axis::stepped(0.0, f64::NAN, 0.1, Boundary::Closed).is_err());
    }

    #[test]
    fn test_oversized_axis_rejected() {
        let err = Axis::stepped(0.0, 1e20, 1e-3, Boundary::Closed).unwrap_err();
        assert!(matches!(err, BenchError::Numerical(_)));
        assert!(Axis::stepped(0.0, 1.0, 1e-12, Boundary::HalfOpen).is_err());
        assert!(Axis::linspace(0.0, 1.0, MAX_POINTS + 1).is_err());
        assert_eq!(
            Axis::stepped(0.0, (MAX_POINTS - 1) as f64, 1.0, Boundary::Closed)
                .unwrap()
                .len(),
            MAX_POINTS
        );
    }

    #[test]
    fn test_linspace_endpoints_exact() {
        let axis = Axis::linspace(1.0e9, 3.0e9, 201).unwrap();
        assert_eq!(axis.len(), 201);
        assert_eq!(axis.first(), Some(1.0e9));
        assert_eq!(axis.last(), Some(3.0e9));
        assert!((axis.step().unwrap() - 1.0e7).abs() < 1e-3);
    }

    #[test]
    fn test_linspace_degenerate_counts() {
        assert!(Axis::linspace(0.0, 1.0, 0).unwrap().is_empty());
        assert_eq!(Axis::linspace(0.5, 1.0, 1).unwrap().values(), &[0.5]);
    }

    #[test]
    fn test_from_start_step() {
        let axis = Axis::from_start_step(-0.2, 0.05, 9);
        assert_eq!(axis.len(), 9);
        assert!((axis.values()[8] - 0.2).abs() < 1e-12);
    }
}
