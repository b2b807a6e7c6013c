//! Flat reading lists reshaped into per-step series.

use crate::error::{AppResult, BenchError};

/// `outer` series of `inner` values each, in acquisition order.
///
/// For the output characteristic `outer` is the number of VGS steps and each
/// series holds the drain current over the VDS sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementMatrix {
    outer: usize,
    inner: usize,
    values: Vec<f64>,
}

impl MeasurementMatrix {
    /// Partition `values` into `outer` consecutive groups of `inner`.
    pub fn from_flat(values: Vec<f64>, outer: usize, inner: usize) -> AppResult<Self> {
        let expected = outer * inner;
        if values.len() != expected {
            return Err(BenchError::ShapeMismatch {
                expected,
                found: values.len(),
            });
        }
        Ok(Self {
            outer,
            inner,
            values,
        })
    }

    /// Build from already separated series; all must have the same length.
    pub fn from_series(series: Vec<Vec<f64>>) -> AppResult<Self> {
        let outer = series.len();
        let inner = series.first().map_or(0, Vec::len);
        if let Some(bad) = series.iter().find(|s| s.len() != inner) {
            return Err(BenchError::ShapeMismatch {
                expected: inner,
                found: bad.len(),
            });
        }
        Ok(Self {
            outer,
            inner,
            values: series.into_iter().flatten().collect(),
        })
    }

    /// Copy with every value multiplied by `factor`.
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            outer: self.outer,
            inner: self.inner,
            values: self.values.iter().map(|v| v * factor).collect(),
        }
    }

    /// Number of series (stepped-variable steps).
    pub fn outer(&self) -> usize {
        self.outer
    }

    /// Points per series (swept-variable points).
    pub fn inner(&self) -> usize {
        self.inner
    }

    /// The `index`-th series, or `None` past the end.
    pub fn series(&self, index: usize) -> Option<&[f64]> {
        if index >= self.outer {
            return None;
        }
        let start = index * self.inner;
        Some(&self.values[start..start + self.inner])
    }

    /// Series in stepped order, each `inner()` long.
    pub fn iter_series(&self) -> impl Iterator<Item = &[f64]> {
        // chunks_exact panics on zero; an empty inner dimension has no rows anyway.
        self.values.chunks_exact(self.inner.max(1)).take(self.outer)
    }

    /// Row `row` across all series: one CSV line.
    pub fn row(&self, row: usize) -> Option<Vec<f64>> {
        if row >= self.inner {
            return None;
        }
        Some(
            (0..self.outer)
                .map(|s| self.values[s * self.inner + row])
                .collect(),
        )
    }

    /// Row-major storage, series after series.
    pub fn as_flat(&self) -> &[f64] {
        &self.values
    }
}

/// Column labels such as `VGS=0.150` for every value of a stepped variable.
pub fn step_labels(name: &str, steps: &[f64], decimals: usize) -> Vec<String> {
    steps
        .iter()
        .map(|v| format!("{}={:.*}", name, decimals, v))
        .collect()
}
