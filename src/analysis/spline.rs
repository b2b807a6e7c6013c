//! Smoothing spline used for the transconductance estimate.
//!
//! A penalized B-spline (P-spline): a B-spline basis of the configured degree
//! on uniform knots, fitted by least squares with a finite-difference penalty
//! of order `penalty_order` on neighbouring coefficients. The penalty weight is
//! searched so that the fit is the smoothest one whose residual sum of squares
//! stays within `smoothing`, which matches the meaning of the smoothing factor
//! in classic spline fitting packages.
//!
//! Polynomials of degree below `penalty_order` lie in the null space of the
//! penalty, so a sampled quadratic is reproduced exactly for any weight.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AppResult, BenchError};

/// Upper bound on interior knot intervals.
const MAX_SEGMENTS: usize = 40;
/// Search range of log10 of the relative penalty weight.
const LOG_LAMBDA_MIN: f64 = -8.0;
const LOG_LAMBDA_MAX: f64 = 6.0;
const BISECTION_STEPS: usize = 60;

/// Fit settings, configurable under `curve_tracer.transconductance`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SplineSettings {
    /// Polynomial degree of each piece
    #[serde(default = "default_degree")]
    pub degree: usize,
    /// Largest acceptable residual sum of squares
    #[serde(default = "default_smoothing")]
    pub smoothing: f64,
    /// Order of the coefficient difference penalty
    #[serde(default = "default_penalty_order")]
    pub penalty_order: usize,
}

impl Default for SplineSettings {
    fn default() -> Self {
        Self {
            degree: default_degree(),
            smoothing: default_smoothing(),
            penalty_order: default_penalty_order(),
        }
    }
}

fn default_degree() -> usize {
    5
}

fn default_smoothing() -> f64 {
    3.0
}

fn default_penalty_order() -> usize {
    3
}

impl SplineSettings {
    /// Check degree, penalty order and smoothing target.
    pub fn validate(&self) -> Result<(), String> {
        if !(1..=9).contains(&self.degree) {
            return Err(format!("'degree' must be between 1 and 9, got {}", self.degree));
        }
        if !(self.smoothing.is_finite() && self.smoothing >= 0.0) {
            return Err(format!(
                "'smoothing' must be a non-negative number, got {}",
                self.smoothing
            ));
        }
        if self.penalty_order == 0 || self.penalty_order > self.degree {
            return Err(format!(
                "'penalty_order' must be between 1 and the degree ({}), got {}",
                self.degree, self.penalty_order
            ));
        }
        Ok(())
    }

    /// Fewest samples a fit accepts.
    pub fn min_points(&self) -> usize {
        self.degree + 2
    }
}

/// A fitted spline over `[x_min, x_max]`.
#[derive(Debug, Clone)]
pub struct SmoothingSpline {
    degree: usize,
    x_min: f64,
    x_max: f64,
    segment_width: f64,
    segments: usize,
    coefficients: DVector<f64>,
    lambda: f64,
    residual: f64,
}

impl SmoothingSpline {
    /// Fit `y(x)`; `x` must be strictly increasing.
    pub fn fit(x: &[f64], y: &[f64], settings: SplineSettings) -> AppResult<Self> {
        settings.validate().map_err(BenchError::Numerical)?;
        check_samples(x, y, settings.min_points())?;

        let degree = settings.degree;
        let n = x.len();
        let segments = (n - degree - 1).clamp(1, MAX_SEGMENTS);
        let x_min = x[0];
        let x_max = x[n - 1];
        let mut spline = Self {
            degree,
            x_min,
            x_max,
            segment_width: (x_max - x_min) / segments as f64,
            segments,
            coefficients: DVector::zeros(segments + degree),
            lambda: 0.0,
            residual: 0.0,
        };

        let basis = spline.design_matrix(x);
        let penalty = difference_penalty(spline.basis_len(), settings.penalty_order);
        let targets = DVector::from_column_slice(y);
        let gram = basis.tr_mul(&basis);
        let rhs = basis.tr_mul(&targets);
        let scale = gram.trace() / penalty.trace();

        let solve_at = |log_lambda: f64| -> AppResult<(f64, DVector<f64>, f64)> {
            let lambda = scale * 10f64.powf(log_lambda);
            let coefficients = solve(&gram + &penalty * lambda, &rhs)?;
            let residual = (&basis * &coefficients - &targets).norm_squared();
            Ok((lambda, coefficients, residual))
        };

        let budget = settings.smoothing;
        let stiffest = solve_at(LOG_LAMBDA_MAX)?;
        let chosen = if stiffest.2 <= budget {
            stiffest
        } else {
            let loosest = solve_at(LOG_LAMBDA_MIN)?;
            if loosest.2 > budget {
                debug!(
                    residual = loosest.2,
                    smoothing = budget,
                    "Smoothing target unreachable, using the loosest fit"
                );
                loosest
            } else {
                let (mut lo, mut hi) = (LOG_LAMBDA_MIN, LOG_LAMBDA_MAX);
                let mut best = loosest;
                for _ in 0..BISECTION_STEPS {
                    let mid = 0.5 * (lo + hi);
                    let candidate = solve_at(mid)?;
                    if candidate.2 <= budget {
                        lo = mid;
                        best = candidate;
                    } else {
                        hi = mid;
                    }
                }
                best
            }
        };

        spline.lambda = chosen.0;
        spline.coefficients = chosen.1;
        spline.residual = chosen.2;
        debug!(
            points = n,
            segments,
            lambda = spline.lambda,
            residual = spline.residual,
            "Spline fitted"
        );
        Ok(spline)
    }

    /// Spline value at `x`. Outside the fitted range the end pieces extend.
    pub fn evaluate(&self, x: f64) -> f64 {
        let span = self.span(x);
        let n = self.basis_funs(span, x, self.degree);
        n.iter()
            .enumerate()
            .map(|(r, b)| b * self.coefficients[span - self.degree + r])
            .sum()
    }

    /// First derivative at `x`.
    pub fn derivative(&self, x: f64) -> f64 {
        let k = self.degree;
        let span = self.span(x);
        let n = self.basis_funs(span, x, k - 1);
        n.iter()
            .enumerate()
            .map(|(r, b)| {
                let j = span + 1 - k + r;
                b * (self.coefficients[j] - self.coefficients[j - 1]) / self.segment_width
            })
            .sum()
    }

    /// First derivative at each of `xs`.
    pub fn derivatives(&self, xs: &[f64]) -> Vec<f64> {
        xs.iter().map(|&x| self.derivative(x)).collect()
    }

    /// Penalty weight the smoothing search settled on.
    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    /// Residual sum of squares of the fit.
    pub fn residual(&self) -> f64 {
        self.residual
    }

    /// Interval covered by the knots.
    pub fn domain(&self) -> (f64, f64) {
        (self.x_min, self.x_max)
    }

    fn basis_len(&self) -> usize {
        self.segments + self.degree
    }

    fn knot(&self, index: usize) -> f64 {
        self.x_min + (index as f64 - self.degree as f64) * self.segment_width
    }

    fn span(&self, x: f64) -> usize {
        let offset = ((x - self.x_min) / self.segment_width).floor();
        let last = (self.segments - 1) as f64;
        self.degree + offset.clamp(0.0, last) as usize
    }

    /// Non-zero basis functions of degree `p` at `x` in knot span `span`:
    /// entry `r` is `B[span - p + r]`.
    fn basis_funs(&self, span: usize, x: f64, p: usize) -> Vec<f64> {
        let mut n = vec![0.0; p + 1];
        let mut left = vec![0.0; p + 1];
        let mut right = vec![0.0; p + 1];
        n[0] = 1.0;
        for j in 1..=p {
            left[j] = x - self.knot(span + 1 - j);
            right[j] = self.knot(span + j) - x;
            let mut saved = 0.0;
            for r in 0..j {
                let temp = n[r] / (right[r + 1] + left[j - r]);
                n[r] = saved + right[r + 1] * temp;
                saved = left[j - r] * temp;
            }
            n[j] = saved;
        }
        n
    }

    fn design_matrix(&self, x: &[f64]) -> DMatrix<f64> {
        let mut basis = DMatrix::zeros(x.len(), self.basis_len());
        for (row, &xi) in x.iter().enumerate() {
            let span = self.span(xi);
            for (r, value) in self.basis_funs(span, xi, self.degree).into_iter().enumerate() {
                basis[(row, span - self.degree + r)] = value;
            }
        }
        basis
    }
}

fn check_samples(x: &[f64], y: &[f64], min_points: usize) -> AppResult<()> {
    if x.len() != y.len() {
        return Err(BenchError::Numerical(format!(
            "x and y lengths differ ({} vs {})",
            x.len(),
            y.len()
        )));
    }
    if x.len() < min_points {
        return Err(BenchError::Numerical(format!(
            "spline fit needs at least {} points, got {}",
            min_points,
            x.len()
        )));
    }
    if x.iter().chain(y).any(|v| !v.is_finite()) {
        return Err(BenchError::Numerical(
            "spline fit input contains non-finite values".to_string(),
        ));
    }
    if x.windows(2).any(|w| w[1] <= w[0]) {
        return Err(BenchError::Numerical(
            "spline abscissae must be strictly increasing".to_string(),
        ));
    }
    Ok(())
}

/// `DᵀD` for the `order`-th difference operator on `size` coefficients.
fn difference_penalty(size: usize, order: usize) -> DMatrix<f64> {
    let weights = difference_weights(order);
    let rows = size.saturating_sub(order);
    let mut diff = DMatrix::zeros(rows, size);
    for row in 0..rows {
        for (i, w) in weights.iter().enumerate() {
            diff[(row, row + i)] = *w;
        }
    }
    diff.tr_mul(&diff)
}

/// Signed binomial weights, e.g. `[-1, 3, -3, 1]` for order 3.
fn difference_weights(order: usize) -> Vec<f64> {
    let mut weights = vec![1.0];
    for _ in 0..order {
        let mut next = vec![0.0; weights.len() + 1];
        for (i, w) in weights.iter().enumerate() {
            next[i] -= w;
            next[i + 1] += w;
        }
        weights = next;
    }
    weights
}

fn solve(lhs: DMatrix<f64>, rhs: &DVector<f64>) -> AppResult<DVector<f64>> {
    let solution = match lhs.clone().cholesky() {
        Some(chol) => chol.solve(rhs),
        None => lhs
            .lu()
            .solve(rhs)
            .ok_or_else(|| BenchError::Numerical("singular spline normal equations".to_string()))?,
    };
    if solution.iter().all(|v| v.is_finite()) {
        Ok(solution)
    } else {
        Err(BenchError::Numerical(
            "spline normal equations produced non-finite coefficients".to_string(),
        ))
    }
}
