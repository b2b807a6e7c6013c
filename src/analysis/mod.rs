//! Turning instrument replies into curves.
//!
//! - [`reply`]: numeric readings out of ASCII replies
//! - [`axis`]: sweep axes with explicit endpoint rules
//! - [`matrix`]: flat readings reshaped into per-step series
//! - [`spline`]: smoothing spline and its derivative

pub mod axis;
pub mod matrix;
pub mod reply;
pub mod spline;

pub use axis::{Axis, Boundary};
pub use matrix::{step_labels, MeasurementMatrix};
pub use reply::{parse_comma_separated, parse_readings, parse_values_exact, Reading, ReadingStatus};
pub use spline::{SmoothingSpline, SplineSettings};
