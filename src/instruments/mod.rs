//! Instrument drivers built on [`crate::hardware::Transport`].
//!
//! - [`hp4145b`]: HP 4145B semiconductor parameter analyzer
//! - [`n8975a`]: Agilent N8975A-class noise figure analyzer

pub mod hp4145b;
pub mod n8975a;

pub use hp4145b::{ParameterAnalyzer, SweepMode, SweepPlan};
pub use n8975a::{NoiseFigureAnalyzer, NoiseMeasurement, NoiseTrace};
