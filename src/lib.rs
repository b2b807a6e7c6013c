//! Core library for the bench-daq application.
//!
//! GPIB bench automation for three workflows:
//!
//! - FET curve tracing on an HP 4145B parameter analyzer, with the
//!   transconductance estimated from a smoothing spline
//! - noise figure trace capture on an N8975A-class analyzer
//! - a Smith chart view of a directory of two-port Touchstone files
//!
//! Instruments are reached through [`hardware::Transport`]; drivers live in
//! [`instruments`], the reply/axis/spline numerics in [`analysis`], file
//! output in [`export`] and the workflows themselves in [`procedures`].

pub mod analysis;
pub mod config;
pub mod error;
pub mod export;
pub mod hardware;
pub mod instruments;
pub mod logging;
pub mod procedures;
pub mod rf;

pub use error::{AppResult, BenchError};
