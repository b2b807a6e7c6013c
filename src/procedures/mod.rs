//! Bench workflows.
//!
//! Each workflow has a `run_*` function taking an already opened transport
//! (so it can be driven by [`crate::hardware::MockTransport`]) and a wrapper
//! here that opens the configured transport first.

pub mod curve_tracer;
pub mod nfa_capture;
pub mod smith_view;

use tracing::info;

use crate::config::BenchConfig;
use crate::error::AppResult;
use crate::export::{OutputNaming, RunStamp};
use crate::hardware::open_transport;
use crate::instruments::{NoiseFigureAnalyzer, ParameterAnalyzer};

pub use curve_tracer::{run_curve_trace, transconductance_curves, CurveTraceReport, RunManifest};
pub use nfa_capture::{run_noise_capture, NoiseCaptureReport};
pub use smith_view::{list_network_files, run_smith_view, SmithViewReport};

/// Instrument addressed by `identify`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstrumentRole {
    /// HP 4145B parameter analyzer
    CurveTracer,
    /// N8975A noise figure analyzer
    NoiseFigure,
}

/// Run the curve trace with the configured instrument and output directory.
pub async fn curve_trace(config: &BenchConfig) -> AppResult<CurveTraceReport> {
    let tracer = config.curve_tracer()?;
    let stamp = RunStamp::now(&config.application.timestamp_format)?;
    let naming = OutputNaming::new(&config.application.output_dir, &tracer.device_name, stamp);
    info!(stamp = %naming.stamp(), output_dir = %naming.directory().display(), "Starting curve trace");

    let transport = open_transport(&tracer.instrument).await?;
    run_curve_trace(tracer, &naming, transport).await
}

/// Capture the configured noise trace into the application output directory.
pub async fn noise_figure(config: &BenchConfig) -> AppResult<NoiseCaptureReport> {
    let nfa = config.noise_figure()?;
    let transport = open_transport(&nfa.instrument).await?;
    run_noise_capture(nfa, &config.application.output_dir, transport).await
}

/// Render the configured S-parameter view.
pub fn smith_view(config: &BenchConfig) -> AppResult<SmithViewReport> {
    run_smith_view(config.smith_view()?)
}

/// Open the instrument, read its identity and close it again.
pub async fn identify(config: &BenchConfig, role: InstrumentRole) -> AppResult<String> {
    match role {
        InstrumentRole::CurveTracer => {
            let tracer = config.curve_tracer()?;
            let transport = open_transport(&tracer.instrument).await?;
            let mut analyzer = ParameterAnalyzer::new(transport, tracer.settle.clone());
            let identity = analyzer.identify().await;
            analyzer.close().await?;
            identity
        }
        InstrumentRole::NoiseFigure => {
            let transport = open_transport(&config.noise_figure()?.instrument).await?;
            let mut analyzer = NoiseFigureAnalyzer::new(transport);
            let identity = analyzer.identify().await;
            analyzer.close().await?;
            identity
        }
    }
}
