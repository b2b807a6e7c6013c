//! Noise figure analyzer trace capture.

use std::path::{Path, PathBuf};

use tracing::{info, instrument};

use crate::config::NoiseFigureConfig;
use crate::error::AppResult;
use crate::export::{sanitize, CsvTable};
use crate::hardware::Transport;
use crate::instruments::{NoiseFigureAnalyzer, NoiseTrace};

/// Outcome of one noise capture.
#[derive(Debug, Clone)]
pub struct NoiseCaptureReport {
    /// `*IDN?` reply
    pub identity: String,
    /// Captured trace
    pub trace: NoiseTrace,
    /// CSV file written
    pub path: PathBuf,
}

/// Read the sweep axis and one trace, close the session, write
/// `<output_dir>/<title>.csv`.
#[instrument(skip_all, fields(title = %config.title, measurement = %config.measurement))]
pub async fn run_noise_capture(
    config: &NoiseFigureConfig,
    output_dir: &Path,
    transport: Box<dyn Transport>,
) -> AppResult<NoiseCaptureReport> {
    let mut analyzer = NoiseFigureAnalyzer::new(transport);
    let captured = capture(&mut analyzer, config).await;
    let closed = analyzer.close().await;
    let (identity, trace) = captured?;
    closed?;

    let path = output_dir.join(format!("{}.csv", sanitize(&config.title)));
    CsvTable::new(
        format!("{} {}", config.title, trace.measurement),
        "Frequency (Hz)",
        trace.frequencies.values().to_vec(),
        vec![trace.measurement.mnemonic().to_string()],
        vec![trace.values.clone()],
    )?
    .write(&path)?;
    info!(points = trace.values.len(), path = %path.display(), "Noise trace saved");

    Ok(NoiseCaptureReport {
        identity,
        trace,
        path,
    })
}

async fn capture(
    analyzer: &mut NoiseFigureAnalyzer,
    config: &NoiseFigureConfig,
) -> AppResult<(String, NoiseTrace)> {
    let identity = analyzer.identify().await?;
    let trace = analyzer
        .capture(config.measurement, config.corrected)
        .await?;
    Ok((identity, trace))
}
