//! HP 4145B curve tracer run.
//!
//! One run is two sweeps over a single session followed by offline analysis:
//!
//! 1. Output characteristic: ID vs VDS for each VGS step (`SweptVDS`).
//! 2. Transfer characteristic: ID vs VGS for each VDS step (`SweptVGS`,
//!    written only when `transfer.export_curves` is set).
//! 3. Transconductance `Gm = dID/dVGS` from a smoothing spline per VDS step
//!    (`GM`), plotted against ID.
//!
//! Every file of a run shares the timestamp taken when the run starts, and a
//! `run.json` manifest records the configuration and the files written.

use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::analysis::{step_labels, MeasurementMatrix, SmoothingSpline, SplineSettings};
use crate::config::{CurveTracerConfig, FigureSize};
use crate::error::{AppResult, BenchError};
use crate::export::{CsvTable, LineChart, OutputNaming};
use crate::hardware::Transport;
use crate::instruments::{ParameterAnalyzer, SweepPlan};

/// Decimals of stepped-variable values in CSV headers.
const CSV_LABEL_DECIMALS: usize = 3;
/// Decimals of stepped-variable values in figure legends.
const LEGEND_DECIMALS: usize = 2;

/// JSON record of one run, written next to the data files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    /// Device name from the configuration
    pub device: String,
    /// Instrument identity reply
    pub identity: String,
    /// Timestamp used in the file names
    pub stamp: String,
    /// Before the session was opened
    pub started_at: DateTime<Local>,
    /// After the last file was written
    pub finished_at: DateTime<Local>,
    /// Configuration the run used
    pub config: CurveTracerConfig,
    /// Data and figure files, in writing order
    pub files: Vec<PathBuf>,
}

/// Data and files produced by one run.
#[derive(Debug, Clone)]
pub struct CurveTraceReport {
    /// Instrument identity reply
    pub identity: String,
    /// Output curves in scaled units, one series per VGS step
    pub output: MeasurementMatrix,
    /// Transfer curves in scaled units, one series per VDS step
    pub transfer: Option<MeasurementMatrix>,
    /// Gm per VDS step, sampled at the transfer sweep's VGS points
    pub transconductance: Option<MeasurementMatrix>,
    /// Data and figure files, in writing order
    pub files: Vec<PathBuf>,
    /// Path of the JSON manifest
    pub manifest: PathBuf,
}

struct Acquisition {
    identity: String,
    output: MeasurementMatrix,
    transfer: Option<MeasurementMatrix>,
}

/// Run both sweeps on `transport`, export everything and write the manifest.
///
/// The session is closed before any file is written, also when a sweep
/// fails.
#[instrument(skip_all, fields(device = %config.device_name))]
pub async fn run_curve_trace(
    config: &CurveTracerConfig,
    naming: &OutputNaming,
    transport: Box<dyn Transport>,
) -> AppResult<CurveTraceReport> {
    let started_at = Local::now();
    let mut analyzer = ParameterAnalyzer::new(transport, config.settle.clone());

    let acquired = acquire(&mut analyzer, config).await;
    let closed = analyzer.close().await;
    let Acquisition {
        identity,
        output,
        transfer,
    } = acquired?;
    closed?;
    info!("Session closed");

    let mut files = Vec::new();
    let output_plan = SweepPlan::output(&config.drain, &config.gate);
    files.extend(export_sweep(config, naming, &output_plan, &output, "SweptVDS", "IV Curve")?);

    let mut transconductance = None;
    if let Some(transfer) = &transfer {
        let transfer_plan = SweepPlan::transfer(&config.drain, &config.gate);
        if config.transfer.export_curves {
            files.extend(export_sweep(
                config,
                naming,
                &transfer_plan,
                transfer,
                "SweptVGS",
                "Transfer Curve",
            )?);
        }

        let vgs = transfer_plan.swept_axis()?.into_values();
        let gm = transconductance_curves(&vgs, transfer, config.transconductance)?;
        files.extend(export_transconductance(config, naming, &transfer_plan, &vgs, transfer, &gm)?);
        transconductance = Some(gm);
    }

    let manifest = RunManifest {
        device: config.device_name.clone(),
        identity: identity.clone(),
        stamp: naming.stamp().to_string(),
        started_at,
        finished_at: Local::now(),
        config: config.clone(),
        files: files.clone(),
    };
    let manifest_path = naming.path("run", "json");
    fs::create_dir_all(naming.directory())?;
    fs::write(&manifest_path, serde_json::to_string_pretty(&manifest)?)?;
    info!(path = %manifest_path.display(), files = files.len(), "Run manifest written");

    Ok(CurveTraceReport {
        identity,
        output,
        transfer,
        transconductance,
        files,
        manifest: manifest_path,
    })
}

async fn acquire(
    analyzer: &mut ParameterAnalyzer,
    config: &CurveTracerConfig,
) -> AppResult<Acquisition> {
    let identity = analyzer.identify().await?;
    analyzer.reset().await?;
    analyzer.set_integration_time(config.integration_time).await?;
    analyzer.disable_unused_units().await?;

    let output = analyzer
        .run_sweep(&SweepPlan::output(&config.drain, &config.gate))
        .await?
        .scaled(config.current_scale);

    let transfer = if config.transfer.enabled {
        let matrix = analyzer
            .run_sweep(&SweepPlan::transfer(&config.drain, &config.gate))
            .await?;
        Some(matrix.scaled(config.current_scale))
    } else {
        info!("Transfer sweep disabled");
        None
    };

    Ok(Acquisition {
        identity,
        output,
        transfer,
    })
}

/// Gm for every transfer series: the spline derivative of ID over `vgs`,
/// evaluated at each VGS point.
///
/// With ID in mA and VGS in V the result is in mS.
pub fn transconductance_curves(
    vgs: &[f64],
    transfer: &MeasurementMatrix,
    settings: SplineSettings,
) -> AppResult<MeasurementMatrix> {
    if vgs.len() != transfer.inner() {
        return Err(BenchError::ShapeMismatch {
            expected: transfer.inner(),
            found: vgs.len(),
        });
    }
    // The fit needs increasing abscissae; a negative gate step sweeps downwards.
    let descending = vgs.len() > 1 && vgs[0] > vgs[vgs.len() - 1];

    let mut series = Vec::with_capacity(transfer.outer());
    for (step, id) in transfer.iter_series().enumerate() {
        let spline = if descending {
            let x: Vec<f64> = vgs.iter().rev().copied().collect();
            let y: Vec<f64> = id.iter().rev().copied().collect();
            SmoothingSpline::fit(&x, &y, settings)
        } else {
            SmoothingSpline::fit(vgs, id, settings)
        }
        .map_err(|e| match e {
            BenchError::Numerical(message) => {
                BenchError::Numerical(format!("VDS step {}: {}", step, message))
            }
            other => other,
        })?;

        if spline.residual() > settings.smoothing {
            warn!(
                step,
                residual = spline.residual(),
                smoothing = settings.smoothing,
                "Smoothing target not reached"
            );
        }
        series.push(spline.derivatives(vgs));
    }
    MeasurementMatrix::from_series(series)
}

fn export_sweep(
    config: &CurveTracerConfig,
    naming: &OutputNaming,
    plan: &SweepPlan,
    data: &MeasurementMatrix,
    suffix: &str,
    title: &str,
) -> AppResult<Vec<PathBuf>> {
    let swept = plan.mode.swept_name();
    let stepped = plan.mode.stepped_name();
    let axis = plan.swept_axis()?;
    let steps = plan.stepped_axis();
    let description = format!("{} {}", config.device_name, title);
    let axis_label = format!("{} (V)", swept);

    let csv_path = naming.path(suffix, "csv");
    CsvTable::from_matrix(
        description.as_str(),
        axis_label.as_str(),
        axis.values(),
        step_labels(stepped, steps.values(), CSV_LABEL_DECIMALS),
        data,
    )?
    .write(&csv_path)?;

    let mut chart =
        LineChart::new(&description, &axis_label, "ID (mA)").with_size(config.figure);
    let legend = step_labels(stepped, steps.values(), LEGEND_DECIMALS);
    for (label, series) in legend.into_iter().zip(data.iter_series()) {
        chart.add_series(label, axis.values(), series);
    }
    let figure_path = naming.path(suffix, "png");
    chart.save(&figure_path)?;

    Ok(vec![csv_path, figure_path])
}

fn export_transconductance(
    config: &CurveTracerConfig,
    naming: &OutputNaming,
    plan: &SweepPlan,
    vgs: &[f64],
    transfer: &MeasurementMatrix,
    gm: &MeasurementMatrix,
) -> AppResult<Vec<PathBuf>> {
    let steps = plan.stepped_axis();
    let description = format!("{} Gm Curve", config.device_name);

    let csv_path = naming.path("GM", "csv");
    CsvTable::from_matrix(
        description.as_str(),
        "VGS (V)",
        vgs,
        step_labels("VDS", steps.values(), CSV_LABEL_DECIMALS),
        gm,
    )?
    .write(&csv_path)?;

    let figure_path = naming.path("GM", "png");
    gm_chart(&description, config.figure, steps.values(), transfer, gm).save(&figure_path)?;

    Ok(vec![csv_path, figure_path])
}

fn gm_chart(
    title: &str,
    size: FigureSize,
    vds_steps: &[f64],
    transfer: &MeasurementMatrix,
    gm: &MeasurementMatrix,
) -> LineChart {
    let mut chart = LineChart::new(title, "ID (mA)", "Gm (mS)").with_size(size);
    let legend = step_labels("VDS", vds_steps, LEGEND_DECIMALS);
    for ((label, id), gm) in legend
        .into_iter()
        .zip(transfer.iter_series())
        .zip(gm.iter_series())
    {
        chart.add_series(label, id, gm);
    }
    chart
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> SplineSettings {
        SplineSettings {
            degree: 3,
            smoothing: 1e-6,
            penalty_order: 3,
        }
    }

    #[test]
    fn test_gm_of_square_law_transfer() {
        // ID = 50 * (VGS + 0.3)^2 mA, so Gm = 100 * (VGS + 0.3) mS.
        let vgs: Vec<f64> = (0..41).map(|i| -0.2 + 0.01 * i as f64).collect();
        let id: Vec<f64> = vgs.iter().map(|v| 50.0 * (v + 0.3).powi(2)).collect();
        let transfer = MeasurementMatrix::from_series(vec![id.clone(), id]).unwrap();

        let gm = transconductance_curves(&vgs, &transfer, settings()).unwrap();
        assert_eq!(gm.outer(), 2);
        for (v, g) in vgs.iter().zip(gm.series(1).unwrap()) {
            assert!((g - 100.0 * (v + 0.3)).abs() < 1e-4, "Gm({}) = {}", v, g);
        }
    }

    #[test]
    fn test_gm_with_descending_gate_sweep() {
        let vgs: Vec<f64> = (0..30).map(|i| 0.3 - 0.02 * i as f64).collect();
        let id: Vec<f64> = vgs.iter().map(|v| 4.0 * v + 1.0).collect();
        let transfer = MeasurementMatrix::from_series(vec![id]).unwrap();

        let gm = transconductance_curves(&vgs, &transfer, settings()).unwrap();
        for g in gm.series(0).unwrap() {
            assert!((g - 4.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_gm_axis_length_must_match() {
        let transfer = MeasurementMatrix::from_series(vec![vec![0.0; 10]]).unwrap();
        let result = transconductance_curves(&[0.0; 9], &transfer, settings());
        assert!(matches!(result, Err(BenchError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_gm_needs_enough_points() {
        let transfer = MeasurementMatrix::from_series(vec![vec![0.0, 1.0, 2.0]]).unwrap();
        let result = transconductance_curves(&[0.0, 0.1, 0.2], &transfer, settings());
        assert!(matches!(result, Err(BenchError::Numerical(_))));
    }
}
