//! Command line entry point.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use bench_daq::config::{BenchConfig, DEFAULT_CONFIG_PATH};
use bench_daq::logging;
use bench_daq::procedures::{self, InstrumentRole};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;

/// GPIB bench automation: curve tracing, noise figure capture, S-parameter plots
#[derive(Parser)]
#[command(name = "bench-daq", version)]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Log level, overriding the configuration (RUST_LOG still wins)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Output directory, overriding the configuration
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Output and transfer sweeps on the HP 4145B, then Gm
    CurveTrace,
    /// Capture one trace from the noise figure analyzer
    NoiseFigure,
    /// Plot every two-port file of a directory
    SmithView {
        /// Directory of network files, overriding the configuration
        #[arg(long)]
        directory: Option<PathBuf>,
    },
    /// Print an instrument's identity string
    Identify {
        #[arg(value_enum)]
        instrument: Instrument,
    },
    /// Write an example configuration covering every workflow
    InitConfig {
        /// Destination (defaults to the --config path)
        path: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Instrument {
    CurveTracer,
    NoiseFigure,
}

impl From<Instrument> for InstrumentRole {
    fn from(instrument: Instrument) -> Self {
        match instrument {
            Instrument::CurveTracer => Self::CurveTracer,
            Instrument::NoiseFigure => Self::NoiseFigure,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    if let Command::InitConfig { path } = &cli.command {
        let path = path.as_ref().unwrap_or(&cli.config);
        return init_config(path);
    }

    let mut config = BenchConfig::load_from(&cli.config)
        .with_context(|| format!("loading configuration from {}", cli.config.display()))?;
    if let Some(dir) = &cli.output_dir {
        config.application.output_dir = dir.clone();
        if let Some(view) = config.smith_view.as_mut() {
            view.output_dir = dir.clone();
        }
    }

    let level = cli
        .log_level
        .as_deref()
        .unwrap_or(&config.application.log_level);
    logging::init(level).context("initialising logging")?;

    match cli.command {
        Command::CurveTrace => {
            let report = procedures::curve_trace(&config)
                .await
                .context("curve trace failed")?;
            info!(identity = %report.identity, manifest = %report.manifest.display(), "Curve trace complete");
            for file in &report.files {
                println!("{}", file.display());
            }
        }
        Command::NoiseFigure => {
            let report = procedures::noise_figure(&config)
                .await
                .context("noise figure capture failed")?;
            println!("{}", report.path.display());
        }
        Command::SmithView { directory } => {
            if let (Some(dir), Some(view)) = (directory, config.smith_view.as_mut()) {
                view.directory = dir;
            }
            let report = procedures::smith_view(&config).context("S-parameter view failed")?;
            println!("{}", report.figure.display());
        }
        Command::Identify { instrument } => {
            let identity = procedures::identify(&config, instrument.into())
                .await
                .context("identify failed")?;
            println!("{}", identity);
        }
        Command::InitConfig { .. } => {}
    }
    Ok(())
}

fn init_config(path: &Path) -> Result<()> {
    if path.exists() {
        anyhow::bail!("{} already exists", path.display());
    }
    let text = toml::to_string_pretty(&BenchConfig::example())
        .context("serialising example configuration")?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, text).with_context(|| format!("writing {}", path.display()))?;
    println!("{}", path.display());
    Ok(())
}
