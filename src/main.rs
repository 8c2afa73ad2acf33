//! telepipe - Command Line Entry Point
//!
//! Runs one of the deployed flight-data systems over files and prints the
//! per-filter run report.

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use telepipe::{config::PipelineConfig, plumber, System};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SystemArg {
    A,
    B,
    C,
}

impl From<SystemArg> for System {
    fn from(arg: SystemArg) -> Self {
        match arg {
            SystemArg::A => System::A,
            SystemArg::B => System::B,
            SystemArg::C => System::C,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "telepipe")]
#[command(about = "Pipe-and-filter processing of flight telemetry streams")]
#[command(version)]
struct CliArgs {
    /// Which deployed system to run
    #[arg(value_enum)]
    system: SystemArg,

    /// TOML configuration file (defaults are used when omitted)
    #[arg(short, long, env = "TELEPIPE_CONFIG")]
    config: Option<PathBuf>,

    /// Directory that relative input and output paths are resolved against
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Input files, in the order the system reads them
    /// (A and B: flight data; C: subset A then subset B)
    #[arg(short, long)]
    input: Vec<PathBuf>,

    /// Output files, in the order the system writes them
    /// (A: output; B: output then wild points; C: below threshold then wild points)
    #[arg(short, long)]
    output: Vec<PathBuf>,

    /// Override the channel capacity (0 = unbounded)
    #[arg(long)]
    channel_capacity: Option<usize>,

    /// Write the run report as JSON to this file
    #[arg(long, value_name = "FILE")]
    report_json: Option<PathBuf>,
}

/// Fold command-line overrides into the loaded configuration.
fn apply_overrides(config: &mut PipelineConfig, args: &CliArgs) -> anyhow::Result<()> {
    if let Some(dir) = &args.data_dir {
        config.io.data_dir = Some(dir.clone());
    }
    if let Some(capacity) = args.channel_capacity {
        config.pipeline.channel_capacity = capacity;
    }

    let io = &mut config.io;
    let (inputs, outputs): (Vec<&mut PathBuf>, Vec<&mut PathBuf>) = match args.system {
        SystemArg::A => (vec![&mut io.flight_data], vec![&mut io.output_a]),
        SystemArg::B => (
            vec![&mut io.flight_data],
            vec![&mut io.output_b, &mut io.wild_points],
        ),
        SystemArg::C => (
            vec![&mut io.subset_a, &mut io.subset_b],
            vec![&mut io.below_threshold, &mut io.pressure_wild_points],
        ),
    };

    if args.input.len() > inputs.len() {
        bail!(
            "system {} reads {} input(s), got {}",
            System::from(args.system),
            inputs.len(),
            args.input.len()
        );
    }
    if args.output.len() > outputs.len() {
        bail!(
            "system {} writes {} output(s), got {}",
            System::from(args.system),
            outputs.len(),
            args.output.len()
        );
    }
    for (slot, path) in inputs.into_iter().zip(&args.input) {
        *slot = path.clone();
    }
    for (slot, path) in outputs.into_iter().zip(&args.output) {
        *slot = path.clone();
    }
    Ok(())
}

/// Install the stderr subscriber and, when configured, a daily log file.
///
/// The returned guard must stay alive for buffered file output to be flushed.
fn init_logging(config: &PipelineConfig) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let (file_layer, guard) = match &config.logging.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "telepipe.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,telepipe=debug")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    guard
}

fn main() -> anyhow::Result<ExitCode> {
    let args = CliArgs::parse();

    let mut config = match &args.config {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("Loading configuration {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    apply_overrides(&mut config, &args)?;

    let _log_guard = init_logging(&config);

    let system = System::from(args.system);
    tracing::info!(%system, "Starting telepipe");

    let pipeline = plumber::build_from_files(system, &config)?;
    let report = pipeline
        .run()
        .with_context(|| format!("Starting system {}", system))?;

    println!("{}", report);

    if let Some(path) = &args.report_json {
        let json = report.to_json().context("Serializing run report")?;
        std::fs::write(path, json)
            .with_context(|| format!("Writing run report {}", path.display()))?;
        tracing::info!(path = %path.display(), "Wrote run report");
    }

    if report.is_success() {
        tracing::info!(elapsed_ms = report.elapsed_ms, "System {} finished", system);
        Ok(ExitCode::SUCCESS)
    } else {
        for failure in report.failures() {
            tracing::error!(filter = %failure.name, outcome = ?failure.outcome, "Filter failed");
        }
        Ok(ExitCode::FAILURE)
    }
}
