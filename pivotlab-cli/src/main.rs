//! PivotLab CLI: replay bars through the strategy engine.
//!
//! Commands:
//! - `run`: replay a CSV bar file under a TOML config or named preset
//! - `demo`: replay a seeded synthetic session stream
//! - `config`: print a preset as TOML, with its fingerprint

mod feed;
mod report;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use pivotlab_core::config::{StrategyConfig, StrategyPreset};
use pivotlab_core::domain::Bar;
use pivotlab_core::engine::StrategyEngine;
use pivotlab_core::fingerprint::RunFingerprint;
use pivotlab_core::host::RecordingHost;
use pivotlab_core::synthetic::SyntheticMarket;
use tracing_subscriber::EnvFilter;

use report::RunManifest;

#[derive(Parser)]
#[command(
    name = "pivotlab",
    about = "PivotLab CLI: market-structure detection and position state machine"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a CSV bar file (time,open,high,low,close,volume).
    Run {
        /// Path to the bar CSV.
        #[arg(long)]
        bars: PathBuf,

        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Named preset: baseline, sweep_bos_order_block, optimized.
        #[arg(long)]
        preset: Option<String>,

        /// Account equity reported to percentage-risk sizing.
        #[arg(long)]
        equity: Option<f64>,

        /// Output directory for run artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
    /// Replay seeded synthetic 5-minute sessions.
    Demo {
        /// Number of bars to generate.
        #[arg(long, default_value_t = 3900)]
        bars: usize,

        #[arg(long, default_value_t = 42)]
        seed: u64,

        #[arg(long, default_value = "sweep_bos_order_block")]
        preset: String,

        #[arg(long)]
        equity: Option<f64>,

        /// Write artifacts here; nothing is written when omitted.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Print a preset's configuration as TOML.
    Config {
        #[arg(long, default_value = "sweep_bos_order_block")]
        preset: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            bars,
            config,
            preset,
            equity,
            output_dir,
        } => run_file_cmd(bars, config, preset, equity, output_dir),
        Commands::Demo {
            bars,
            seed,
            preset,
            equity,
            output_dir,
        } => run_demo_cmd(bars, seed, &preset, equity, output_dir),
        Commands::Config { preset } => print_config_cmd(&preset),
    }
}

fn run_file_cmd(
    bars_path: PathBuf,
    config_path: Option<PathBuf>,
    preset_name: Option<String>,
    equity: Option<f64>,
    output_dir: PathBuf,
) -> Result<()> {
    if config_path.is_some() && preset_name.is_some() {
        bail!("--config and --preset are mutually exclusive");
    }
    let (config, preset) = match (config_path, preset_name) {
        (Some(path), None) => (StrategyConfig::from_file(&path)?, None),
        (None, Some(name)) => {
            let preset: StrategyPreset = name.parse()?;
            (preset.config(), Some(preset))
        }
        _ => (StrategyConfig::default(), None),
    };

    let bars = feed::read_bars(&bars_path)?;
    let manifest = replay(config, preset, None, &bars, equity, Some(&output_dir))?;
    report::print_summary(&manifest);
    Ok(())
}

fn run_demo_cmd(
    count: usize,
    seed: u64,
    preset_name: &str,
    equity: Option<f64>,
    output_dir: Option<PathBuf>,
) -> Result<()> {
    if count == 0 {
        bail!("--bars must be at least 1");
    }
    let preset: StrategyPreset = preset_name.parse()?;
    let bars = SyntheticMarket::new(seed).generate(count);
    let manifest = replay(
        preset.config(),
        Some(preset),
        Some(seed),
        &bars,
        equity,
        output_dir.as_deref(),
    )?;
    report::print_summary(&manifest);
    Ok(())
}

fn print_config_cmd(preset_name: &str) -> Result<()> {
    let preset: StrategyPreset = preset_name.parse()?;
    let config = preset.config();
    println!("# preset: {preset}");
    println!("# fingerprint: {}", config.fingerprint()?);
    print!("{}", config.to_toml_string()?);
    Ok(())
}

/// Feed `bars` through a fresh engine and optionally save the artifacts.
fn replay(
    config: StrategyConfig,
    preset: Option<StrategyPreset>,
    seed: Option<u64>,
    bars: &[Bar],
    equity: Option<f64>,
    output_dir: Option<&std::path::Path>,
) -> Result<RunManifest> {
    let fingerprint = RunFingerprint::new(&config, bars, preset.map(|p| p.name().to_string()), seed)?;
    tracing::info!(
        run_id = fingerprint.run_id.as_str(),
        config = %fingerprint.config_hash.short(),
        bars = bars.len(),
        "starting run"
    );

    let mut host = equity.map_or_else(RecordingHost::new, RecordingHost::with_equity);
    let mut engine = StrategyEngine::new(config)?;
    let result = engine
        .run(bars, &mut host)
        .context("bar stream rejected by the engine")?;

    let manifest = RunManifest {
        fingerprint,
        summary: result.summary.clone(),
        order_requests: host.orders.len(),
        open_position_at_end: !engine.machine().is_flat(),
    };

    if let Some(dir) = output_dir {
        let run_dir = report::save_artifacts(dir, &manifest, &result, bars, &host)?;
        println!("Artifacts saved to: {}", run_dir.display());
    }
    Ok(manifest)
}
