//! Fogmesh Simulator CLI
//!
//! Run deterministic fog placement and routing simulations.
//!
//! # Example
//!
//! ```bash
//! # Built-in demo: 3 gateways with 4 clients each, fixed seed
//! fogmesh-sim --seed 42 -g 3 -c 4 -d 120
//!
//! # Scenario file with a faster placement cycle
//! fogmesh-sim --config scenario.toml --placement-interval-ms 200
//!
//! # Dump Prometheus metrics after the run
//! fogmesh-sim --seed 7 --metrics-out metrics.prom
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use fogmesh_simulator::{ScenarioConfig, Simulator};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Fogmesh Simulator
///
/// Places microservices on a fog topology and routes sensor traffic through
/// them. Single-threaded, reproducible when the same seed is used.
#[derive(Parser, Debug)]
#[command(name = "fogmesh-sim")]
#[command(version, about, long_about = None)]
struct Args {
    /// Scenario file (TOML). When omitted, the built-in demo is used.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of gateways of the built-in demo
    #[arg(short = 'g', long, default_value = "2")]
    gateways: u32,

    /// Number of clients per gateway of the built-in demo
    #[arg(short = 'c', long, default_value = "2")]
    clients: u32,

    /// Simulation duration in seconds. Overrides the scenario.
    #[arg(short = 'd', long)]
    duration: Option<u64>,

    /// Random seed for reproducible results. Overrides the scenario; when
    /// neither sets one, a random seed is used.
    #[arg(long)]
    seed: Option<u64>,

    /// Placement cycle interval in milliseconds. Overrides the scenario.
    #[arg(long)]
    placement_interval_ms: Option<u64>,

    /// Placement strategy. Overrides the scenario.
    #[arg(long)]
    strategy: Option<String>,

    /// Write the Prometheus text exposition of the run's metrics to this file
    #[arg(long)]
    metrics_out: Option<PathBuf>,

    /// Log filter (e.g. "debug" or "warn,fogmesh_node=debug"). Overrides RUST_LOG.
    #[arg(long)]
    log_level: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = match &args.log_level {
        Some(level) => EnvFilter::try_new(level).context("Invalid --log-level")?,
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("warn,fogmesh_simulator=info")),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    fogmesh_metrics_prometheus::install().context("Failed to register metrics")?;

    let mut config = match &args.config {
        Some(path) => ScenarioConfig::load(path)
            .with_context(|| format!("Failed to load scenario {}", path.display()))?,
        None => ScenarioConfig::demo(args.gateways, args.clients),
    };
    if let Some(duration) = args.duration {
        config.duration_secs = duration;
    }
    if let Some(interval) = args.placement_interval_ms {
        config.placement_interval_ms = interval;
    }
    if let Some(strategy) = args.strategy {
        config.strategy = strategy;
    }

    let seed = args.seed.or(config.seed).unwrap_or_else(rand::random);

    info!(
        scenario = args
            .config
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "demo".to_owned()),
        devices = config.devices.len(),
        applications = config.applications.len(),
        sensors = config.sensors.len(),
        duration_secs = config.duration_secs,
        placement_interval_ms = config.placement_interval_ms,
        strategy = %config.strategy,
        seed,
        "Starting simulation"
    );

    let mut simulator = Simulator::new(&config, seed).context("Failed to create simulator")?;
    simulator.initialize();

    let report = simulator.run_for(Duration::from_secs(config.duration_secs));
    report.print_summary();

    if let Some(path) = &args.metrics_out {
        let (_, body) = fogmesh_metrics_prometheus::encode_metrics()?;
        std::fs::write(path, body)
            .with_context(|| format!("Failed to write metrics to {}", path.display()))?;
        info!(path = %path.display(), "Metrics written");
    }

    Ok(())
}
