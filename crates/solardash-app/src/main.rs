//! SolarDash - headless dashboard engine
//!
//! Usage: `solardash [CONFIG]`. Type `units` or `reset` on stdin to work the
//! dashboard buttons; Ctrl-C stops.

mod commands;
mod sink;
mod sources;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use solardash_core::prelude::*;

use crate::sink::LogSink;

const DEFAULT_CONFIG_PATH: &str = "solardash.json";

#[derive(Parser, Debug)]
#[command(name = "solardash", version)]
#[command(about = "Headless SolarDash vehicle dashboard engine", long_about = None)]
struct Cli {
    /// Configuration file (default: solardash.json if present, else built-in defaults)
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,
}

/// Load `explicit` if given; otherwise `default_path` when it exists
fn load_config(explicit: Option<&Path>, default_path: &Path) -> Result<DashboardConfig> {
    let path = match explicit {
        Some(path) => path,
        None if default_path.exists() => default_path,
        None => {
            warn!("{} not found, using default configuration", default_path.display());
            return Ok(DashboardConfig::default());
        }
    };
    DashboardConfig::load(path).with_context(|| format!("Failed to load {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = load_config(cli.config.as_deref(), Path::new(DEFAULT_CONFIG_PATH))?;
    let geo_box = config.validate().context("Invalid configuration")?;
    info!(
        "SolarDash {} starting with {:?} sources",
        solardash_core::VERSION,
        config.source.mode
    );

    let cancel = CancellationToken::new();
    let health = HealthBoard::new(config.io.fault_alert_threshold);
    let controls = DashboardControls::new(config.units.system());

    let (inputs, workers) = sources::start(&config, geo_box, &health, &cancel)?;
    let sink = LogSink::new(config.video.surface());
    let scheduler = Scheduler::new(&config, geo_box, inputs, sink, controls.clone(), health)?;
    let scheduler_task = tokio::spawn(scheduler.run(cancel.child_token()));
    commands::spawn_stdin_reader(controls).context("Failed to start console reader")?;

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    info!("Shutting down");
    cancel.cancel();

    let scheduler = scheduler_task.await.context("Scheduler task failed")?;
    info!("Final readouts: {}", scheduler.snapshot().lines().join(" / "));
    info!("{} camera frames shown", scheduler.sink().frames());

    tokio::task::spawn_blocking(move || workers.shutdown())
        .await
        .context("Failed to stop workers")?;
    Ok(())
}
