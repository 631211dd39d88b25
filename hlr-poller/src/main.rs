//! RS-485 sensor poller binary.
//!
//! Loads the JSON5 configuration, builds a driver per configured sensor,
//! and runs the poll loop until Ctrl+C, persisting readings as rows.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::info;

use hlr_common::LoggingConfig;
use hlr_poller::bus::BusRegistry;
use hlr_poller::config::PollerConfig;
use hlr_poller::mock;
use hlr_poller::poller::SensorPoller;
use hlr_poller::sensor::SensorUnit;
use hlr_poller::store::ReadingStore;

/// RS-485 sensor poller for HLR interlock and air-quality units.
#[derive(Parser, Debug)]
#[command(name = "hlr-poller")]
#[command(about = "Polls RS-485 sensors and persists readings")]
#[command(version)]
struct Args {
    /// Path to configuration file (JSON5 format)
    #[arg(short, long, default_value = "hlr-poller.json5")]
    config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,

    /// Emit fixture readings instead of polling hardware.
    #[arg(long)]
    mock: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = PollerConfig::load_from_file(&args.config)
        .with_context(|| format!("Failed to load config from {:?}", args.config))?;

    // Initialize logging
    let log_config = LoggingConfig {
        level: args
            .log_level
            .clone()
            .unwrap_or_else(|| config.logging.level.clone()),
        format: config.logging.format,
    };
    hlr_common::init_tracing(&log_config)
        .map_err(|e| anyhow::anyhow!("Failed to init tracing: {}", e))?;

    info!("Starting hlr-poller");
    info!("Loaded configuration from {:?}", args.config);

    // Persistence sink, draining the reading channel
    let store = ReadingStore::new(&config.storage.data_dir, config.storage.format)
        .map_err(|e| anyhow::anyhow!("Failed to prepare data directory: {}", e))?;

    let (tx, rx) = mpsc::unbounded_channel();
    let store_task = tokio::spawn(store.run(rx));

    let interval = config.poller.interval();

    if args.mock {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let feeder = tokio::spawn(mock::run_feeder(
            config.sensors.clone(),
            tx,
            interval,
            shutdown_rx,
        ));

        tokio::signal::ctrl_c().await?;
        info!("Received shutdown signal");

        let _ = shutdown_tx.send(true);
        feeder.await?;
    } else {
        let bus = Arc::new(BusRegistry::new());
        let sensors: Vec<SensorUnit> = config
            .sensors
            .iter()
            .map(|sensor| SensorUnit::connect(sensor, bus.clone()))
            .collect();

        info!(sensors = sensors.len(), "sensor drivers ready");

        let mut poller = SensorPoller::new(sensors, tx, interval);
        poller.start();

        tokio::signal::ctrl_c().await?;
        info!("Received shutdown signal");

        poller.stop().await;
        // Dropping the poller drops the last sender; the store drains and ends.
        drop(poller);
    }

    store_task.await?;
    info!("hlr-poller stopped");

    Ok(())
}
