//! TokenBeacon CLI entry point.

mod cli;
mod config;
mod sim;

use anyhow::Result;
use clap::Parser;
use tokenbeacon_core::{SystemTimeSource, TimeSource};
use tokenbeacon_runtime::PeripheralRuntimeBuilder;
use tracing::info;

use crate::cli::Cli;
use crate::config::AppConfig;
use crate::sim::{RotatingTokenSource, SimulatedRadio};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    // Initialize logging
    setup_logging(cli.verbose);

    // Load configuration and apply overrides
    let mut config = AppConfig::load(cli.config.as_deref())?;
    config.apply_overrides(&cli);
    let peripheral_config = config.peripheral.to_core_config()?;

    info!(
        service = %peripheral_config.service_uuid,
        characteristic = %peripheral_config.characteristic_uuid,
        "Starting TokenBeacon peripheral demo"
    );

    // Spawn the peripheral runtime with the rotating token source
    let source = RotatingTokenSource::new(config.demo.token_ttl_ms);
    let (runtime, endpoint) =
        PeripheralRuntimeBuilder::new(peripheral_config, Box::new(source)).spawn();
    let handle = runtime.handle();

    // Install the initial token; the stats round-trip ensures the update is
    // processed before the backend starts reading
    handle
        .update_token(
            b"token-0000".to_vec(),
            SystemTimeSource.now() + config.demo.token_ttl_ms,
        )
        .await?;
    handle.stats().await?;

    // Drive the scripted radio session
    let radio = SimulatedRadio::new(endpoint, config.demo.mtu, config.demo.token_ttl_ms);
    radio.run().await?;

    // Report activity counters and shut down
    let stats = handle.stats().await?;
    println!("{}", serde_json::to_string_pretty(&stats)?);

    handle.shutdown().await?;
    runtime.join().await?;

    info!("TokenBeacon demo exited successfully");
    Ok(())
}

/// Setup logging based on verbosity level
fn setup_logging(verbose: bool) {
    let log_level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}
