//! Command line argument definitions.

use std::path::PathBuf;

use clap::Parser;
use uuid::Uuid;

/// TokenBeacon peripheral demonstration.
///
/// Runs the peripheral against a scripted in-memory radio backend:
/// power-on, registration, advertising, a chunked read session, a rejected
/// write batch, and an expiry-with-refresh round.
#[derive(Parser, Debug)]
#[command(name = "tokenbeacon", version)]
pub struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override the advertised service identifier
    #[arg(long)]
    pub service_uuid: Option<Uuid>,

    /// Override the token characteristic identifier
    #[arg(long)]
    pub characteristic_uuid: Option<Uuid>,

    /// Override the demo token time-to-live in milliseconds
    #[arg(long)]
    pub token_ttl_ms: Option<u64>,

    /// Override the simulated per-read transfer size in bytes
    #[arg(long)]
    pub mtu: Option<usize>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,
}
