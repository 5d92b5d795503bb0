//! Command-line arguments for fplan-dm

use clap::Parser;
use std::path::PathBuf;

/// Where the tracker serves hand-off items by default
pub const DEFAULT_FLIGHT_PLANS_API: &str = "http://127.0.0.1:5000/flight-plan";

#[derive(Parser, Debug, Clone)]
#[command(name = "fplan-dm")]
#[command(about = "Flight-plan database manager")]
#[command(version)]
pub struct Args {
    /// Tracker hand-off endpoint
    #[arg(long, default_value = DEFAULT_FLIGHT_PLANS_API, env = "FLIGHT_PLANS_API")]
    pub flight_plans_api: String,

    /// SQLite store path
    #[arg(long, env = "FPLAN_DATABASE")]
    pub database: Option<PathBuf>,

    /// TOML config file
    #[arg(long, env = "FPLAN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Delay between polls of an empty hand-off queue, in milliseconds
    #[arg(long, env = "FPLAN_POLL_INTERVAL_MS")]
    pub poll_interval_ms: Option<u64>,

    /// Timeout for one hand-off request, in milliseconds
    #[arg(long, env = "FPLAN_REQUEST_TIMEOUT_MS")]
    pub request_timeout_ms: Option<u64>,
}
