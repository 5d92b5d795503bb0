//! Command-line arguments for fplan-tracker
//!
//! Every argument can also come from the environment. Settings left unset
//! here fall back to the TOML config file, then to built-in defaults.

use clap::Parser;
use std::path::PathBuf;

/// Default port for the hand-off endpoint
pub const DEFAULT_PORT: u16 = 5000;

#[derive(Parser, Debug, Clone)]
#[command(name = "fplan-tracker")]
#[command(about = "Flight-plan feed ingest and hand-off service")]
#[command(version)]
pub struct Args {
    /// Upstream feed endpoint returning one decoded message per call
    #[arg(long, env = "JMS_API")]
    pub feed_url: String,

    /// Port to serve the hand-off endpoint on
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "FPLAN_TRACKER_PORT")]
    pub port: u16,

    /// SQLite store path
    #[arg(long, env = "FPLAN_DATABASE")]
    pub database: Option<PathBuf>,

    /// TOML config file
    #[arg(long, env = "FPLAN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Delay between feed polls, in milliseconds
    #[arg(long, env = "FPLAN_POLL_INTERVAL_MS")]
    pub poll_interval_ms: Option<u64>,

    /// Timeout for one feed request, in milliseconds
    #[arg(long, env = "FPLAN_REQUEST_TIMEOUT_MS")]
    pub request_timeout_ms: Option<u64>,

    /// Only track aircraft whose acid ends with this suffix
    #[arg(long, env = "FPLAN_ACID_SUFFIX")]
    pub acid_suffix: Option<String>,
}
