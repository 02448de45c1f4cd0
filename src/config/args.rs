use std::path::PathBuf;
use clap::Parser;
use crate::window::StoreStrategy;

/// Counts requests to a single endpoint over a sliding window.
#[derive(Debug, Default, Parser)]
#[command(name = "window-counter", version)]
pub struct Args {
    /// YAML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Width of the counted window in seconds
    #[arg(long)]
    pub window_seconds: Option<u64>,

    /// Bucket storage strategy
    #[arg(long, value_enum)]
    pub strategy: Option<StoreStrategy>,

    /// File that keeps request data across restarts
    #[arg(long)]
    pub output_file: Option<String>,

    /// Do not load or save a snapshot
    #[arg(long)]
    pub no_persist: bool,

    /// Also save the snapshot every N seconds while running, 0 disables
    #[arg(long)]
    pub snapshot_interval_secs: Option<u64>,

    /// How often pending requests are moved into the window, in milliseconds
    #[arg(long)]
    pub flush_interval_ms: Option<u64>,

    /// Listen address, `:8080` binds every interface
    #[arg(long)]
    pub listen: Option<String>,

    /// Path answered with the request count
    #[arg(long)]
    pub route: Option<String>,

    /// Number of HTTP worker threads
    #[arg(long)]
    pub workers: Option<u64>,

    /// Append the bucket contents to every response
    #[arg(long)]
    pub debug: bool,

    /// Log specification when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    pub log_level: String,
}
