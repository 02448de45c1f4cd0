mod args;

pub use args::*;

use std::path::PathBuf;
use std::time::Duration;
use serde::{Deserialize, Serialize};
use config::{Config, Environment, File, FileFormat, Map};
use crate::Result;
use crate::window::{StoreStrategy, MAX_WINDOW_SECONDS};

pub const ENV_PREFIX: &str = "WINDOW_COUNTER";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub flush: FlushConfig,
    #[serde(default)]
    pub snapshot: SnapshotConfig,
    #[serde(default)]
    pub web: WebConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    #[serde(default = "default_window_seconds")]
    pub seconds: u64,
    #[serde(default)]
    pub strategy: StoreStrategy,
}

impl Default for WindowConfig {
    fn default() -> Self {
        WindowConfig {
            seconds: default_window_seconds(),
            strategy: StoreStrategy::default(),
        }
    }
}

fn default_window_seconds() -> u64 {
    60
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlushConfig {
    #[serde(default = "default_flush_interval_ms")]
    pub interval_ms: u64,
}

impl Default for FlushConfig {
    fn default() -> Self {
        FlushConfig { interval_ms: default_flush_interval_ms() }
    }
}

impl FlushConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

fn default_flush_interval_ms() -> u64 {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_snapshot_path")]
    pub path: String,
    /// 0 keeps only the shutdown snapshot.
    #[serde(default)]
    pub interval_secs: u64,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        SnapshotConfig {
            enabled: true,
            path: default_snapshot_path(),
            interval_secs: 0,
        }
    }
}

impl SnapshotConfig {
    pub fn path(&self) -> PathBuf {
        PathBuf::from(&self.path)
    }

    pub fn interval(&self) -> Option<Duration> {
        (self.enabled && self.interval_secs > 0).then(|| Duration::from_secs(self.interval_secs))
    }
}

fn default_true() -> bool {
    true
}

fn default_snapshot_path() -> String {
    "counter.json".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_listen")]
    pub listen: String,
    #[serde(default = "default_route")]
    pub route: String,
    #[serde(default = "default_workers")]
    pub workers: u64,
    #[serde(default)]
    pub debug: bool,
}

impl Default for WebConfig {
    fn default() -> Self {
        WebConfig {
            listen: default_listen(),
            route: default_route(),
            workers: default_workers(),
            debug: false,
        }
    }
}

fn default_listen() -> String {
    ":8080".to_string()
}

fn default_route() -> String {
    "/counter".to_string()
}

fn default_workers() -> u64 {
    2
}

impl AppConfig {
    pub fn validate(&self) -> Result<()> {
        if self.window.seconds == 0 || self.window.seconds > MAX_WINDOW_SECONDS {
            return Err(format!("window.seconds must be between 1 and {}, found {}", MAX_WINDOW_SECONDS, self.window.seconds));
        }
        if self.flush.interval_ms == 0 {
            return Err("flush.interval_ms must be positive".to_string());
        }
        if self.web.workers == 0 {
            return Err("web.workers must be positive".to_string());
        }
        if !self.web.route.starts_with('/') {
            return Err(format!("web.route must start with '/': {}", self.web.route));
        }
        if self.snapshot.enabled && self.snapshot.path.is_empty() {
            return Err("snapshot.path must not be empty".to_string());
        }
        Ok(())
    }
}

/// Defaults, then the optional YAML file, then `WINDOW_COUNTER_*` variables,
/// then command-line flags.
pub fn load_config(args: &Args) -> Result<AppConfig> {
    load_config_with_env(args, None)
}

/// `env` replaces the process environment when given.
fn load_config_with_env(args: &Args, env: Option<Map<String, String>>) -> Result<AppConfig> {
    let mut builder = Config::builder();
    if let Some(path) = &args.config {
        let path = path.to_str().ok_or_else(|| format!("config path is not utf-8: {}", path.display()))?;
        builder = builder.add_source(File::new(path, FileFormat::Yaml));
    }
    let builder = builder
        .add_source(Environment::with_prefix(ENV_PREFIX).prefix_separator("_").separator("__").try_parsing(true).source(env))
        .set_override_option("window.seconds", args.window_seconds)
        .and_then(|b| b.set_override_option("window.strategy", args.strategy.map(|s| s.name())))
        .and_then(|b| b.set_override_option("snapshot.path", args.output_file.clone()))
        .and_then(|b| b.set_override_option("snapshot.enabled", args.no_persist.then_some(false)))
        .and_then(|b| b.set_override_option("snapshot.interval_secs", args.snapshot_interval_secs))
        .and_then(|b| b.set_override_option("flush.interval_ms", args.flush_interval_ms))
        .and_then(|b| b.set_override_option("web.listen", args.listen.clone()))
        .and_then(|b| b.set_override_option("web.route", args.route.clone()))
        .and_then(|b| b.set_override_option("web.workers", args.workers))
        .and_then(|b| b.set_override_option("web.debug", args.debug.then_some(true)))
        .map_err(|e| format!("invalid command line override: {}", e))?;
    let config: AppConfig = builder.build()
        .and_then(|c| c.try_deserialize())
        .map_err(|e| format!("failed to load config: {}", e))?;
    config.validate()?;
    Ok(config)
}
