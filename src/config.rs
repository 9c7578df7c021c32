use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    #[serde(default)]
    pub pool: PoolSettings,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub sync: SyncSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Base URL of the distribution server
    pub base_url: String,
    /// Version number this client reports to the server
    #[serde(default = "default_client_version")]
    pub client_version: u32,
}

fn default_client_version() -> u32 {
    1
}

/// Worker pool sizing: one worker per (device, game slot) pair
#[derive(Debug, Clone, Deserialize)]
pub struct PoolSettings {
    /// Device identifiers (e.g. GPU indices); empty means one unnamed device
    #[serde(default)]
    pub gpus: Vec<String>,
    /// Concurrent games per device
    #[serde(default = "default_games_per_device")]
    pub games_per_device: usize,
}

fn default_games_per_device() -> usize {
    1
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            gpus: Vec::new(),
            games_per_device: default_games_per_device(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Engine executable
    #[serde(default = "default_engine_command")]
    pub command: String,
    /// Base arguments, before per-game options are appended
    #[serde(default = "default_engine_args")]
    pub args: Vec<String>,
    /// Minimum engine version this client can drive
    #[serde(default = "default_min_engine_version")]
    pub min_version: String,
}

fn default_engine_command() -> String {
    "leelaz".to_string()
}

fn default_engine_args() -> Vec<String> {
    ["-g", "-q", "-d", "-n", "-m", "30"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_min_engine_version() -> String {
    "0.12".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            command: default_engine_command(),
            args: default_engine_args(),
            min_version: default_min_engine_version(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PathsConfig {
    /// Directory where downloaded artifacts are stored
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Optional directory to retain result (SGF) files after upload
    #[serde(default)]
    pub keep_dir: Option<PathBuf>,
    /// Optional directory to retain training/debug data files after upload
    #[serde(default)]
    pub debug_dir: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            keep_dir: None,
            debug_dir: None,
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(".")
}

/// Retry/backoff tuning for artifact resolution
#[derive(Debug, Clone, Deserialize)]
pub struct SyncSettings {
    #[serde(default = "default_base_delay_secs")]
    pub base_delay_secs: u64,
    #[serde(default = "default_max_delay_secs")]
    pub max_delay_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_base_delay_secs() -> u64 {
    30
}

fn default_max_delay_secs() -> u64 {
    60 * 60
}

fn default_max_retries() -> u32 {
    4 * 24
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            base_delay_secs: default_base_delay_secs(),
            max_delay_secs: default_max_delay_secs(),
            max_retries: default_max_retries(),
        }
    }
}

impl AppConfig {
    /// Load configuration from an optional TOML file, with `PLAYGEN_*`
    /// environment variables layered on top.
    pub fn load(path: &Path) -> Result<Self> {
        let cfg = Config::builder()
            .add_source(File::from(path.to_path_buf()).required(false))
            .add_source(Environment::with_prefix("PLAYGEN").separator("__"))
            .build()?;
        Ok(cfg.try_deserialize()?)
    }
}
