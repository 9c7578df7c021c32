use clap::Parser;
use std::path::PathBuf;

use crate::config::AppConfig;

/// Self-play generation client
#[derive(Debug, Parser)]
#[command(name = "playgen", version, about)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "playgen.toml")]
    pub config: PathBuf,

    /// Distribution server base URL (overrides config)
    #[arg(long)]
    pub server: Option<String>,

    /// Device identifiers to play on, e.g. `-u 0 -u 1` (overrides config)
    #[arg(short = 'u', long = "gpu")]
    pub gpus: Vec<String>,

    /// Concurrent games per device (overrides config)
    #[arg(short = 'g', long)]
    pub games_per_device: Option<usize>,

    /// Directory to retain SGF result files after upload
    #[arg(short = 'k', long)]
    pub keep_path: Option<PathBuf>,

    /// Directory to retain training/debug data files after upload
    #[arg(short = 'd', long)]
    pub debug_path: Option<PathBuf>,
}

impl Cli {
    /// Layer command-line overrides on top of the loaded configuration.
    pub fn apply(&self, cfg: &mut AppConfig) {
        if let Some(server) = &self.server {
            cfg.server.base_url = server.clone();
        }
        if !self.gpus.is_empty() {
            cfg.pool.gpus = self.gpus.clone();
        }
        if let Some(games) = self.games_per_device {
            cfg.pool.games_per_device = games;
        }
        if self.keep_path.is_some() {
            cfg.paths.keep_dir = self.keep_path.clone();
        }
        if self.debug_path.is_some() {
            cfg.paths.debug_dir = self.debug_path.clone();
        }
    }
}
