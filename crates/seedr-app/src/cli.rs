//! Command-line surface of the `seedr` binary.

use std::path::PathBuf;

use clap::Parser;

use crate::bootstrap::RunOptions;

/// Tiered torrent retention daemon.
#[derive(Debug, Parser)]
#[command(name = "seedr", version, about = "Move or delete torrents to keep storage tiers within bounds")]
pub struct Cli {
    /// Configuration file; defaults to `seedr.yaml` discovery.
    #[arg(long, env = "SEEDR_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,
    /// Log eviction decisions without touching the client.
    #[arg(long)]
    pub dry_run: bool,
    /// Run a single eviction pass and exit.
    #[arg(long)]
    pub once: bool,
    /// Override `log.level`.
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,
}

impl From<Cli> for RunOptions {
    fn from(cli: Cli) -> Self {
        Self {
            config_path: cli.config,
            dry_run: cli.dry_run,
            once: cli.once,
            log_level: cli.log_level,
        }
    }
}
