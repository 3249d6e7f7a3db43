// CLI module for smartsports-edge
// Author: kelexine (https://github.com/kelexine)

use clap::Parser;

/// smartsports-edge - Offline-first caching router for the SmartSports web app
#[derive(Parser, Debug)]
#[command(name = "smartsports-edge", version, about, long_about = None)]
pub struct Args {
    /// Path to a TOML config file (default: ~/.smartsports-edge/config.toml)
    #[arg(long, short, env = "SMARTSPORTS_EDGE_CONFIG")]
    pub config: Option<String>,

    /// Skip precaching and activate immediately with whatever partitions exist
    #[arg(long)]
    pub skip_install: bool,
}
