//! CLI argument definitions using clap
//!
//! - switchyard check                  # Validate config, list backends
//! - switchyard usage [--backend ID]   # Show ledger usage per window
//! - switchyard cooldown set ID SECS   # Put a backend on cooldown
//! - switchyard cooldown clear ID      # Lift a cooldown
//! - switchyard clear --yes            # Reset the ledger

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Default configuration file name used across all CLI commands.
pub const DEFAULT_CONFIG_FILE: &str = "switchyard.toml";

#[derive(Parser, Debug)]
#[command(name = "switchyard")]
#[command(about = "Inspect and manage the Switchyard usage ledger")]
#[command(version)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Ledger directory (overrides `data_dir` from the config, defaults to ~/.switchyard)
    #[arg(long, global = true, env = "SWITCHYARD_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load and validate the configuration, then list backends in priority order
    Check,

    /// Show request and token usage for the minute, hour and day windows
    Usage {
        /// Only report this backend
        #[arg(long)]
        backend: Option<String>,
    },

    /// Set or clear a backend cooldown
    Cooldown {
        #[command(subcommand)]
        action: CooldownAction,
    },

    /// Delete every recorded usage event and cooldown
    Clear {
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum CooldownAction {
    /// Exclude a backend from selection for a number of seconds
    Set {
        /// Backend id
        backend_id: String,
        /// Cooldown length in seconds
        seconds: u64,
    },
    /// Make a backend eligible again immediately
    Clear {
        /// Backend id
        backend_id: String,
    },
}
