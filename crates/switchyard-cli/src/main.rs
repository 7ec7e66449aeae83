//! Switchyard CLI
//!
//! Inspects and manages the durable usage ledger that Switchyard routers
//! account against. Routers themselves are embedded in host applications;
//! this binary only touches the shared ledger and the configuration file.
//!
//! # Installation
//!
//! ```bash
//! cargo install --path crates/switchyard-cli
//! ```

mod args;
mod commands;
mod console;
mod context;
mod router;

use args::Cli;
use clap::Parser;
use switchyard_core::config::LoggingConfig;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = context::load_config(&cli.config)?;
    init_logging(&config.logging, cli.verbose);

    router::route(cli, config).await
}

/// Install the global subscriber
///
/// `RUST_LOG` wins over the configured level; `--verbose` forces debug.
fn init_logging(logging: &LoggingConfig, verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level))
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match logging.format.as_str() {
        "json" => builder.json().init(),
        "compact" => builder.compact().init(),
        _ => builder.pretty().init(),
    }
}
