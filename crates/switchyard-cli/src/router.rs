//! Command routing logic for CLI

use crate::args::{Cli, Commands, CooldownAction};
use crate::commands;
use crate::console::CliConsole;
use crate::context;
use switchyard_core::config::SwitchyardConfig;

/// Route CLI commands to their respective handlers
pub async fn route(cli: Cli, config: SwitchyardConfig) -> anyhow::Result<()> {
    let console = CliConsole::new(cli.verbose);

    // `check` only needs the configuration
    if let Commands::Check = cli.command {
        commands::check::check(&console, &cli.config, &config);
        return Ok(());
    }

    let dir = context::data_dir(cli.data_dir.as_deref(), &config)?;
    console.info(&format!("Ledger directory: {}", dir.display()));
    let ledger = context::open_ledger(&dir, &config).await?;

    match cli.command {
        Commands::Check => Ok(()),
        Commands::Usage { backend } => {
            commands::usage::usage(&console, &ledger, &config, backend.as_deref()).await
        }
        Commands::Cooldown { action } => match action {
            CooldownAction::Set {
                backend_id,
                seconds,
            } => commands::cooldown::set(&console, &ledger, &config, &backend_id, seconds).await,
            CooldownAction::Clear { backend_id } => {
                commands::cooldown::clear(&console, &ledger, &backend_id).await
            }
        },
        Commands::Clear { yes } => commands::clear::clear(&console, &ledger, yes).await,
    }
}
