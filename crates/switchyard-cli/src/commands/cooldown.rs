//! `switchyard cooldown`: manual cooldown control

use crate::console::CliConsole;
use anyhow::Result;
use chrono::Local;
use std::time::Duration;
use switchyard_core::UsageLedger;
use switchyard_core::config::SwitchyardConfig;

/// Put a backend on cooldown for `seconds`
pub async fn set(
    console: &CliConsole,
    ledger: &UsageLedger,
    config: &SwitchyardConfig,
    backend_id: &str,
    seconds: u64,
) -> Result<()> {
    if config.router.backend(backend_id).is_none() {
        console.warn(&format!("'{}' is not a configured backend", backend_id));
    }

    ledger
        .set_cooldown(backend_id, Duration::from_secs(seconds))
        .await?;

    match ledger.cooldown_until(backend_id).await? {
        Some(until) => console.success(&format!(
            "{} is cooling down until {}",
            backend_id,
            until.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
        )),
        // A zero-second cooldown has already expired
        None => console.success(&format!("{} is available", backend_id)),
    }
    Ok(())
}

/// Lift a backend's cooldown
pub async fn clear(console: &CliConsole, ledger: &UsageLedger, backend_id: &str) -> Result<()> {
    if ledger.clear_cooldown(backend_id).await? {
        console.success(&format!("Cleared cooldown for {}", backend_id));
    } else {
        console.warn(&format!("{} was not cooling down", backend_id));
    }
    Ok(())
}
