//! `switchyard clear`: ledger reset

use crate::console::CliConsole;
use anyhow::{Result, bail};
use switchyard_core::UsageLedger;

/// Erase all usage events and cooldowns; refuses without `--yes`
pub async fn clear(console: &CliConsole, ledger: &UsageLedger, yes: bool) -> Result<()> {
    if !yes {
        console.error("This deletes all recorded usage and cooldowns for every router");
        bail!("Refusing to clear the ledger without --yes");
    }

    let known = ledger.known_backends().await?;
    ledger.clear_all().await?;
    console.success(&format!(
        "Cleared usage ledger ({} backend(s) reset)",
        known.len()
    ));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use switchyard_core::{MemoryStore, UsageKind};

    #[tokio::test]
    async fn test_clear_requires_confirmation() {
        let ledger = UsageLedger::new(Arc::new(MemoryStore::new()));
        ledger.consume("p1", UsageKind::Requests, 1).await.unwrap();
        let console = CliConsole::new(false);

        assert!(clear(&console, &ledger, false).await.is_err());
        assert_eq!(ledger.known_backends().await.unwrap().len(), 1);

        ledger
            .set_cooldown("p2", Duration::from_secs(60))
            .await
            .unwrap();
        clear(&console, &ledger, true).await.unwrap();
        assert!(ledger.known_backends().await.unwrap().is_empty());
    }
}
