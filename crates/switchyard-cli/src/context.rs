//! Configuration and ledger setup shared by every command

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use switchyard_core::config::{SwitchyardConfig, load_from_file};
use switchyard_core::{JsonFileStore, UsageLedger};
use tracing::debug;

/// Directory name under the home directory used when nothing else is set
const DEFAULT_DATA_DIR: &str = ".switchyard";

/// Load and validate the configuration file (defaults when it is absent)
pub fn load_config(path: &Path) -> Result<SwitchyardConfig> {
    load_from_file(path).with_context(|| format!("Failed to load {}", path.display()))
}

/// Resolve the ledger directory: flag, then config, then `~/.switchyard`
pub fn data_dir(flag: Option<&Path>, config: &SwitchyardConfig) -> Result<PathBuf> {
    if let Some(dir) = flag.or(config.data_dir.as_deref()) {
        return Ok(dir.to_path_buf());
    }
    let home = dirs::home_dir().context("Could not determine the home directory")?;
    Ok(home.join(DEFAULT_DATA_DIR))
}

/// Open the durable ledger with the configured storage keys
pub async fn open_ledger(dir: &Path, config: &SwitchyardConfig) -> Result<UsageLedger> {
    let store = JsonFileStore::open(dir)
        .await
        .with_context(|| format!("Failed to open ledger at {}", dir.display()))?;
    debug!(dir = %dir.display(), "Opened usage ledger");
    Ok(UsageLedger::new(Arc::new(store)).with_config(config.ledger.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_flag_overrides_config_dir() {
        let config = SwitchyardConfig {
            data_dir: Some(PathBuf::from("/from/config")),
            ..Default::default()
        };
        let dir = data_dir(Some(Path::new("/from/flag")), &config).unwrap();
        assert_eq!(dir, PathBuf::from("/from/flag"));

        let dir = data_dir(None, &config).unwrap();
        assert_eq!(dir, PathBuf::from("/from/config"));
    }

    #[test]
    fn test_invalid_config_is_reported() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("switchyard.toml");
        std::fs::write(
            &path,
            "[[router.backends]]\nbackend_id = \"a\"\n\n[[router.backends]]\nbackend_id = \"a\"\n",
        )
        .unwrap();

        let err = load_config(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("Duplicate backend id"));
    }

    #[tokio::test]
    async fn test_open_ledger_creates_directory() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("nested").join("ledger");

        let ledger = open_ledger(&dir, &SwitchyardConfig::default()).await.unwrap();

        assert!(dir.is_dir());
        assert!(ledger.known_backends().await.unwrap().is_empty());
    }
}
