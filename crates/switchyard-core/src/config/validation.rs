//! Configuration validation
//!
//! Runs at the deserialization boundary; the router assumes a validated
//! configuration and does not re-check these invariants.

use super::types::{RouterConfig, SwitchyardConfig};
use crate::error::{SwitchyardError, SwitchyardResult};
use std::collections::HashSet;

/// Validate a full configuration
pub fn validate(config: &SwitchyardConfig) -> SwitchyardResult<()> {
    validate_router(&config.router)?;

    if config.ledger.events_key.trim().is_empty() || config.ledger.cooldowns_key.trim().is_empty()
    {
        return Err(SwitchyardError::config("Ledger storage keys must not be empty"));
    }
    if config.ledger.events_key == config.ledger.cooldowns_key {
        return Err(SwitchyardError::config(
            "Ledger events and cooldowns must use different storage keys",
        ));
    }

    Ok(())
}

/// Validate router settings and the backend list
pub fn validate_router(config: &RouterConfig) -> SwitchyardResult<()> {
    let mut seen = HashSet::new();
    for backend in &config.backends {
        if backend.backend_id.trim().is_empty() {
            return Err(SwitchyardError::config("Backend id must not be empty"));
        }
        if !seen.insert(backend.backend_id.as_str()) {
            return Err(SwitchyardError::config(format!(
                "Duplicate backend id: {}",
                backend.backend_id
            )));
        }
        if let Some(limits) = &backend.limits {
            for (name, value) in limits.iter_thresholds() {
                if value == Some(0) {
                    return Err(SwitchyardError::config_with_context(
                        format!("{} must be greater than 0 (omit it for no limit)", name),
                        format!("Backend '{}'", backend.backend_id),
                    ));
                }
            }
        }
    }

    if config.max_attempts == Some(0) {
        return Err(SwitchyardError::config(
            "max_attempts must be at least 1 (omit it to use the backend count)",
        ));
    }

    Ok(())
}
