//! Configuration for routers, the ledger and logging
//!
//! Configuration is typed and validated once, when it is loaded; routers and
//! ledgers receive already-validated values.

mod file_loader;
mod types;
mod validation;

pub use file_loader::{ConfigFormat, load_from_file, load_from_str};
pub use types::{
    BackendConfig, BackendLimits, DEFAULT_COOLDOWN, DEFAULT_MAX_HISTORY, LedgerConfig,
    LoggingConfig, RouterConfig, SwitchyardConfig,
};
pub use validation::{validate, validate_router};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{UsageSnapshot, UsageWindow};

    #[test]
    fn test_limits_boundary_is_inclusive() {
        let limits = BackendLimits {
            requests_per_minute: Some(5),
            ..Default::default()
        };
        let four = UsageSnapshot {
            requests: 4,
            tokens: 0,
        };
        let five = UsageSnapshot {
            requests: 5,
            tokens: 0,
        };
        assert!(!limits.exceeded_by(UsageWindow::Minute, &four));
        assert!(limits.exceeded_by(UsageWindow::Minute, &five));
        // No hour threshold configured: never exceeded for that window.
        assert!(!limits.exceeded_by(UsageWindow::Hour, &five));
    }

    #[test]
    fn test_token_thresholds() {
        let limits = BackendLimits {
            tokens_per_day: Some(1000),
            ..Default::default()
        };
        let usage = UsageSnapshot {
            requests: 1,
            tokens: 1000,
        };
        assert!(limits.exceeded_by(UsageWindow::Day, &usage));
        assert!(limits.has_limit_for(UsageWindow::Day));
        assert!(!limits.has_limit_for(UsageWindow::Minute));
    }

    #[test]
    fn test_empty_limits() {
        assert!(BackendLimits::default().is_empty());
        let limits = BackendLimits {
            requests_per_hour: Some(3),
            ..Default::default()
        };
        assert!(!limits.is_empty());
    }

    #[test]
    fn test_router_config_builder() {
        let config = RouterConfig::new(vec![BackendConfig::new("a"), BackendConfig::new("b")])
            .with_cooldown(std::time::Duration::from_secs(30))
            .with_max_attempts(3);
        assert_eq!(config.cooldown.as_secs(), 30);
        assert_eq!(config.max_attempts, Some(3));
        assert!(config.backend("b").is_some());
        assert!(config.backend("c").is_none());
        assert_eq!(config.max_history, DEFAULT_MAX_HISTORY);
    }
}
