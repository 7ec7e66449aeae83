//! Configuration types

use crate::ledger::{UsageSnapshot, UsageWindow};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default cooldown applied to a backend after a failed attempt
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(10 * 60);

/// Default number of switch events kept in router history
pub const DEFAULT_MAX_HISTORY: usize = 100;

/// Per-backend quota thresholds
///
/// Every field is optional; an unset field never excludes the backend. A
/// threshold is the first value at which the backend is excluded, so a
/// backend may consume `limit - 1` units within a window and stay eligible.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendLimits {
    pub requests_per_minute: Option<u64>,
    pub requests_per_hour: Option<u64>,
    pub requests_per_day: Option<u64>,
    pub tokens_per_minute: Option<u64>,
    pub tokens_per_hour: Option<u64>,
    pub tokens_per_day: Option<u64>,
}

impl BackendLimits {
    /// Whether no threshold is configured at all
    pub fn is_empty(&self) -> bool {
        self.iter_thresholds().all(|(_, value)| value.is_none())
    }

    /// Request threshold for a window
    pub fn request_limit(&self, window: UsageWindow) -> Option<u64> {
        match window {
            UsageWindow::Minute => self.requests_per_minute,
            UsageWindow::Hour => self.requests_per_hour,
            UsageWindow::Day => self.requests_per_day,
        }
    }

    /// Token threshold for a window
    pub fn token_limit(&self, window: UsageWindow) -> Option<u64> {
        match window {
            UsageWindow::Minute => self.tokens_per_minute,
            UsageWindow::Hour => self.tokens_per_hour,
            UsageWindow::Day => self.tokens_per_day,
        }
    }

    /// Whether any threshold is configured for a window
    pub fn has_limit_for(&self, window: UsageWindow) -> bool {
        self.request_limit(window).is_some() || self.token_limit(window).is_some()
    }

    /// Whether `usage` (measured over `window`) reaches a configured threshold
    pub fn exceeded_by(&self, window: UsageWindow, usage: &UsageSnapshot) -> bool {
        let requests_hit = self
            .request_limit(window)
            .is_some_and(|limit| usage.requests >= limit);
        let tokens_hit = self
            .token_limit(window)
            .is_some_and(|limit| usage.tokens >= limit);
        requests_hit || tokens_hit
    }

    /// Named thresholds, used by validation and display code
    pub fn iter_thresholds(&self) -> impl Iterator<Item = (&'static str, Option<u64>)> {
        [
            ("requests_per_minute", self.requests_per_minute),
            ("requests_per_hour", self.requests_per_hour),
            ("requests_per_day", self.requests_per_day),
            ("tokens_per_minute", self.tokens_per_minute),
            ("tokens_per_hour", self.tokens_per_hour),
            ("tokens_per_day", self.tokens_per_day),
        ]
        .into_iter()
    }
}

/// One entry of a router's priority-ordered backend list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Stable backend identity, also the ledger key
    pub backend_id: String,
    /// Optional quota thresholds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limits: Option<BackendLimits>,
}

impl BackendConfig {
    /// Create an unlimited backend entry
    pub fn new(backend_id: impl Into<String>) -> Self {
        Self {
            backend_id: backend_id.into(),
            limits: None,
        }
    }

    /// Set quota thresholds
    pub fn with_limits(mut self, limits: BackendLimits) -> Self {
        self.limits = Some(limits);
        self
    }
}

/// Router configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Backends in fallback priority order (first = most preferred)
    pub backends: Vec<BackendConfig>,
    /// Cooldown applied to a backend after any failed attempt
    #[serde(with = "humantime_serde")]
    pub cooldown: Duration,
    /// Maximum backend attempts per request (defaults to the backend count)
    pub max_attempts: Option<usize>,
    /// Number of switch events retained in history
    pub max_history: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            backends: Vec::new(),
            cooldown: DEFAULT_COOLDOWN,
            max_attempts: None,
            max_history: DEFAULT_MAX_HISTORY,
        }
    }
}

impl RouterConfig {
    /// Create a config for the given backends with default policy settings
    pub fn new(backends: Vec<BackendConfig>) -> Self {
        Self {
            backends,
            ..Self::default()
        }
    }

    /// Set the failure cooldown
    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// Set the per-request attempt bound
    pub fn with_max_attempts(mut self, max: usize) -> Self {
        self.max_attempts = Some(max);
        self
    }

    /// Look up a backend entry by id
    pub fn backend(&self, backend_id: &str) -> Option<&BackendConfig> {
        self.backends.iter().find(|b| b.backend_id == backend_id)
    }
}

/// Storage keys used by the usage ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Key holding the usage event log
    pub events_key: String,
    /// Key holding the cooldown map
    pub cooldowns_key: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            events_key: "usage_events".to_string(),
            cooldowns_key: "backend_cooldowns".to_string(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (pretty, compact, json)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// Top-level configuration file contents
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwitchyardConfig {
    /// Directory for the durable ledger (defaults to `~/.switchyard`)
    pub data_dir: Option<PathBuf>,
    pub router: RouterConfig,
    pub ledger: LedgerConfig,
    pub logging: LoggingConfig,
}
