//! Type definitions for the usage ledger

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// What a usage event counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UsageKind {
    Tokens,
    Requests,
}

impl fmt::Display for UsageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tokens => write!(f, "tokens"),
            Self::Requests => write!(f, "requests"),
        }
    }
}

/// A single recorded consumption. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageEvent {
    pub timestamp: DateTime<Utc>,
    pub backend_id: String,
    pub kind: UsageKind,
    pub count: u64,
}

/// Look-back window for usage queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UsageWindow {
    Minute,
    Hour,
    Day,
}

impl UsageWindow {
    /// All windows, narrowest first
    pub const ALL: [UsageWindow; 3] = [Self::Minute, Self::Hour, Self::Day];

    /// Fixed look-back duration
    pub fn duration(self) -> Duration {
        match self {
            Self::Minute => Duration::from_secs(60),
            Self::Hour => Duration::from_secs(60 * 60),
            Self::Day => Duration::from_secs(24 * 60 * 60),
        }
    }

    /// Look-back as a chrono delta
    pub fn time_delta(self) -> TimeDelta {
        match self {
            Self::Minute => TimeDelta::minutes(1),
            Self::Hour => TimeDelta::hours(1),
            Self::Day => TimeDelta::days(1),
        }
    }

    /// The widest tracked window; events older than this are pruned
    pub fn longest() -> Self {
        Self::Day
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Minute => "minute",
            Self::Hour => "hour",
            Self::Day => "day",
        }
    }
}

impl fmt::Display for UsageWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UsageWindow {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "minute" | "m" => Ok(Self::Minute),
            "hour" | "h" => Ok(Self::Hour),
            "day" | "d" => Ok(Self::Day),
            other => Err(format!("unknown usage window: {}", other)),
        }
    }
}

/// Usage summed over one window for one backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageSnapshot {
    pub requests: u64,
    pub tokens: u64,
}

impl UsageSnapshot {
    pub(crate) fn add(&mut self, kind: UsageKind, count: u64) {
        match kind {
            UsageKind::Requests => self.requests = self.requests.saturating_add(count),
            UsageKind::Tokens => self.tokens = self.tokens.saturating_add(count),
        }
    }
}

/// An active cooldown for a backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CooldownEntry {
    pub backend_id: String,
    pub until: DateTime<Utc>,
}

/// Usage across every window plus cooldown state, for one backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageReport {
    pub backend_id: String,
    pub minute: UsageSnapshot,
    pub hour: UsageSnapshot,
    pub day: UsageSnapshot,
    /// Set only while the cooldown is active
    pub cooldown_until: Option<DateTime<Utc>>,
}

impl UsageReport {
    /// Snapshot for one window
    pub fn snapshot(&self, window: UsageWindow) -> UsageSnapshot {
        match window {
            UsageWindow::Minute => self.minute,
            UsageWindow::Hour => self.hour,
            UsageWindow::Day => self.day,
        }
    }

    /// Whether the backend is cooling down at report time
    pub fn under_cooldown(&self) -> bool {
        self.cooldown_until.is_some()
    }
}
