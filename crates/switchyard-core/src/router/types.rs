//! Type definitions for the fallback router

use crate::backend::BackendHandle;
use crate::config::BackendConfig;
use crate::ledger::{UsageSnapshot, UsageWindow};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// A successfully resolved backend, ready to serve requests
pub(crate) struct HandlerConfig {
    pub backend_id: String,
    /// Display name captured at resolution time
    pub name: String,
    pub handle: Arc<dyn BackendHandle>,
    pub config: BackendConfig,
}

impl fmt::Debug for HandlerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerConfig")
            .field("backend_id", &self.backend_id)
            .field("name", &self.name)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Record of an active-backend change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchEvent {
    /// Backend that was active before, if any
    pub from: Option<String>,
    /// Backend active afterwards, `None` when nothing is available
    pub to: Option<String>,
    /// What triggered the re-selection ("initial", "message call", ...)
    pub reason: String,
    pub timestamp: DateTime<Utc>,
}

/// A backend dropped during initialization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitError {
    pub backend_id: String,
    pub message: String,
}

/// Point-in-time view of one resolved backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendStatus {
    pub backend_id: String,
    pub name: String,
    pub active: bool,
    pub cooldown_until: Option<DateTime<Utc>>,
    pub under_limit: bool,
    pub minute: UsageSnapshot,
    pub hour: UsageSnapshot,
    pub day: UsageSnapshot,
}

impl BackendStatus {
    /// Whether the selection policy would accept this backend right now
    pub fn eligible(&self) -> bool {
        self.cooldown_until.is_none() && self.under_limit
    }

    pub fn snapshot(&self, window: UsageWindow) -> UsageSnapshot {
        match window {
            UsageWindow::Minute => self.minute,
            UsageWindow::Hour => self.hour,
            UsageWindow::Day => self.day,
        }
    }
}
