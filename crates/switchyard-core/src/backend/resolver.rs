//! Backend configuration resolution

use crate::error::{SwitchyardError, SwitchyardResult};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Current configuration of a backend, as returned by a [`ConfigResolver`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedBackend {
    /// Stable backend identity
    pub backend_id: String,
    /// Human-readable name used in notifications
    pub name: String,
    /// Provider kind, interpreted by the backend factory
    pub provider: String,
    /// Provider-specific settings, opaque to the router
    #[serde(default)]
    pub settings: Value,
}

impl ResolvedBackend {
    pub fn new(
        backend_id: impl Into<String>,
        name: impl Into<String>,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            backend_id: backend_id.into(),
            name: name.into(),
            provider: provider.into(),
            settings: Value::Null,
        }
    }

    pub fn with_settings(mut self, settings: Value) -> Self {
        self.settings = settings;
        self
    }
}

/// Resolves a backend reference to its current configuration
///
/// Resolution may fail when the reference has been deleted; the router skips
/// such backends rather than failing.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConfigResolver: Send + Sync {
    async fn resolve(&self, backend_id: &str) -> SwitchyardResult<ResolvedBackend>;
}

/// Resolver over an in-memory table
#[derive(Debug, Default)]
pub struct StaticResolver {
    backends: RwLock<HashMap<String, ResolvedBackend>>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with_backend(self, backend: ResolvedBackend) -> Self {
        self.insert(backend);
        self
    }

    /// Add or replace a backend
    pub fn insert(&self, backend: ResolvedBackend) {
        self.backends
            .write()
            .insert(backend.backend_id.clone(), backend);
    }

    /// Forget a backend; later resolution of it fails
    pub fn remove(&self, backend_id: &str) -> Option<ResolvedBackend> {
        self.backends.write().remove(backend_id)
    }

    pub fn len(&self) -> usize {
        self.backends.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.read().is_empty()
    }
}

#[async_trait]
impl ConfigResolver for StaticResolver {
    async fn resolve(&self, backend_id: &str) -> SwitchyardResult<ResolvedBackend> {
        self.backends
            .read()
            .get(backend_id)
            .cloned()
            .ok_or_else(|| SwitchyardError::resolve(backend_id, "no configuration found"))
    }
}
