//! Builder for creating fallback routers

use super::manager::FallbackRouter;
use crate::backend::{BackendFactory, ConfigResolver};
use crate::config::{BackendConfig, RouterConfig, validate_router};
use crate::error::{SwitchyardError, SwitchyardResult};
use crate::ledger::UsageLedger;
use crate::notify::{Notifier, TracingNotifier};
use std::sync::Arc;
use std::time::Duration;

/// Builder for creating fallback routers
pub struct FallbackRouterBuilder {
    config: RouterConfig,
    ledger: Option<UsageLedger>,
    resolver: Option<Arc<dyn ConfigResolver>>,
    factory: Option<Arc<dyn BackendFactory>>,
    notifier: Arc<dyn Notifier>,
}

impl FallbackRouterBuilder {
    /// Start from an existing router configuration
    pub fn new(config: RouterConfig) -> Self {
        Self {
            config,
            ledger: None,
            resolver: None,
            factory: None,
            notifier: Arc::new(TracingNotifier),
        }
    }

    /// Append a backend at the lowest priority
    pub fn backend(mut self, backend: BackendConfig) -> Self {
        self.config.backends.push(backend);
        self
    }

    pub fn cooldown(mut self, cooldown: Duration) -> Self {
        self.config.cooldown = cooldown;
        self
    }

    pub fn max_attempts(mut self, max: usize) -> Self {
        self.config.max_attempts = Some(max);
        self
    }

    pub fn max_history(mut self, max: usize) -> Self {
        self.config.max_history = max;
        self
    }

    pub fn ledger(mut self, ledger: UsageLedger) -> Self {
        self.ledger = Some(ledger);
        self
    }

    pub fn resolver(mut self, resolver: Arc<dyn ConfigResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn factory(mut self, factory: Arc<dyn BackendFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Where switch notifications go (defaults to `tracing`)
    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Validate the configuration and build the router
    ///
    /// The router starts uninitialized; backends are resolved on first use.
    pub fn build(self) -> SwitchyardResult<FallbackRouter> {
        validate_router(&self.config)?;

        let ledger = self
            .ledger
            .ok_or_else(|| SwitchyardError::config("Fallback router requires a usage ledger"))?;
        let resolver = self
            .resolver
            .ok_or_else(|| SwitchyardError::config("Fallback router requires a config resolver"))?;
        let factory = self
            .factory
            .ok_or_else(|| SwitchyardError::config("Fallback router requires a backend factory"))?;

        Ok(FallbackRouter::from_parts(
            self.config,
            ledger,
            resolver,
            factory,
            self.notifier,
        ))
    }
}

impl Default for FallbackRouterBuilder {
    fn default() -> Self {
        Self::new(RouterConfig::default())
    }
}

impl FallbackRouter {
    /// Start building a router
    pub fn builder() -> FallbackRouterBuilder {
        FallbackRouterBuilder::default()
    }
}
