//! Fallback router: initialization and the selection policy

use super::types::{HandlerConfig, InitError, SwitchEvent};
use crate::backend::{BackendFactory, ConfigResolver};
use crate::config::{BackendConfig, RouterConfig};
use crate::error::{ALL_UNAVAILABLE_MESSAGE, SwitchyardResult};
use crate::ledger::{UsageLedger, UsageWindow};
use crate::notify::Notifier;
use parking_lot::{Mutex, RwLock};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, OnceCell, RwLock as AsyncRwLock, watch};
use tracing::{debug, info, warn};

/// Quota-aware router over an ordered list of interchangeable backends
///
/// Cloning is cheap and clones share all state.
#[derive(Debug, Clone)]
pub struct FallbackRouter {
    pub(super) inner: Arc<RouterInner>,
}

pub(super) struct RouterInner {
    pub config: RouterConfig,
    pub ledger: UsageLedger,
    pub resolver: Arc<dyn ConfigResolver>,
    pub factory: Arc<dyn BackendFactory>,
    pub notifier: Arc<dyn Notifier>,
    /// Single in-flight initialization
    pub init: OnceCell<()>,
    /// Resolved backends in priority order; fixed once initialized
    pub handlers: RwLock<Arc<Vec<Arc<HandlerConfig>>>>,
    pub active: RwLock<Option<Arc<HandlerConfig>>>,
    /// Serializes `adjust_active_handler`
    pub selection: AsyncMutex<()>,
    pub active_tx: watch::Sender<Option<String>>,
    pub history: AsyncRwLock<VecDeque<SwitchEvent>>,
    pub init_errors: Mutex<Vec<InitError>>,
}

impl std::fmt::Debug for RouterInner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouterInner")
            .field("config", &self.config)
            .field("ledger", &self.ledger)
            .field("handlers", &self.handlers.read().len())
            .field(
                "active",
                &self.active.read().as_ref().map(|h| h.backend_id.clone()),
            )
            .finish_non_exhaustive()
    }
}

impl FallbackRouter {
    pub(super) fn from_parts(
        config: RouterConfig,
        ledger: UsageLedger,
        resolver: Arc<dyn ConfigResolver>,
        factory: Arc<dyn BackendFactory>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let (active_tx, _) = watch::channel(None);
        Self {
            inner: Arc::new(RouterInner {
                config,
                ledger,
                resolver,
                factory,
                notifier,
                init: OnceCell::new(),
                handlers: RwLock::new(Arc::new(Vec::new())),
                active: RwLock::new(None),
                selection: AsyncMutex::new(()),
                active_tx,
                history: AsyncRwLock::new(VecDeque::new()),
                init_errors: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Resolve and construct every configured backend, then pick a starting one
    ///
    /// Idempotent. Concurrent callers share one resolution pass. Backends that
    /// fail to resolve or construct are skipped and reported by
    /// [`init_errors`](Self::init_errors); the router stays usable even when
    /// none survive.
    pub async fn initialize(&self) {
        self.inner
            .init
            .get_or_init(|| async {
                self.load_handlers().await;
                if let Err(e) = self.adjust_active_handler("initial").await {
                    warn!(error = %e, "Initial backend selection failed");
                }
            })
            .await;
    }

    /// Whether initialization has completed
    pub fn is_initialized(&self) -> bool {
        self.inner.init.initialized()
    }

    async fn load_handlers(&self) {
        let mut handlers = Vec::with_capacity(self.inner.config.backends.len());

        for backend in &self.inner.config.backends {
            match self.build_handler(backend).await {
                Ok(handler) => handlers.push(Arc::new(handler)),
                Err(e) => {
                    warn!(backend_id = %backend.backend_id, error = %e, "Skipping backend");
                    self.inner.init_errors.lock().push(InitError {
                        backend_id: backend.backend_id.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }

        info!(
            resolved = handlers.len(),
            configured = self.inner.config.backends.len(),
            "Fallback router initialized"
        );
        *self.inner.handlers.write() = Arc::new(handlers);
    }

    async fn build_handler(&self, backend: &BackendConfig) -> SwitchyardResult<HandlerConfig> {
        let resolved = self.inner.resolver.resolve(&backend.backend_id).await?;
        let handle = self.inner.factory.construct(&resolved)?;
        handle.initialize().await?;

        if let Some(prefetch) = handle.as_prefetchable() {
            if let Err(e) = prefetch.prefetch_model().await {
                warn!(
                    backend_id = %backend.backend_id,
                    error = %e,
                    "Model metadata prefetch failed; keeping backend"
                );
            }
        }

        Ok(HandlerConfig {
            backend_id: backend.backend_id.clone(),
            name: resolved.name,
            handle,
            config: backend.clone(),
        })
    }

    /// Re-evaluate which backend should serve new requests
    ///
    /// Keeps the current backend while it is out of cooldown and under every
    /// limit. Otherwise picks the first eligible backend in priority order.
    /// Returns the id of the active backend afterwards. Ledger failures
    /// propagate and leave the previous selection in place.
    pub async fn adjust_active_handler(&self, reason: &str) -> SwitchyardResult<Option<String>> {
        Ok(self
            .select(reason)
            .await?
            .map(|handler| handler.backend_id.clone()))
    }

    pub(super) async fn select(
        &self,
        reason: &str,
    ) -> SwitchyardResult<Option<Arc<HandlerConfig>>> {
        let _guard = self.inner.selection.lock().await;

        let handlers = self.handlers();
        let previous = self.inner.active.read().clone();

        if handlers.is_empty() {
            self.set_active(None);
            return Ok(None);
        }

        if let Some(current) = &previous {
            let still_listed = handlers
                .iter()
                .any(|h| h.backend_id == current.backend_id);
            if still_listed && self.is_eligible(current).await? {
                debug!(backend_id = %current.backend_id, reason, "Keeping active backend");
                return Ok(previous);
            }
        }

        for handler in handlers.iter() {
            if !self.is_eligible(handler).await? {
                continue;
            }

            let changed = previous
                .as_ref()
                .is_none_or(|p| p.backend_id != handler.backend_id);
            self.set_active(Some(handler.clone()));

            if changed {
                let name = self.display_name(&handler.backend_id).await;
                info!(
                    from = ?previous.as_ref().map(|p| &p.backend_id),
                    to = %handler.backend_id,
                    reason,
                    "Switched active backend"
                );
                self.inner
                    .notifier
                    .notify(&format!("Switched to backend: {}", name));
                self.record_switch(previous.as_ref(), Some(handler), reason)
                    .await;
            }
            return Ok(Some(handler.clone()));
        }

        self.set_active(None);
        if let Some(prev) = &previous {
            warn!(previous = %prev.backend_id, reason, "No backend available");
            self.inner.notifier.notify(ALL_UNAVAILABLE_MESSAGE);
            self.record_switch(Some(prev), None, reason).await;
        }
        Ok(None)
    }

    /// Whether `backend` is below every configured threshold
    pub async fn under_limit(&self, backend: &BackendConfig) -> SwitchyardResult<bool> {
        let Some(limits) = &backend.limits else {
            return Ok(true);
        };

        for window in UsageWindow::ALL {
            if !limits.has_limit_for(window) {
                continue;
            }
            let usage = self
                .inner
                .ledger
                .get_usage(&backend.backend_id, window)
                .await?;
            if limits.exceeded_by(window, &usage) {
                debug!(
                    backend_id = %backend.backend_id,
                    %window,
                    requests = usage.requests,
                    tokens = usage.tokens,
                    "Backend over limit"
                );
                return Ok(false);
            }
        }

        Ok(true)
    }

    async fn is_eligible(&self, handler: &HandlerConfig) -> SwitchyardResult<bool> {
        if self
            .inner
            .ledger
            .is_under_cooldown(&handler.backend_id)
            .await?
        {
            debug!(backend_id = %handler.backend_id, "Backend under cooldown");
            return Ok(false);
        }
        self.under_limit(&handler.config).await
    }

    fn set_active(&self, handler: Option<Arc<HandlerConfig>>) {
        let id = handler.as_ref().map(|h| h.backend_id.clone());
        *self.inner.active.write() = handler;
        self.inner.active_tx.send_if_modified(|current| {
            if *current == id {
                false
            } else {
                *current = id;
                true
            }
        });
    }

    /// Human-readable name, re-resolved so renames show up; falls back to the id
    async fn display_name(&self, backend_id: &str) -> String {
        match self.inner.resolver.resolve(backend_id).await {
            Ok(resolved) => resolved.name,
            Err(e) => {
                debug!(backend_id, error = %e, "Could not resolve display name");
                backend_id.to_string()
            }
        }
    }

    async fn record_switch(
        &self,
        from: Option<&Arc<HandlerConfig>>,
        to: Option<&Arc<HandlerConfig>>,
        reason: &str,
    ) {
        let event = SwitchEvent {
            from: from.map(|h| h.backend_id.clone()),
            to: to.map(|h| h.backend_id.clone()),
            reason: reason.to_string(),
            timestamp: self.inner.ledger.now(),
        };

        let mut history = self.inner.history.write().await;
        history.push_back(event);
        while history.len() > self.inner.config.max_history {
            history.pop_front();
        }
    }

    pub(super) fn handlers(&self) -> Arc<Vec<Arc<HandlerConfig>>> {
        self.inner.handlers.read().clone()
    }

    pub(super) fn active_handler(&self) -> Option<Arc<HandlerConfig>> {
        self.inner.active.read().clone()
    }

    /// Attempt bound for one request
    pub(super) fn max_attempts(&self) -> usize {
        self.inner
            .config
            .max_attempts
            .unwrap_or_else(|| self.handlers().len())
            .max(1)
    }
}
