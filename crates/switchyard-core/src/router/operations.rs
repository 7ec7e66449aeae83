//! Router operations (token counting, model info, status, history)

use super::manager::FallbackRouter;
use super::types::{BackendStatus, InitError, SwitchEvent};
use crate::backend::{ContentBlock, ModelDescriptor};
use crate::error::SwitchyardResult;
use crate::ledger::{UsageLedger, UsageWindow};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

impl FallbackRouter {
    /// Count tokens with the active backend, or 0 when none is available
    pub async fn count_tokens(&self, content: &[ContentBlock]) -> SwitchyardResult<u64> {
        self.initialize().await;
        match self.select("count tokens").await? {
            Some(handler) => handler.handle.count_tokens(content).await,
            None => Ok(0),
        }
    }

    /// Model of the active backend, or a placeholder when none is active
    ///
    /// Does not re-run selection.
    pub fn model(&self) -> ModelDescriptor {
        self.active_handler()
            .map(|handler| handler.handle.model())
            .unwrap_or_else(ModelDescriptor::placeholder)
    }

    /// Id of the active backend
    pub fn active_backend(&self) -> Option<String> {
        self.active_handler().map(|h| h.backend_id.clone())
    }

    /// Observe active-backend changes
    pub fn subscribe(&self) -> watch::Receiver<Option<String>> {
        self.inner.active_tx.subscribe()
    }

    /// Active-backend changes as a stream, starting with the current value
    pub fn active_backend_stream(&self) -> WatchStream<Option<String>> {
        WatchStream::new(self.subscribe())
    }

    /// Resolved backend ids in priority order
    pub fn backend_ids(&self) -> Vec<String> {
        self.handlers()
            .iter()
            .map(|h| h.backend_id.clone())
            .collect()
    }

    /// Backends skipped during initialization
    pub fn init_errors(&self) -> Vec<InitError> {
        self.inner.init_errors.lock().clone()
    }

    /// Recent active-backend changes, oldest first
    pub async fn history(&self) -> Vec<SwitchEvent> {
        self.inner.history.read().await.iter().cloned().collect()
    }

    /// The ledger this router accounts against
    pub fn ledger(&self) -> &UsageLedger {
        &self.inner.ledger
    }

    /// Usage, cooldown and eligibility of every resolved backend
    pub async fn status(&self) -> SwitchyardResult<Vec<BackendStatus>> {
        self.initialize().await;
        let active = self.active_backend();
        let handlers = self.handlers();

        let mut statuses = Vec::with_capacity(handlers.len());
        for handler in handlers.iter() {
            let report = self.inner.ledger.report(&handler.backend_id).await?;
            let under_limit = match &handler.config.limits {
                Some(limits) => !UsageWindow::ALL
                    .into_iter()
                    .any(|window| limits.exceeded_by(window, &report.snapshot(window))),
                None => true,
            };
            statuses.push(BackendStatus {
                backend_id: handler.backend_id.clone(),
                name: handler.name.clone(),
                active: active.as_deref() == Some(handler.backend_id.as_str()),
                cooldown_until: report.cooldown_until,
                under_limit,
                minute: report.minute,
                hour: report.hour,
                day: report.day,
            });
        }
        Ok(statuses)
    }
}
