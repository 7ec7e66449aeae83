//! Streaming delegation with transparent failover
//!
//! A request runs as a sequence of attempts. Each attempt records one
//! request against the selected backend, then forwards that backend's chunks
//! while recording reported token usage. When an attempt fails the backend is
//! put in cooldown. A rate-limit or overload failure restarts the request on
//! the next eligible backend, and the caller keeps reading the same stream.

use super::manager::FallbackRouter;
use super::types::HandlerConfig;
use crate::backend::{Chunk, ChunkStream, Message, RequestMetadata};
use crate::error::{SwitchyardError, SwitchyardResult, classify_failure};
use crate::ledger::UsageKind;
use futures::StreamExt;
use futures::stream;
use std::sync::Arc;
use tracing::{debug, warn};

enum Phase {
    /// Select a backend and open its stream
    Start { reason: &'static str },
    /// Pass chunks through from an open backend stream
    Forwarding {
        handler: Arc<HandlerConfig>,
        inner: ChunkStream,
    },
    Done,
}

struct RequestState {
    router: FallbackRouter,
    system_prompt: String,
    messages: Vec<Message>,
    metadata: Option<RequestMetadata>,
    attempts: usize,
    phase: Phase,
}

impl FallbackRouter {
    /// Stream a completion from the active backend, failing over as needed
    ///
    /// Nothing happens until the stream is first polled. If no backend is
    /// available the first item is the `Unavailable` error. Dropping the
    /// stream drops the in-flight backend stream with it.
    pub fn create_message(
        &self,
        system_prompt: impl Into<String>,
        messages: Vec<Message>,
        metadata: Option<RequestMetadata>,
    ) -> ChunkStream {
        let state = RequestState {
            router: self.clone(),
            system_prompt: system_prompt.into(),
            messages,
            metadata,
            attempts: 0,
            phase: Phase::Start {
                reason: "message call",
            },
        };

        Box::pin(stream::unfold(state, |mut state| async move {
            let item = state.advance().await?;
            Some((item, state))
        }))
    }
}

impl RequestState {
    /// Drive the request until it has an item to yield, or is finished
    async fn advance(&mut self) -> Option<SwitchyardResult<Chunk>> {
        loop {
            match std::mem::replace(&mut self.phase, Phase::Done) {
                Phase::Done => return None,
                Phase::Start { reason } => match self.start_attempt(reason).await {
                    Ok(Some((handler, inner))) => {
                        self.phase = Phase::Forwarding { handler, inner };
                    }
                    Ok(None) => return Some(Err(SwitchyardError::unavailable())),
                    Err(AttemptError::Fatal(e)) => return Some(Err(e)),
                    Err(AttemptError::Failed(handler, e)) => {
                        if let Err(e) = self.handle_failure(&handler, e).await {
                            return Some(Err(e));
                        }
                    }
                },
                Phase::Forwarding { handler, mut inner } => match inner.next().await {
                    Some(Ok(chunk)) => {
                        if let Chunk::Usage(usage) = &chunk {
                            let total = usage.billable_tokens();
                            if total > 0 {
                                if let Err(e) = self
                                    .router
                                    .inner
                                    .ledger
                                    .consume(&handler.backend_id, UsageKind::Tokens, total)
                                    .await
                                {
                                    return Some(Err(e));
                                }
                            }
                        }
                        self.phase = Phase::Forwarding { handler, inner };
                        return Some(Ok(chunk));
                    }
                    Some(Err(e)) => {
                        drop(inner);
                        if let Err(e) = self.handle_failure(&handler, e).await {
                            return Some(Err(e));
                        }
                    }
                    None => {
                        debug!(backend_id = %handler.backend_id, attempts = self.attempts, "Stream complete");
                        return None;
                    }
                },
            }
        }
    }

    async fn start_attempt(
        &mut self,
        reason: &'static str,
    ) -> Result<Option<(Arc<HandlerConfig>, ChunkStream)>, AttemptError> {
        self.router.initialize().await;

        let Some(handler) = self.router.select(reason).await.map_err(AttemptError::Fatal)? else {
            return Ok(None);
        };

        self.attempts += 1;
        self.router
            .inner
            .ledger
            .consume(&handler.backend_id, UsageKind::Requests, 1)
            .await
            .map_err(AttemptError::Fatal)?;

        debug!(
            backend_id = %handler.backend_id,
            attempt = self.attempts,
            "Starting backend stream"
        );
        match handler
            .handle
            .stream_complete(&self.system_prompt, &self.messages, self.metadata.as_ref())
            .await
        {
            Ok(inner) => Ok(Some((handler, inner))),
            Err(e) => Err(AttemptError::Failed(handler, e)),
        }
    }

    /// Penalize the failed backend and decide whether to try another
    ///
    /// `Ok` means the next attempt has been scheduled; `Err` carries the
    /// error that ends the stream. The provider's error is kept unless every
    /// retry was used up.
    async fn handle_failure(
        &mut self,
        handler: &HandlerConfig,
        error: SwitchyardError,
    ) -> SwitchyardResult<()> {
        let class = classify_failure(&error);
        let error = error.with_backend_id(&handler.backend_id);
        let cooldown = self.router.inner.config.cooldown;

        warn!(
            backend_id = %handler.backend_id,
            attempt = self.attempts,
            %class,
            error = %error,
            cooldown_secs = cooldown.as_secs(),
            "Backend attempt failed"
        );
        if let Err(storage) = self
            .router
            .inner
            .ledger
            .set_cooldown(&handler.backend_id, cooldown)
            .await
        {
            // Without a recorded cooldown the same backend could be picked
            // again, so the request ends here with the provider's error.
            warn!(
                backend_id = %handler.backend_id,
                error = %storage,
                "Failed to record cooldown"
            );
            return Err(error);
        }

        if !class.is_retryable() {
            return Err(error);
        }

        let max_attempts = self.router.max_attempts();
        if self.attempts >= max_attempts {
            warn!(attempts = self.attempts, max_attempts, "Retry bound reached");
            return Err(SwitchyardError::unavailable());
        }

        self.phase = Phase::Start { reason: "failover" };
        Ok(())
    }
}

enum AttemptError {
    /// Failure before any backend was contacted; ends the request as is
    Fatal(SwitchyardError),
    /// The backend refused to open a stream
    Failed(Arc<HandlerConfig>, SwitchyardError),
}
