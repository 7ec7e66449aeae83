//! Backend collaborators
//!
//! A backend is one external completion provider/credential pair. The router
//! never talks to a provider directly: it resolves each backend's current
//! configuration through a [`ConfigResolver`], asks a [`BackendFactory`] for a
//! [`BackendHandle`], and streams through that handle.

mod resolver;
mod types;

pub use resolver::{ConfigResolver, ResolvedBackend, StaticResolver};
pub use types::{
    Chunk, ChunkStream, ContentBlock, Message, ModelDescriptor, ModelInfo, RequestMetadata, Role,
    UsageChunk,
};

#[cfg(test)]
pub use resolver::MockConfigResolver;

use crate::error::SwitchyardResult;
use async_trait::async_trait;
use std::sync::Arc;

/// In-process handle capable of completing requests against one backend
#[async_trait]
pub trait BackendHandle: Send + Sync {
    /// One-time setup after construction
    async fn initialize(&self) -> SwitchyardResult<()> {
        Ok(())
    }

    /// Start a streaming completion
    ///
    /// Errors may be returned either here or from the stream itself; the
    /// router treats both the same way.
    async fn stream_complete(
        &self,
        system_prompt: &str,
        messages: &[Message],
        metadata: Option<&RequestMetadata>,
    ) -> SwitchyardResult<ChunkStream>;

    /// Count the tokens `content` would consume
    async fn count_tokens(&self, content: &[ContentBlock]) -> SwitchyardResult<u64>;

    /// Model currently served by this handle
    fn model(&self) -> ModelDescriptor;

    /// Live model-metadata capability, if the handle supports it
    fn as_prefetchable(&self) -> Option<&dyn Prefetchable> {
        None
    }
}

/// Optional capability: fetch live model metadata from the provider
#[async_trait]
pub trait Prefetchable: Send + Sync {
    async fn prefetch_model(&self) -> SwitchyardResult<()>;
}

/// Builds handles from resolved configurations
pub trait BackendFactory: Send + Sync {
    fn construct(&self, backend: &ResolvedBackend) -> SwitchyardResult<Arc<dyn BackendHandle>>;
}

impl<F> BackendFactory for F
where
    F: Fn(&ResolvedBackend) -> SwitchyardResult<Arc<dyn BackendHandle>> + Send + Sync,
{
    fn construct(&self, backend: &ResolvedBackend) -> SwitchyardResult<Arc<dyn BackendHandle>> {
        self(backend)
    }
}
