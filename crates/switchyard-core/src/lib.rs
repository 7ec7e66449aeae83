//! Switchyard Core Library
//!
//! This crate provides a quota-aware router that fronts several
//! interchangeable completion backends, together with the durable usage
//! ledger it accounts against.

pub mod backend;
pub mod clock;
pub mod config;
pub mod error;
pub mod ledger;
pub mod notify;
pub mod router;
pub mod storage;

// Re-export commonly used types
pub use backend::{
    BackendFactory, BackendHandle, Chunk, ChunkStream, ConfigResolver, ContentBlock, Message,
    ModelDescriptor, ModelInfo, Prefetchable, RequestMetadata, ResolvedBackend, StaticResolver,
    UsageChunk,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{BackendConfig, BackendLimits, RouterConfig, SwitchyardConfig};
pub use error::{FailureClass, SwitchyardError, SwitchyardResult, classify_failure};
pub use ledger::{UsageKind, UsageLedger, UsageReport, UsageSnapshot, UsageWindow};
pub use notify::{ChannelNotifier, NoopNotifier, Notifier, TracingNotifier};
pub use router::{BackendStatus, FallbackRouter, FallbackRouterBuilder, SwitchEvent};
pub use storage::{JsonFileStore, KvStore, MemoryStore};
