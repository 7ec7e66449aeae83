//! Router tests and the scripted fakes they share

mod init;

use super::{FallbackRouter, FallbackRouterBuilder};
use crate::backend::{
    BackendFactory, BackendHandle, Chunk, ChunkStream, ContentBlock, Message, ModelDescriptor,
    ModelInfo, Prefetchable, RequestMetadata, ResolvedBackend, StaticResolver,
};
use crate::clock::ManualClock;
use crate::config::{BackendConfig, RouterConfig};
use crate::error::{SwitchyardError, SwitchyardResult};
use crate::ledger::UsageLedger;
use crate::notify::ChannelNotifier;
use crate::storage::{KvStore, MemoryStore, UpdateFn};
use async_trait::async_trait;
use futures::{StreamExt, stream};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::mpsc::UnboundedReceiver;

/// One scripted step of a backend stream
#[derive(Debug, Clone)]
pub(super) enum Step {
    Emit(Chunk),
    Fail(SwitchyardError),
    /// Never yields again
    Hang,
}

/// Backend handle that replays scripted responses
pub(super) struct ScriptedBackend {
    id: String,
    scripts: Mutex<VecDeque<Vec<Step>>>,
    open_errors: Mutex<VecDeque<SwitchyardError>>,
    init_error: Mutex<Option<SwitchyardError>>,
    /// `None` means the handle is not prefetch-capable
    prefetch: Mutex<Option<SwitchyardResult<()>>>,
    calls: AtomicUsize,
    prefetch_calls: AtomicUsize,
    stream_dropped: Arc<AtomicBool>,
    token_count: u64,
}

impl ScriptedBackend {
    pub fn new(id: &str, token_count: u64) -> Self {
        Self {
            id: id.to_string(),
            scripts: Mutex::new(VecDeque::new()),
            open_errors: Mutex::new(VecDeque::new()),
            init_error: Mutex::new(None),
            prefetch: Mutex::new(None),
            calls: AtomicUsize::new(0),
            prefetch_calls: AtomicUsize::new(0),
            stream_dropped: Arc::new(AtomicBool::new(false)),
            token_count,
        }
    }

    /// Queue the steps of the next stream; unscripted calls succeed
    pub fn push_script(&self, steps: Vec<Step>) {
        self.scripts.lock().push_back(steps);
    }

    /// Make the next `stream_complete` call fail before streaming
    pub fn push_open_error(&self, error: SwitchyardError) {
        self.open_errors.lock().push_back(error);
    }

    pub fn fail_initialize(&self, error: SwitchyardError) {
        *self.init_error.lock() = Some(error);
    }

    pub fn enable_prefetch(&self, result: SwitchyardResult<()>) {
        *self.prefetch.lock() = Some(result);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prefetch_calls(&self) -> usize {
        self.prefetch_calls.load(Ordering::SeqCst)
    }

    pub fn stream_dropped(&self) -> bool {
        self.stream_dropped.load(Ordering::SeqCst)
    }

    pub fn default_text(id: &str) -> String {
        format!("hello from {}", id)
    }
}

struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl BackendHandle for ScriptedBackend {
    async fn initialize(&self) -> SwitchyardResult<()> {
        match self.init_error.lock().clone() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn stream_complete(
        &self,
        _system_prompt: &str,
        _messages: &[Message],
        _metadata: Option<&RequestMetadata>,
    ) -> SwitchyardResult<ChunkStream> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(e) = self.open_errors.lock().pop_front() {
            return Err(e);
        }

        let steps = self.scripts.lock().pop_front().unwrap_or_else(|| {
            vec![
                Step::Emit(Chunk::text(Self::default_text(&self.id))),
                Step::Emit(Chunk::usage(10, 5)),
            ]
        });
        let flag = DropFlag(self.stream_dropped.clone());

        let s = stream::unfold((steps.into_iter(), flag), |(mut steps, flag)| async move {
            match steps.next()? {
                Step::Emit(chunk) => Some((Ok(chunk), (steps, flag))),
                Step::Fail(e) => Some((Err(e), (steps, flag))),
                Step::Hang => {
                    futures::future::pending::<()>().await;
                    None
                }
            }
        });
        Ok(Box::pin(s))
    }

    async fn count_tokens(&self, _content: &[ContentBlock]) -> SwitchyardResult<u64> {
        Ok(self.token_count)
    }

    fn model(&self) -> ModelDescriptor {
        ModelDescriptor {
            id: format!("{}-model", self.id),
            info: ModelInfo {
                max_tokens: 8192,
                context_window: 200_000,
                prompt_cache_supported: true,
                supports_images: false,
                input_price: None,
                output_price: None,
            },
        }
    }

    fn as_prefetchable(&self) -> Option<&dyn Prefetchable> {
        if self.prefetch.lock().is_some() {
            Some(self as &dyn Prefetchable)
        } else {
            None
        }
    }
}

#[async_trait]
impl Prefetchable for ScriptedBackend {
    async fn prefetch_model(&self) -> SwitchyardResult<()> {
        self.prefetch_calls.fetch_add(1, Ordering::SeqCst);
        self.prefetch.lock().clone().unwrap_or(Ok(()))
    }
}

/// Factory handing out pre-built scripted backends
pub(super) struct FakeFactory {
    backends: HashMap<String, Arc<ScriptedBackend>>,
    refuse: Mutex<HashSet<String>>,
    constructed: AtomicUsize,
}

impl FakeFactory {
    pub fn refuse(&self, backend_id: &str) {
        self.refuse.lock().insert(backend_id.to_string());
    }

    pub fn constructed(&self) -> usize {
        self.constructed.load(Ordering::SeqCst)
    }
}

impl BackendFactory for FakeFactory {
    fn construct(&self, backend: &ResolvedBackend) -> SwitchyardResult<Arc<dyn BackendHandle>> {
        self.constructed.fetch_add(1, Ordering::SeqCst);
        if self.refuse.lock().contains(&backend.backend_id) {
            return Err(SwitchyardError::config("unsupported provider"));
        }
        self.backends
            .get(&backend.backend_id)
            .cloned()
            .map(|b| b as Arc<dyn BackendHandle>)
            .ok_or_else(|| SwitchyardError::config("unknown backend"))
    }
}

/// Store whose every operation fails
#[derive(Debug, Default)]
pub(super) struct FailingStore;

#[async_trait]
impl KvStore for FailingStore {
    async fn read(&self, key: &str) -> SwitchyardResult<Option<Value>> {
        Err(SwitchyardError::storage_with_key("disk unavailable", key))
    }

    async fn write(&self, key: &str, _value: Value) -> SwitchyardResult<()> {
        Err(SwitchyardError::storage_with_key("disk unavailable", key))
    }

    async fn remove(&self, key: &str) -> SwitchyardResult<bool> {
        Err(SwitchyardError::storage_with_key("disk unavailable", key))
    }

    async fn update(&self, key: &str, _apply: &mut UpdateFn<'_>) -> SwitchyardResult<Value> {
        Err(SwitchyardError::storage_with_key("disk unavailable", key))
    }
}

/// Memory store that refuses writes to one key
#[derive(Debug)]
pub(super) struct ReadOnlyKeyStore {
    inner: MemoryStore,
    key: String,
}

impl ReadOnlyKeyStore {
    pub fn new(key: &str) -> Self {
        Self {
            inner: MemoryStore::new(),
            key: key.to_string(),
        }
    }

    fn check(&self, key: &str) -> SwitchyardResult<()> {
        if key == self.key {
            return Err(SwitchyardError::storage_with_key("read-only key", key));
        }
        Ok(())
    }
}

#[async_trait]
impl KvStore for ReadOnlyKeyStore {
    async fn read(&self, key: &str) -> SwitchyardResult<Option<Value>> {
        self.inner.read(key).await
    }

    async fn write(&self, key: &str, value: Value) -> SwitchyardResult<()> {
        self.check(key)?;
        self.inner.write(key, value).await
    }

    async fn remove(&self, key: &str) -> SwitchyardResult<bool> {
        self.check(key)?;
        self.inner.remove(key).await
    }

    async fn update(&self, key: &str, apply: &mut UpdateFn<'_>) -> SwitchyardResult<Value> {
        self.check(key)?;
        self.inner.update(key, apply).await
    }
}

/// Display name the static resolver reports for a backend
pub(super) fn display_name(backend_id: &str) -> String {
    format!("{} (fake)", backend_id)
}

/// A router wired to scripted backends, a manual clock and a channel notifier
pub(super) struct Harness {
    pub router: FallbackRouter,
    pub ledger: UsageLedger,
    pub clock: Arc<ManualClock>,
    pub resolver: Arc<StaticResolver>,
    pub factory: Arc<FakeFactory>,
    pub notifications: UnboundedReceiver<String>,
}

impl Harness {
    pub fn new(backends: Vec<BackendConfig>) -> Self {
        Self::with_config(RouterConfig::new(backends))
    }

    pub fn with_config(config: RouterConfig) -> Self {
        Self::with_store(config, Arc::new(MemoryStore::new()))
    }

    pub fn with_store(config: RouterConfig, store: Arc<dyn KvStore>) -> Self {
        let clock = Arc::new(ManualClock::starting_now());
        let ledger = UsageLedger::new(store).with_clock(clock.clone());

        let resolver = Arc::new(StaticResolver::new());
        let mut backends = HashMap::new();
        for backend in &config.backends {
            resolver.insert(ResolvedBackend::new(
                &backend.backend_id,
                display_name(&backend.backend_id),
                "fake",
            ));
            backends.insert(
                backend.backend_id.clone(),
                Arc::new(ScriptedBackend::new(&backend.backend_id, 42)),
            );
        }
        let factory = Arc::new(FakeFactory {
            backends,
            refuse: Mutex::new(HashSet::new()),
            constructed: AtomicUsize::new(0),
        });

        let (notifier, notifications) = ChannelNotifier::new();
        let router = FallbackRouterBuilder::new(config)
            .ledger(ledger.clone())
            .resolver(resolver.clone())
            .factory(factory.clone())
            .notifier(Arc::new(notifier))
            .build()
            .unwrap();

        Self {
            router,
            ledger,
            clock,
            resolver,
            factory,
            notifications,
        }
    }

    pub fn backend(&self, backend_id: &str) -> Arc<ScriptedBackend> {
        self.factory.backends[backend_id].clone()
    }

    /// Notifications received so far
    pub fn drain_notifications(&mut self) -> Vec<String> {
        let mut out = Vec::new();
        while let Ok(message) = self.notifications.try_recv() {
            out.push(message);
        }
        out
    }

    pub fn request(&self) -> ChunkStream {
        self.router
            .create_message("You are terse.", vec![Message::user("hi")], None)
    }
}

/// Read a stream to its end, stopping at the first error
pub(super) async fn collect(mut stream: ChunkStream) -> (Vec<Chunk>, Option<SwitchyardError>) {
    let mut chunks = Vec::new();
    while let Some(item) = stream.next().await {
        match item {
            Ok(chunk) => chunks.push(chunk),
            Err(e) => {
                assert!(stream.next().await.is_none(), "stream continued after error");
                return (chunks, Some(e));
            }
        }
    }
    (chunks, None)
}

pub(super) fn texts(chunks: &[Chunk]) -> Vec<&str> {
    chunks.iter().filter_map(Chunk::as_text).collect()
}

pub(super) fn rate_limited() -> SwitchyardError {
    SwitchyardError::backend_with_status("Too Many Requests", 429)
}

pub(super) fn switched_to(backend_id: &str) -> String {
    format!("Switched to backend: {}", display_name(backend_id))
}
