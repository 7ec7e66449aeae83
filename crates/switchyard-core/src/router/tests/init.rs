//! Lazy initialization tests

use super::*;
use crate::backend::{ConfigResolver, MockConfigResolver};
use std::time::Duration;

/// Resolver that is slow enough for concurrent initializers to overlap
struct SlowResolver {
    inner: Arc<StaticResolver>,
    calls: AtomicUsize,
}

#[async_trait]
impl ConfigResolver for SlowResolver {
    async fn resolve(&self, backend_id: &str) -> SwitchyardResult<ResolvedBackend> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.inner.resolve(backend_id).await
    }
}

fn router_with_resolver(h: &Harness, resolver: Arc<dyn ConfigResolver>) -> FallbackRouter {
    FallbackRouterBuilder::new(RouterConfig::new(
        h.router
            .inner
            .config
            .backends
            .clone(),
    ))
    .ledger(h.ledger.clone())
    .resolver(resolver)
    .factory(h.factory.clone())
    .build()
    .unwrap()
}

#[tokio::test]
async fn test_unresolvable_backend_is_skipped() {
    let h = Harness::new(vec![
        BackendConfig::new("gone"),
        BackendConfig::new("a"),
    ]);
    h.resolver.remove("gone");

    h.router.initialize().await;

    assert_eq!(h.router.backend_ids(), vec!["a".to_string()]);
    assert_eq!(h.router.active_backend(), Some("a".to_string()));
    let errors = h.router.init_errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].backend_id, "gone");
    assert!(errors[0].message.contains("gone"));
}

#[tokio::test]
async fn test_construction_failure_is_skipped() {
    let h = Harness::new(vec![BackendConfig::new("a"), BackendConfig::new("b")]);
    h.factory.refuse("a");

    let (chunks, err) = collect(h.request()).await;

    assert!(err.is_none());
    assert_eq!(texts(&chunks), vec![ScriptedBackend::default_text("b")]);
    assert_eq!(h.router.init_errors()[0].backend_id, "a");
}

#[tokio::test]
async fn test_handle_initialize_failure_is_skipped() {
    let h = Harness::new(vec![BackendConfig::new("a"), BackendConfig::new("b")]);
    h.backend("a")
        .fail_initialize(SwitchyardError::backend("credentials expired"));

    h.router.initialize().await;

    assert_eq!(h.router.backend_ids(), vec!["b".to_string()]);
}

#[tokio::test]
async fn test_prefetch_failure_keeps_backend() {
    let h = Harness::new(vec![BackendConfig::new("a"), BackendConfig::new("b")]);
    h.backend("a")
        .enable_prefetch(Err(SwitchyardError::backend("model list unavailable")));
    h.backend("b").enable_prefetch(Ok(()));

    h.router.initialize().await;

    assert_eq!(h.router.backend_ids(), vec!["a".to_string(), "b".to_string()]);
    assert_eq!(h.backend("a").prefetch_calls(), 1);
    assert_eq!(h.backend("b").prefetch_calls(), 1);
    assert!(h.router.init_errors().is_empty());
}

#[tokio::test]
async fn test_initialize_is_idempotent() {
    let h = Harness::new(vec![BackendConfig::new("a")]);

    h.router.initialize().await;
    h.router.initialize().await;
    let _ = h.router.count_tokens(&[]).await.unwrap();

    assert_eq!(h.factory.constructed(), 1);
    assert_eq!(h.router.history().await.len(), 1);
}

#[tokio::test]
async fn test_concurrent_first_use_initializes_once() {
    let h = Harness::new(vec![BackendConfig::new("a"), BackendConfig::new("b")]);
    let slow = Arc::new(SlowResolver {
        inner: h.resolver.clone(),
        calls: AtomicUsize::new(0),
    });
    let router = router_with_resolver(&h, slow.clone());

    let mut handles = Vec::new();
    for i in 0..10 {
        let router = router.clone();
        handles.push(tokio::spawn(async move {
            if i % 2 == 0 {
                router.initialize().await;
                Ok(0)
            } else {
                router.count_tokens(&[ContentBlock::text("x")]).await
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(h.factory.constructed(), 2);
    assert_eq!(router.backend_ids(), vec!["a".to_string(), "b".to_string()]);
    // Two resolutions during init plus one display-name lookup for the switch
    assert_eq!(slow.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_all_backends_unresolvable() {
    let h = Harness::new(vec![BackendConfig::new("a"), BackendConfig::new("b")]);
    h.resolver.remove("a");
    h.resolver.remove("b");

    let (chunks, err) = collect(h.request()).await;

    assert!(chunks.is_empty());
    assert!(err.unwrap().is_unavailable());
    assert_eq!(h.router.init_errors().len(), 2);
    assert!(h.router.model().is_placeholder());
    assert_eq!(h.router.count_tokens(&[]).await.unwrap(), 0);
}

#[tokio::test]
async fn test_switch_notification_falls_back_to_raw_id() {
    let mut h = Harness::new(vec![BackendConfig::new("a"), BackendConfig::new("b")]);
    h.router.initialize().await;
    assert_eq!(h.drain_notifications(), vec![switched_to("a")]);

    // b was resolved during init but has since been deleted
    h.resolver.remove("b");
    h.ledger
        .set_cooldown("a", Duration::from_secs(60))
        .await
        .unwrap();
    h.router.adjust_active_handler("test").await.unwrap();

    assert_eq!(h.drain_notifications(), vec!["Switched to backend: b".to_string()]);
}

#[tokio::test]
async fn test_mock_resolver_display_name() {
    let h = Harness::new(vec![BackendConfig::new("a")]);

    let mut resolver = MockConfigResolver::new();
    resolver
        .expect_resolve()
        .times(2)
        .returning(|id| Ok(ResolvedBackend::new(id, "Primary Claude", "anthropic")));

    let (notifier, mut rx) = crate::notify::ChannelNotifier::new();
    let router = FallbackRouterBuilder::new(RouterConfig::new(vec![BackendConfig::new("a")]))
        .ledger(h.ledger.clone())
        .resolver(Arc::new(resolver))
        .factory(h.factory.clone())
        .notifier(Arc::new(notifier))
        .build()
        .unwrap();

    router.initialize().await;

    assert_eq!(rx.try_recv().unwrap(), "Switched to backend: Primary Claude");
    assert_eq!(router.status().await.unwrap()[0].name, "Primary Claude");
}

#[test]
fn test_builder_requires_collaborators() {
    let err = FallbackRouterBuilder::new(RouterConfig::new(vec![BackendConfig::new("a")]))
        .build()
        .unwrap_err();
    assert!(matches!(err, SwitchyardError::Config { .. }));
}

#[test]
fn test_builder_validates_config() {
    let h_ledger = UsageLedger::new(Arc::new(MemoryStore::new()));
    let err = FallbackRouterBuilder::new(RouterConfig::new(vec![
        BackendConfig::new("a"),
        BackendConfig::new("a"),
    ]))
    .ledger(h_ledger)
    .resolver(Arc::new(StaticResolver::new()))
    .factory(Arc::new(|_: &ResolvedBackend| -> SwitchyardResult<Arc<dyn BackendHandle>> {
        Err(SwitchyardError::config("unused"))
    }))
    .build()
    .unwrap_err();
    assert!(err.to_string().contains("Duplicate backend id"));
}
