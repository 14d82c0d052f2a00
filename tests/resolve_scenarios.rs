//! End-to-end lookup behaviour with a remote whose completions the test
//! controls: dispatch counts, deduplication, success, and both failure
//! policies.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures_util::future::{self, BoxFuture, FutureExt};
use parking_lot::Mutex;
use serde_json::json;
use tokio::sync::oneshot;
use trcache::config::ResolverConfig;
use trcache::observer::Observer;
use trcache::settings::{KeyValueStore, MemoryStore};
use trcache::translate::{
    Fingerprint, LookupState, RemoteTranslator, TranslateError, TranslateRequest,
};
use trcache::AppContext;

type Reply = oneshot::Sender<Result<String, TranslateError>>;

/// Records each request and parks its completion until the test replies.
#[derive(Default)]
struct ScriptedTranslator {
    requests: Mutex<Vec<TranslateRequest>>,
    pending: Mutex<Vec<Reply>>,
    locale_updates: Mutex<Vec<String>>,
}

impl ScriptedTranslator {
    fn dispatched(&self) -> usize {
        self.requests.lock().len()
    }

    fn last_request(&self) -> TranslateRequest {
        self.requests.lock().last().cloned().expect("no request dispatched")
    }

    fn reply_next(&self, outcome: Result<String, TranslateError>) {
        let reply = self.pending.lock().remove(0);
        reply.send(outcome).expect("resolver dropped the request");
    }
}

impl RemoteTranslator for ScriptedTranslator {
    fn translate(&self, request: TranslateRequest) -> BoxFuture<'static, Result<String, TranslateError>> {
        let (tx, rx) = oneshot::channel();
        self.requests.lock().push(request);
        self.pending.lock().push(tx);
        async move { rx.await.unwrap_or(Err(TranslateError::Unavailable)) }.boxed()
    }

    fn set_locale(&self, locale: &str) {
        self.locale_updates.lock().push(locale.to_string());
    }
}

/// Answers every request at once with the same text.
#[derive(Default)]
struct InstantTranslator {
    dispatched: AtomicUsize,
}

impl RemoteTranslator for InstantTranslator {
    fn translate(&self, _request: TranslateRequest) -> BoxFuture<'static, Result<String, TranslateError>> {
        self.dispatched.fetch_add(1, Ordering::SeqCst);
        future::ready(Ok("X".to_string())).boxed()
    }
}

struct Counter(AtomicUsize);

impl Observer for Counter {
    fn notify(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

struct Harness {
    ctx: AppContext,
    remote: Arc<ScriptedTranslator>,
    store: Arc<MemoryStore>,
}

impl Harness {
    fn new(locale: Option<&str>) -> Self {
        let store = Arc::new(MemoryStore::new());
        if let Some(locale) = locale {
            store.set("locale", json!(locale));
        }
        let remote = Arc::new(ScriptedTranslator::default());
        let ctx = AppContext::new(
            store.clone(),
            ResolverConfig::default(),
            remote.clone(),
            tokio::runtime::Handle::current(),
        );
        Self { ctx, remote, store }
    }

    fn tr(&self, identifier: &str, default_text: &str) -> String {
        self.ctx.tr(None, identifier, default_text, None, None)
    }

    fn fp(&self, identifier: &str) -> Fingerprint {
        self.ctx.resolver().fingerprint_for(identifier, None, None)
    }

    /// Let the spawned completion for `fp` run.
    async fn settle(&self, fp: &Fingerprint) {
        for _ in 0..100 {
            if !self.ctx.cache.is_in_flight(fp) {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("request for {fp} never completed");
    }
}

#[tokio::test]
async fn first_lookup_dispatches_once_and_returns_default() {
    let h = Harness::new(Some("en"));

    assert_eq!(h.tr("ui.hello", "Hello"), "Hello");
    assert_eq!(h.remote.dispatched(), 1);
    assert_eq!(h.ctx.cache.state(&h.fp("ui.hello")), LookupState::InFlight);

    let request = h.remote.last_request();
    assert_eq!(request.identifier, "ui.hello");
    assert_eq!(request.count, None);
    assert_eq!(request.placeholder, None);
    assert_eq!(request.default_text.as_deref(), Some("Hello"));
}

#[tokio::test]
async fn lookups_while_in_flight_are_deduplicated() {
    let h = Harness::new(Some("en"));

    for _ in 0..5 {
        assert_eq!(h.tr("ui.hello", "Hello"), "Hello");
    }
    assert_eq!(h.remote.dispatched(), 1);
    assert_eq!(h.ctx.metrics.snapshot().deduplicated, 4);
}

#[tokio::test]
async fn success_is_served_from_cache() {
    let h = Harness::new(Some("en"));
    h.tr("ui.hello", "Hello");

    h.remote.reply_next(Ok("Bonjour".into()));
    h.settle(&h.fp("ui.hello")).await;

    for _ in 0..3 {
        assert_eq!(h.tr("ui.hello", "Hello"), "Bonjour");
    }
    assert_eq!(h.remote.dispatched(), 1);
    assert_eq!(h.ctx.cache.state(&h.fp("ui.hello")), LookupState::Resolved);
}

#[tokio::test]
async fn failure_is_suppressed_when_not_strict() {
    let h = Harness::new(Some("en"));
    h.tr("ui.missing", "Missing");

    h.remote
        .reply_next(Err(TranslateError::UnknownIdentifier("ui.missing".into())));
    h.settle(&h.fp("ui.missing")).await;

    for _ in 0..3 {
        assert_eq!(h.tr("ui.missing", "Missing"), "Missing");
    }
    assert_eq!(h.remote.dispatched(), 1);
    assert_eq!(h.ctx.cache.state(&h.fp("ui.missing")), LookupState::Suppressed);
}

#[tokio::test]
async fn failure_is_retried_when_strict() {
    let h = Harness::new(Some("en"));
    h.ctx.settings.set_strict_identifier_mode(true);

    h.tr("ui.missing", "Missing");
    assert_eq!(h.remote.last_request().default_text, None);

    h.remote.reply_next(Err(TranslateError::Remote("bad id".into())));
    h.settle(&h.fp("ui.missing")).await;
    assert_eq!(h.ctx.cache.state(&h.fp("ui.missing")), LookupState::Unseen);

    assert_eq!(h.tr("ui.missing", "Missing"), "Missing");
    assert_eq!(h.remote.dispatched(), 2);
    assert_eq!(h.tr("ui.missing", "Missing"), "Missing");
    assert_eq!(h.remote.dispatched(), 2);
}

#[tokio::test]
async fn locale_change_is_a_fresh_lookup() {
    let h = Harness::new(Some("en"));
    h.tr("ui.hello", "Hello");
    h.remote.reply_next(Ok("Bonjour".into()));
    h.settle(&h.fp("ui.hello")).await;
    assert_eq!(h.tr("ui.hello", "Hello"), "Bonjour");

    h.ctx.set_locale("fr");
    assert_eq!(h.remote.locale_updates.lock().last().map(String::as_str), Some("fr"));

    assert_eq!(h.tr("ui.hello", "Hello"), "Hello");
    assert_eq!(h.remote.dispatched(), 2);

    // The old locale's entry is still there.
    h.ctx.set_locale("en");
    assert_eq!(h.tr("ui.hello", "Hello"), "Bonjour");
    assert_eq!(h.remote.dispatched(), 2);
}

#[tokio::test]
async fn missing_locale_uses_unknown_sentinel() {
    let h = Harness::new(None);
    assert_eq!(h.ctx.settings.locale(), "unknown");
    h.tr("ui.hello", "Hello");
    assert_eq!(h.remote.dispatched(), 1);
}

#[tokio::test]
async fn markers_wrap_default_without_lookup_for_empty_identifier() {
    let h = Harness::new(Some("en"));
    h.ctx.settings.set_show_untranslated_markers(true);

    assert_eq!(h.tr("", "Hello"), "<UT>Hello</UT>");
    assert_eq!(h.remote.dispatched(), 0);
    assert_eq!(h.store.get("untranslated_text"), Some(json!(true)));
}

#[tokio::test]
async fn markers_do_not_wrap_a_resolved_translation() {
    let h = Harness::new(Some("en"));
    h.ctx.settings.set_show_untranslated_markers(true);

    assert_eq!(h.tr("ui.hello", "Hello"), "<UT>Hello</UT>");
    assert_eq!(h.remote.last_request().default_text.as_deref(), Some("Hello"));
    h.remote.reply_next(Ok("Bonjour".into()));
    h.settle(&h.fp("ui.hello")).await;
    assert_eq!(h.tr("ui.hello", "Hello"), "Bonjour");
}

#[tokio::test]
async fn observer_notified_once_on_success_only() {
    let h = Harness::new(Some("en"));
    let ok = Arc::new(Counter(AtomicUsize::new(0)));
    let failed = Arc::new(Counter(AtomicUsize::new(0)));

    h.ctx.tr(Some(ok.clone()), "ui.ok", "Ok", None, None);
    h.ctx.tr(Some(failed.clone()), "ui.bad", "Bad", None, None);

    h.remote.reply_next(Ok("D'accord".into()));
    h.remote.reply_next(Err(TranslateError::Unavailable));
    h.settle(&h.fp("ui.ok")).await;
    h.settle(&h.fp("ui.bad")).await;

    assert_eq!(ok.0.load(Ordering::SeqCst), 1);
    assert_eq!(failed.0.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn completions_in_any_order_land_on_their_own_fingerprint() {
    let h = Harness::new(Some("en"));
    h.tr("ui.a", "A");
    h.tr("ui.b", "B");

    // Reply to b first by swapping the parked senders.
    h.remote.pending.lock().swap(0, 1);
    h.remote.reply_next(Ok("bee".into()));
    h.remote.reply_next(Ok("ay".into()));
    h.settle(&h.fp("ui.a")).await;
    h.settle(&h.fp("ui.b")).await;

    assert_eq!(h.tr("ui.a", "A"), "ay");
    assert_eq!(h.tr("ui.b", "B"), "bee");
}

#[tokio::test]
async fn plural_and_placeholder_variants_are_separate_lookups() {
    let h = Harness::new(Some("en"));
    h.ctx.tr(None, "ui.items", "items", None, Some(1));
    h.ctx.tr(None, "ui.items", "items", None, Some(2));
    h.ctx.tr(None, "ui.items", "items", Some("n"), Some(2));
    h.ctx.tr(None, "ui.items", "items", Some("n"), Some(2));
    assert_eq!(h.remote.dispatched(), 3);
}

#[tokio::test]
async fn independent_contexts_do_not_share_state() {
    let a = Harness::new(Some("en"));
    let b = Harness::new(Some("en"));
    a.tr("ui.hello", "Hello");
    a.remote.reply_next(Ok("Hi".into()));
    a.settle(&a.fp("ui.hello")).await;

    assert_eq!(a.tr("ui.hello", "Hello"), "Hi");
    assert_eq!(b.tr("ui.hello", "Hello"), "Hello");
    assert_eq!(b.remote.dispatched(), 1);
}

#[tokio::test]
async fn request_that_never_completes_stays_in_flight() {
    let h = Harness::new(Some("en"));
    h.tr("ui.slow", "Slow");
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    assert_eq!(h.tr("ui.slow", "Slow"), "Slow");
    assert_eq!(h.remote.dispatched(), 1);
    assert_eq!(h.ctx.cache.in_flight_count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn completions_on_other_workers_never_cause_a_second_dispatch() {
    const IDENTIFIERS: usize = 5_000;

    let store = Arc::new(MemoryStore::new());
    store.set("locale", json!("en"));
    let remote = Arc::new(InstantTranslator::default());
    let ctx = AppContext::new(
        store,
        ResolverConfig::default(),
        remote.clone(),
        tokio::runtime::Handle::current(),
    );

    for i in 0..IDENTIFIERS {
        let identifier = format!("ui.{i}");
        let mut spins = 0;
        while ctx.tr(None, &identifier, "d", None, None) != "X" {
            spins += 1;
            assert!(spins < 1_000_000, "{identifier} never resolved");
            tokio::task::yield_now().await;
        }
    }

    assert_eq!(remote.dispatched.load(Ordering::SeqCst), IDENTIFIERS);
    assert_eq!(ctx.metrics.snapshot().dispatched, IDENTIFIERS as u64);
    assert_eq!(ctx.cache.len(), IDENTIFIERS);
    assert_eq!(ctx.cache.in_flight_count(), 0);
}
