//! Translation resolution for the UI layer.
//!
//! `Resolver::resolve` never waits: it answers from the cache or falls back to
//! the caller's default text, and on a clean miss dispatches exactly one
//! remote request for that fingerprint. The request's completion runs on the
//! runtime as a `ResponseHandler` continuation, which fills the cache and asks
//! the observer to re-render.
//!
//! A request that never completes leaves its fingerprint in flight for the
//! rest of the session, so that exact lookup is never dispatched again.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::runtime::Handle;
use tracing::{debug, warn};

use super::{
    Fingerprint, Lookup, RemoteTranslator, TranslateError, TranslateRequest, TranslationCache,
    TranslationEntry, TranslationKey, TRANSLATE_METHOD,
};
use crate::metrics::ResolverMetrics;
use crate::observer::Observer;
use crate::settings::Settings;

/// Captured at dispatch time and handed unchanged to the response handler.
#[derive(Clone)]
pub struct ResolveContext {
    pub fingerprint: Fingerprint,
    pub placeholder: Option<String>,
    pub count: Option<i64>,
    pub observer: Option<Arc<dyn Observer>>,
    pub request_id: String,
    pub dispatched_at: Instant,
}

impl std::fmt::Debug for ResolveContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolveContext")
            .field("fingerprint", &self.fingerprint)
            .field("placeholder", &self.placeholder)
            .field("count", &self.count)
            .field("observer", &self.observer.is_some())
            .field("request_id", &self.request_id)
            .finish()
    }
}

/// Completion side of a dispatched lookup. The only writer of cache entries.
#[derive(Clone)]
pub struct ResponseHandler {
    cache: Arc<TranslationCache>,
    settings: Arc<Settings>,
    metrics: Arc<ResolverMetrics>,
}

impl ResponseHandler {
    pub fn new(
        cache: Arc<TranslationCache>,
        settings: Arc<Settings>,
        metrics: Arc<ResolverMetrics>,
    ) -> Self {
        Self {
            cache,
            settings,
            metrics,
        }
    }

    pub fn on_complete(&self, context: ResolveContext, outcome: Result<String, TranslateError>) {
        let fp = context.fingerprint;
        let elapsed = context.dispatched_at.elapsed();
        self.metrics
            .record_completion(duration_ms(elapsed), outcome.is_err());

        match outcome {
            Ok(text) => {
                self.cache.complete(
                    &fp,
                    Some(TranslationEntry::Resolved {
                        text,
                        placeholder: context.placeholder,
                        count: context.count,
                    }),
                );
                debug!(
                    fingerprint = %fp,
                    request_id = %context.request_id,
                    elapsed_ms = duration_ms(elapsed),
                    "translation resolved"
                );
                if let Some(observer) = context.observer {
                    observer.notify();
                }
            }
            // Strict mode leaves the fingerprint unseen, so the next resolve
            // retries. Non-strict failures are remembered for the session.
            // TODO: settle whether strict failures should be remembered too;
            // as is, every re-render of a bad identifier dispatches again.
            Err(e) if self.settings.strict_identifier_mode() => {
                self.cache.complete(&fp, None);
                warn!(
                    fingerprint = %fp,
                    request_id = %context.request_id,
                    error = %e,
                    "translation failed, will retry on next lookup"
                );
            }
            Err(e) => {
                self.cache.complete(&fp, Some(TranslationEntry::Empty));
                warn!(
                    fingerprint = %fp,
                    request_id = %context.request_id,
                    error = %e,
                    "translation failed, suppressing further lookups"
                );
            }
        }
    }
}

fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

pub struct Resolver {
    cache: Arc<TranslationCache>,
    settings: Arc<Settings>,
    remote: Arc<dyn RemoteTranslator>,
    metrics: Arc<ResolverMetrics>,
    handler: ResponseHandler,
    runtime: Handle,
}

impl Resolver {
    /// `runtime` drives dispatched requests and their completions.
    pub fn new(
        cache: Arc<TranslationCache>,
        settings: Arc<Settings>,
        remote: Arc<dyn RemoteTranslator>,
        metrics: Arc<ResolverMetrics>,
        runtime: Handle,
    ) -> Self {
        let handler = ResponseHandler::new(
            Arc::clone(&cache),
            Arc::clone(&settings),
            Arc::clone(&metrics),
        );
        Self {
            cache,
            settings,
            remote,
            metrics,
            handler,
            runtime,
        }
    }

    pub fn cache(&self) -> &Arc<TranslationCache> {
        &self.cache
    }

    pub fn settings(&self) -> &Arc<Settings> {
        &self.settings
    }

    pub fn metrics(&self) -> &Arc<ResolverMetrics> {
        &self.metrics
    }

    /// Fingerprint `resolve` would use for these arguments under the current
    /// locale.
    pub fn fingerprint_for(
        &self,
        identifier: &str,
        placeholder: Option<&str>,
        count: Option<i64>,
    ) -> Fingerprint {
        self.key_for(identifier, placeholder, count).fingerprint()
    }

    fn key_for(&self, identifier: &str, placeholder: Option<&str>, count: Option<i64>) -> TranslationKey {
        TranslationKey::new(
            identifier,
            placeholder.map(str::to_string),
            count,
            self.settings.locale(),
        )
    }

    /// Best text currently available for `identifier`.
    ///
    /// Returns the cached translation when there is one, otherwise
    /// `default_text` (wrapped in untranslated markers when those are on).
    pub fn resolve(
        &self,
        observer: Option<Arc<dyn Observer>>,
        identifier: &str,
        default_text: &str,
        placeholder: Option<&str>,
        count: Option<i64>,
    ) -> String {
        let fallback = if self.settings.show_untranslated_markers() {
            self.settings.config().mark_untranslated(default_text)
        } else {
            default_text.to_string()
        };

        let key = self.key_for(identifier, placeholder, count);
        let fp = key.fingerprint();

        if key.identifier.is_empty() || key.locale.is_empty() {
            self.metrics.record_skipped();
            return fallback;
        }

        match self.cache.lookup_or_claim(&fp) {
            Lookup::Hit(text) => {
                self.metrics.record_hit();
                text
            }
            Lookup::Suppressed => {
                self.metrics.record_suppressed();
                fallback
            }
            Lookup::InFlight => {
                self.metrics.record_deduplicated();
                debug!(fingerprint = %fp, identifier, "lookup already in flight");
                fallback
            }
            Lookup::Claimed => {
                self.dispatch(key, fp, default_text, observer);
                fallback
            }
        }
    }

    fn dispatch(
        &self,
        key: TranslationKey,
        fp: Fingerprint,
        default_text: &str,
        observer: Option<Arc<dyn Observer>>,
    ) {
        let request_id = uuid::Uuid::new_v4().to_string();
        let request = TranslateRequest {
            request_id: request_id.clone(),
            identifier: key.identifier,
            count: key.count,
            placeholder: key.placeholder.clone().filter(|p| !p.is_empty()),
            default_text: (!self.settings.strict_identifier_mode())
                .then(|| default_text.to_string()),
        };
        debug!(
            method = TRANSLATE_METHOD,
            fingerprint = %fp,
            request_id = %request_id,
            identifier = %request.identifier,
            locale = %key.locale,
            "dispatching translation request"
        );

        let context = ResolveContext {
            fingerprint: fp,
            placeholder: key.placeholder,
            count: key.count,
            observer,
            request_id,
            dispatched_at: Instant::now(),
        };

        self.metrics.record_dispatch();
        let pending = self.remote.translate(request);
        let handler = self.handler.clone();
        self.runtime.spawn(async move {
            let outcome = pending.await;
            handler.on_complete(context, outcome);
        });
    }
}
