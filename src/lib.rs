//! trcache: locale-aware translation resolver for UI text.
//! Main library: shared application context and tracing setup.

pub mod config;
pub mod metrics;
pub mod observer;
pub mod settings;
pub mod translate;

use std::sync::Arc;

use tokio::runtime::Handle;
use tracing::info;

use config::ResolverConfig;
use metrics::ResolverMetrics;
use observer::Observer;
use settings::{KeyValueStore, Settings};
use translate::{RemoteTranslator, Resolver, TranslationCache};

/// Owns every piece of session state the resolver touches. UI code holds an
/// `Arc<AppContext>` instead of reaching for globals, and independent
/// contexts never share a cache.
pub struct AppContext {
    pub settings: Arc<Settings>,
    pub cache: Arc<TranslationCache>,
    pub metrics: Arc<ResolverMetrics>,
    remote: Arc<dyn RemoteTranslator>,
    resolver: Resolver,
}

impl AppContext {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        config: ResolverConfig,
        remote: Arc<dyn RemoteTranslator>,
        runtime: Handle,
    ) -> Self {
        let settings = Arc::new(Settings::load(store, config));
        let cache = Arc::new(TranslationCache::new());
        let metrics = Arc::new(ResolverMetrics::new());
        remote.set_locale(&settings.locale());

        let resolver = Resolver::new(
            Arc::clone(&cache),
            Arc::clone(&settings),
            Arc::clone(&remote),
            Arc::clone(&metrics),
            runtime,
        );
        info!(locale = %settings.locale(), "translation context ready");

        Self {
            settings,
            cache,
            metrics,
            remote,
            resolver,
        }
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// See `Resolver::resolve`.
    pub fn tr(
        &self,
        observer: Option<Arc<dyn Observer>>,
        identifier: &str,
        default_text: &str,
        placeholder: Option<&str>,
        count: Option<i64>,
    ) -> String {
        self.resolver
            .resolve(observer, identifier, default_text, placeholder, count)
    }

    /// Persist the new locale and tell the translation service about it.
    /// Existing entries stay cached under the old locale's fingerprints.
    pub fn set_locale(&self, locale: &str) {
        self.settings.set_locale(locale);
        self.remote.set_locale(locale);
    }
}

/// Log line format for `init_tracing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    /// `json` (any case) selects JSON lines; anything else is plain text.
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }

    /// Read from `TRCACHE_LOG_FORMAT`.
    pub fn from_env() -> Self {
        std::env::var("TRCACHE_LOG_FORMAT")
            .map(|v| Self::parse(&v))
            .unwrap_or_default()
    }
}

/// Install the global tracing subscriber. Filter comes from `RUST_LOG`,
/// defaulting to `trcache=debug`; format from `TRCACHE_LOG_FORMAT`.
/// Safe to call more than once.
pub fn init_tracing() {
    init_tracing_with(LogFormat::from_env());
}

pub fn init_tracing_with(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("trcache=debug"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true);
    let _ = match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.try_init(),
    };
}
