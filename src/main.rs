//! Demo: resolve a handful of UI strings against a JSON catalog, wait for the
//! asynchronous fill, and resolve them again.
//!
//! Usage: trcache [catalog.json] [locale]

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use trcache::config::ResolverConfig;
use trcache::observer::{Observer, WatchObserver};
use trcache::settings::MemoryStore;
use trcache::translate::catalog::CatalogTranslator;
use trcache::AppContext;

const STRINGS: &[(&str, &str)] = &[
    ("ui.t-language", "Language"),
    ("ui.t-untranslated-text", "Show untranslated text"),
    ("ui.t-translation-id-error", "Error on invalid translation ID"),
    ("ui.h-search", "Search"),
];

fn builtin_catalog() -> HashMap<String, HashMap<String, String>> {
    let fr = [
        ("ui.t-language", "Langue"),
        ("ui.t-untranslated-text", "Afficher le texte non traduit"),
        ("ui.h-search", "Recherche"),
    ];
    let mut tables = HashMap::new();
    tables.insert(
        "fr".to_string(),
        fr.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    );
    tables
}

#[tokio::main]
async fn main() {
    trcache::init_tracing();

    let mut args = std::env::args().skip(1);
    let catalog_path = args.next();
    let locale = args.next().unwrap_or_else(|| "fr".to_string());

    let config = match std::env::var("TRCACHE_CONFIG") {
        Ok(path) => ResolverConfig::load_from_file(Path::new(&path)).unwrap_or_else(|e| {
            warn!(error = %e, "config load failed, using defaults");
            ResolverConfig::default()
        }),
        Err(_) => ResolverConfig::default(),
    };

    let catalog = match catalog_path {
        Some(path) => CatalogTranslator::load_from_file(Path::new(&path), &locale).unwrap_or_else(|e| {
            warn!(error = %e, "catalog load failed, using built-in catalog");
            CatalogTranslator::new(builtin_catalog(), &locale)
        }),
        None => CatalogTranslator::new(builtin_catalog(), &locale),
    };
    let remote = Arc::new(catalog.with_latency(Duration::from_millis(150)));

    let ctx = AppContext::new(
        Arc::new(MemoryStore::new()),
        config,
        remote,
        tokio::runtime::Handle::current(),
    );
    ctx.set_locale(&locale);

    let observer = Arc::new(WatchObserver::new());
    let mut rerender = observer.subscribe();

    let render = |round: &str| {
        for (id, default) in STRINGS {
            let shown = ctx.tr(Some(observer.clone() as Arc<dyn Observer>), id, default, None, None);
            println!("[{round}] {id:<28} {shown}");
        }
    };

    render("first");

    // Failed lookups clear the in-flight flag without notifying, so poll.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while ctx.cache.in_flight_count() > 0 && tokio::time::Instant::now() < deadline {
        let _ = tokio::time::timeout(Duration::from_millis(25), rerender.changed()).await;
    }

    render("second");

    match serde_json::to_string_pretty(&ctx.metrics.snapshot()) {
        Ok(json) => println!("{json}"),
        Err(e) => warn!(error = %e, "metrics serialization failed"),
    }
    info!(cached = ctx.cache.len(), "done");
}
