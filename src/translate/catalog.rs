//! Catalog-backed translation service.
//! Loads `{ "<locale>": { "<identifier>": "<text>", ... }, ... }` from JSON and
//! answers lookups for the active locale after an optional simulated latency.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt};
use parking_lot::RwLock;
use tracing::{debug, info};

use super::{RemoteTranslator, TranslateError, TranslateRequest};

type LocaleTable = HashMap<String, String>;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("catalog IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("catalog parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

pub struct CatalogTranslator {
    tables: Arc<HashMap<String, LocaleTable>>,
    locale: RwLock<String>,
    latency: Duration,
}

impl CatalogTranslator {
    pub fn new(tables: HashMap<String, LocaleTable>, locale: &str) -> Self {
        Self {
            tables: Arc::new(tables),
            locale: RwLock::new(locale.to_string()),
            latency: Duration::ZERO,
        }
    }

    pub fn load_from_file(path: &Path, locale: &str) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path)?;
        let tables: HashMap<String, LocaleTable> = serde_json::from_str(&content)?;
        info!(
            path = %path.display(),
            locales = tables.len(),
            "translation catalog loaded"
        );
        Ok(Self::new(tables, locale))
    }

    /// Delay every answer by `latency`, as a network round trip would.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn locale(&self) -> String {
        self.locale.read().clone()
    }
}

impl RemoteTranslator for CatalogTranslator {
    fn translate(&self, request: TranslateRequest) -> BoxFuture<'static, Result<String, TranslateError>> {
        let tables = Arc::clone(&self.tables);
        let locale = self.locale();
        let latency = self.latency;
        async move {
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            let text = tables
                .get(&locale)
                .and_then(|table| table.get(&request.identifier))
                .cloned();
            debug!(
                request_id = %request.request_id,
                identifier = %request.identifier,
                locale = %locale,
                found = text.is_some(),
                "catalog lookup"
            );
            text.ok_or(TranslateError::UnknownIdentifier(request.identifier))
        }
        .boxed()
    }

    fn set_locale(&self, locale: &str) {
        *self.locale.write() = locale.to_string();
    }
}
