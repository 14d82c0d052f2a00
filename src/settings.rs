//! Persistent key-value store and the locale/flag settings layered on it.
//! Flags are cached in atomics and written through to the store, so reads on
//! the resolve path never touch disk.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tracing::{info, warn};

use crate::config::ResolverConfig;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Synchronous key-value storage for user settings.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;

    fn set(&self, key: &str, value: Value);

    fn get_or(&self, key: &str, default: Value) -> Value {
        self.get(key).unwrap_or(default)
    }
}

/// In-process store; contents are lost on exit.
#[derive(Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) {
        self.values.write().insert(key.to_string(), value);
    }
}

/// Store persisted as one JSON object, rewritten on every `set`.
pub struct JsonFileStore {
    path: PathBuf,
    values: Mutex<serde_json::Map<String, Value>>,
}

impl JsonFileStore {
    /// Open the store at `path`. A missing file starts empty.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let values = match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => serde_json::Map::new(),
            Err(e) => return Err(e.into()),
        };
        info!(path = %path.display(), keys = values.len(), "settings store opened");
        Ok(Self {
            path: path.to_path_buf(),
            values: Mutex::new(values),
        })
    }

    fn flush(&self, values: &serde_json::Map<String, Value>) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(values)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) {
        let mut values = self.values.lock();
        values.insert(key.to_string(), value);
        if let Err(e) = self.flush(&values) {
            warn!(error = %e, key, path = %self.path.display(), "settings store write failed");
        }
    }
}

/// Active locale and the two resolver feature flags.
pub struct Settings {
    store: Arc<dyn KeyValueStore>,
    config: ResolverConfig,
    show_untranslated_markers: AtomicBool,
    strict_identifier_mode: AtomicBool,
}

impl Settings {
    /// Load flag values from `store`; absent or non-boolean values read as off.
    pub fn load(store: Arc<dyn KeyValueStore>, config: ResolverConfig) -> Self {
        let flag = |key: &str| store.get(key).and_then(|v| v.as_bool()).unwrap_or(false);
        let markers = flag(&config.markers_key);
        let strict = flag(&config.strict_key);
        Self {
            show_untranslated_markers: AtomicBool::new(markers),
            strict_identifier_mode: AtomicBool::new(strict),
            store,
            config,
        }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Stored locale, or the configured sentinel when none is stored.
    /// An explicitly stored empty string is returned as is.
    pub fn locale(&self) -> String {
        match self.store.get(&self.config.locale_key) {
            Some(Value::String(s)) => s,
            Some(Value::Null) | None => self.config.unknown_locale.clone(),
            Some(other) => other.to_string(),
        }
    }

    pub fn set_locale(&self, locale: &str) {
        self.store
            .set(&self.config.locale_key, Value::String(locale.to_string()));
        info!(locale, "locale changed");
    }

    pub fn show_untranslated_markers(&self) -> bool {
        self.show_untranslated_markers.load(Ordering::Relaxed)
    }

    pub fn set_show_untranslated_markers(&self, on: bool) {
        self.show_untranslated_markers.store(on, Ordering::Relaxed);
        self.store.set(&self.config.markers_key, Value::Bool(on));
    }

    pub fn strict_identifier_mode(&self) -> bool {
        self.strict_identifier_mode.load(Ordering::Relaxed)
    }

    pub fn set_strict_identifier_mode(&self, on: bool) {
        self.strict_identifier_mode.store(on, Ordering::Relaxed);
        self.store.set(&self.config.strict_key, Value::Bool(on));
    }
}
