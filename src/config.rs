//! Resolver configuration: marker delimiters, locale sentinel, and the store
//! keys the locale and feature flags are persisted under.

use std::path::Path;

use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Wrapped around default text when untranslated markers are on.
    pub marker_open: String,
    pub marker_close: String,
    /// Locale used when none has been stored.
    pub unknown_locale: String,
    pub locale_key: String,
    pub markers_key: String,
    pub strict_key: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            marker_open: "<UT>".into(),
            marker_close: "</UT>".into(),
            unknown_locale: "unknown".into(),
            locale_key: "locale".into(),
            markers_key: "untranslated_text".into(),
            strict_key: "translation_id_error".into(),
        }
    }
}

impl ResolverConfig {
    /// Load from a JSON file. Missing fields keep their defaults.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn mark_untranslated(&self, text: &str) -> String {
        format!("{}{}{}", self.marker_open, text, self.marker_close)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"marker_open": "[[", "marker_close": "]]"}}"#).unwrap();
        let config = ResolverConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.mark_untranslated("Hello"), "[[Hello]]");
        assert_eq!(config.unknown_locale, "unknown");
        assert_eq!(config.strict_key, "translation_id_error");
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let err = ResolverConfig::load_from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn default_markers() {
        assert_eq!(ResolverConfig::default().mark_untranslated("Hi"), "<UT>Hi</UT>");
    }
}
