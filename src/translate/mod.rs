//! Translation lookup core: fingerprinting, caching, resolution, and the
//! interface to the remote translation service.

pub mod cache;
pub mod catalog;
pub mod fingerprint;
pub mod resolver;

use futures_util::future::BoxFuture;
use serde::Serialize;

pub use cache::{Lookup, LookupState, TranslationCache, TranslationEntry};
pub use fingerprint::{Fingerprint, TranslationKey};
pub use resolver::{ResolveContext, Resolver, ResponseHandler};

/// Remote method every lookup is sent to.
pub const TRANSLATE_METHOD: &str = "translate";

/// Arguments sent to the translation service for one lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranslateRequest {
    /// Log correlation only; not part of the lookup identity.
    #[serde(skip)]
    pub request_id: String,
    #[serde(rename = "t_id")]
    pub identifier: String,
    pub count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    /// Omitted under strict identifier mode.
    #[serde(rename = "default", skip_serializing_if = "Option::is_none")]
    pub default_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TranslateError {
    #[error("remote error: {0}")]
    Remote(String),
    #[error("no translation for identifier `{0}`")]
    UnknownIdentifier(String),
    #[error("translation service unavailable")]
    Unavailable,
}

/// Translation service adapter.
///
/// `translate` must resolve exactly once, with either text or an error.
/// The returned future is driven on the resolver's runtime, never by the
/// caller of `Resolver::resolve`.
pub trait RemoteTranslator: Send + Sync {
    fn translate(&self, request: TranslateRequest) -> BoxFuture<'static, Result<String, TranslateError>>;

    /// The active locale is not part of a request; services that need it are
    /// told when it changes.
    fn set_locale(&self, _locale: &str) {}
}
