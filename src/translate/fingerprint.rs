//! Cache key derivation for translation lookups.
//! Key: blake3 hash of (identifier | placeholder | count | locale), with
//! optional fields tagged so `None` never collides with an empty value.

use std::fmt;

/// One logical lookup: what to translate, how it is parameterised, and for
/// which locale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationKey {
    pub identifier: String,
    pub placeholder: Option<String>,
    pub count: Option<i64>,
    pub locale: String,
}

impl TranslationKey {
    pub fn new(
        identifier: impl Into<String>,
        placeholder: Option<String>,
        count: Option<i64>,
        locale: impl Into<String>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            placeholder,
            count,
            locale: locale.into(),
        }
    }

    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of(self)
    }
}

/// Sole identity of a lookup in the cache and in-flight maps.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint(blake3::Hash);

impl Fingerprint {
    pub fn of(key: &TranslationKey) -> Self {
        let mut hasher = blake3::Hasher::new();
        write_str(&mut hasher, &key.identifier);
        hasher.update(b"|");
        match &key.placeholder {
            Some(p) => {
                hasher.update(&[1]);
                write_str(&mut hasher, p);
            }
            None => {
                hasher.update(&[0]);
            }
        }
        hasher.update(b"|");
        match key.count {
            Some(n) => {
                hasher.update(&[1]);
                hasher.update(&n.to_le_bytes());
            }
            None => {
                hasher.update(&[0]);
            }
        }
        hasher.update(b"|");
        write_str(&mut hasher, &key.locale);
        Self(hasher.finalize())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_bytes()
    }
}

// Length prefix keeps "a|b" + "c" distinct from "a" + "b|c".
fn write_str(hasher: &mut blake3::Hasher, s: &str) {
    hasher.update(&(s.len() as u64).to_le_bytes());
    hasher.update(s.as_bytes());
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // 16 hex chars is plenty for log correlation.
        let hex = self.0.to_hex();
        f.write_str(&hex[..16])
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn base() -> TranslationKey {
        TranslationKey::new("ui.hello", Some("name".into()), Some(2), "en")
    }

    #[test]
    fn identical_fields_give_identical_fingerprints() {
        assert_eq!(base().fingerprint(), base().fingerprint());
    }

    #[rstest]
    #[case::identifier(TranslationKey { identifier: "ui.bye".into(), ..base() })]
    #[case::placeholder(TranslationKey { placeholder: Some("other".into()), ..base() })]
    #[case::placeholder_absent(TranslationKey { placeholder: None, ..base() })]
    #[case::count(TranslationKey { count: Some(3), ..base() })]
    #[case::count_absent(TranslationKey { count: None, ..base() })]
    #[case::locale(TranslationKey { locale: "fr".into(), ..base() })]
    fn any_changed_field_changes_fingerprint(#[case] changed: TranslationKey) {
        assert_ne!(base().fingerprint(), changed.fingerprint());
    }

    #[test]
    fn empty_placeholder_is_not_absent_placeholder() {
        let empty = TranslationKey::new("ui.x", Some(String::new()), None, "en");
        let absent = TranslationKey::new("ui.x", None, None, "en");
        assert_ne!(empty.fingerprint(), absent.fingerprint());
    }

    #[test]
    fn field_boundaries_do_not_shift() {
        let a = TranslationKey::new("a|b", None, None, "c");
        let b = TranslationKey::new("a", None, None, "b|c");
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn display_is_short_hex() {
        let shown = base().fingerprint().to_string();
        assert_eq!(shown.len(), 16);
        assert!(shown.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
