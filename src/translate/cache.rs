//! Session-scoped translation cache and in-flight tracker.
//! Key: `Fingerprint` (see fingerprint.rs). Entries are write-once and never
//! evicted; a changed locale or parameter produces a new fingerprint instead.
//!
//! Per fingerprint: Unseen → InFlight → Resolved | Suppressed, or
//! Unseen → InFlight → Unseen when a failure is not remembered.

use std::collections::HashMap;

use parking_lot::Mutex;

use super::Fingerprint;

/// What the cache holds for a completed lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranslationEntry {
    Resolved {
        text: String,
        placeholder: Option<String>,
        count: Option<i64>,
    },
    /// Fetched, but nothing available. Never retried this session.
    Empty,
}

/// Lifecycle of a single fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LookupState {
    Unseen,
    InFlight,
    Resolved,
    Suppressed,
}

impl LookupState {
    pub fn can_transition_to(self, next: LookupState) -> bool {
        matches!(
            (self, next),
            (LookupState::Unseen, LookupState::InFlight)
                | (LookupState::InFlight, LookupState::Resolved)
                | (LookupState::InFlight, LookupState::Suppressed)
                // failure under strict identifier mode
                | (LookupState::InFlight, LookupState::Unseen)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, LookupState::Resolved | LookupState::Suppressed)
    }
}

/// Outcome of consulting the cache for a fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Hit(String),
    Suppressed,
    InFlight,
    /// No entry and nothing outstanding. The caller now owns the dispatch:
    /// the fingerprint has already been marked in flight.
    Claimed,
}

#[derive(Default)]
struct Maps {
    entries: HashMap<Fingerprint, TranslationEntry>,
    in_flight: HashMap<Fingerprint, bool>,
}

/// Both maps live behind one lock: the miss check and the in-flight claim
/// happen atomically, and so do clearing the flag and storing the result.
#[derive(Default)]
pub struct TranslationCache {
    inner: Mutex<Maps>,
}

impl TranslationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up `fp`, claiming it for dispatch when it is a clean miss.
    pub fn lookup_or_claim(&self, fp: &Fingerprint) -> Lookup {
        let mut maps = self.inner.lock();
        match maps.entries.get(fp) {
            Some(TranslationEntry::Resolved { text, .. }) => return Lookup::Hit(text.clone()),
            Some(TranslationEntry::Empty) => return Lookup::Suppressed,
            None => {}
        }
        let flag = maps.in_flight.entry(*fp).or_insert(false);
        if *flag {
            return Lookup::InFlight;
        }
        *flag = true;
        Lookup::Claimed
    }

    /// Read the entry for `fp` without touching in-flight state.
    pub fn get(&self, fp: &Fingerprint) -> Option<TranslationEntry> {
        self.inner.lock().entries.get(fp).cloned()
    }

    pub fn is_in_flight(&self, fp: &Fingerprint) -> bool {
        self.inner.lock().in_flight.get(fp).copied().unwrap_or(false)
    }

    pub fn state(&self, fp: &Fingerprint) -> LookupState {
        let maps = self.inner.lock();
        match maps.entries.get(fp) {
            Some(TranslationEntry::Resolved { .. }) => LookupState::Resolved,
            Some(TranslationEntry::Empty) => LookupState::Suppressed,
            None if maps.in_flight.get(fp).copied().unwrap_or(false) => LookupState::InFlight,
            None => LookupState::Unseen,
        }
    }

    /// Settle a dispatched lookup: clear its in-flight flag and store `entry`
    /// (if any) under the same lock, so no reader sees the fingerprint as
    /// neither in flight nor cached. An existing entry is kept as is.
    pub fn complete(&self, fp: &Fingerprint, entry: Option<TranslationEntry>) -> bool {
        let mut maps = self.inner.lock();
        maps.in_flight.insert(*fp, false);
        let Some(entry) = entry else {
            return false;
        };
        if maps.entries.contains_key(fp) {
            return false;
        }
        maps.entries.insert(*fp, entry);
        true
    }

    /// Number of stored entries, negative markers included.
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn in_flight_count(&self) -> usize {
        self.inner.lock().in_flight.values().filter(|v| **v).count()
    }
}
