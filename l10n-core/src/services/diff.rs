use serde::Serialize;

use crate::model::mapping::LocaleMapping;
use crate::services::cache::{hash, FingerprintCache};

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum KeyState {
    /// Not in the destination, or present with an empty value.
    Missing,
    /// Translated, but the source text changed since.
    Stale,
    /// Translated and up to date.
    Present,
}

/// Per-key state of the source keys against a destination, in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyDiff {
    entries: Vec<(String, KeyState)>,
}

impl KeyDiff {
    pub fn missing(&self) -> Vec<&str> {
        self.with_state(KeyState::Missing)
    }

    pub fn stale(&self) -> Vec<&str> {
        self.with_state(KeyState::Stale)
    }

    pub fn present(&self) -> Vec<&str> {
        self.with_state(KeyState::Present)
    }

    pub fn state(&self, key: &str) -> Option<KeyState> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, s)| *s)
    }

    /// Keys to (re)translate, in source order.
    pub fn pending(&self, force: bool) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(_, s)| force || *s != KeyState::Present)
            .map(|(k, _)| k.as_str())
            .collect()
    }

    fn with_state(&self, state: KeyState) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(_, s)| *s == state)
            .map(|(k, _)| k.as_str())
            .collect()
    }
}

/// Classifies every source key.
///
/// Staleness comes from the source fingerprint the cache recorded when the
/// key was last merged; the destination only holds translated text, so it
/// cannot be compared with the source directly. A key with no record is
/// taken as up to date; the run then records its current source as the
/// baseline.
pub fn diff(
    source: &LocaleMapping,
    destination: &LocaleMapping,
    cache: &FingerprintCache,
    locale: &str,
) -> KeyDiff {
    let entries = source
        .iter()
        .map(|(key, text)| {
            let state = match destination.get(key) {
                None => KeyState::Missing,
                Some(v) if v.trim().is_empty() => KeyState::Missing,
                Some(_) => match cache.source_record(locale, key) {
                    Some(recorded) if recorded != hash::source_fingerprint(text) => {
                        KeyState::Stale
                    }
                    _ => KeyState::Present,
                },
            };
            (key.to_string(), state)
        })
        .collect();

    KeyDiff { entries }
}
