use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;

/// Interpolation markers that must survive translation verbatim.
static TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"\{\{[^}]+\}\}",
        r"|\{[a-zA-Z0-9_]+\}",
        r"|%\d+\$s",
        r"|%s|%d|%f",
        r"|:[a-zA-Z_]\w*",
        r"|\$[A-Z_]+",
        r"|</?[0-9a-zA-Z]+[^>]*>",
        r"|\{[^{}]*,\s*(?:plural|select)[^{}]*\{[^{}]*\}[^{}]*\}",
    ))
    .expect("token regex")
});

static SENTINEL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"__PH_\d+__").expect("sentinel regex"));

const TOKEN_DIFF_LIMIT: usize = 5;

pub fn extract_tokens(text: &str) -> Vec<String> {
    TOKEN_RE
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Multiset of tokens: token -> occurrences.
pub fn token_counts(text: &str) -> BTreeMap<String, usize> {
    count(TOKEN_RE.find_iter(text).map(|m| m.as_str()))
}

pub fn count<'a>(tokens: impl IntoIterator<Item = &'a str>) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for t in tokens {
        *counts.entry(t.to_string()).or_insert(0) += 1;
    }
    counts
}

/// True if nothing but tokens and whitespace remain in a non-empty string.
pub fn is_pure_placeholder(text: &str) -> bool {
    !text.trim().is_empty() && strip_tokens(text).trim().is_empty()
}

pub fn strip_tokens(text: &str) -> String {
    TOKEN_RE.replace_all(text, "").into_owned()
}

/// Human-readable multiset difference, capped at a handful of entries.
pub fn diff_tokens(
    expected: &BTreeMap<String, usize>,
    actual: &BTreeMap<String, usize>,
) -> Vec<String> {
    let mut diffs = Vec::new();

    for (token, &n) in expected {
        let have = actual.get(token).copied().unwrap_or(0);
        if n > have {
            diffs.push(format!("missing {token} x{}", n - have));
        }
    }
    for (token, &n) in actual {
        let want = expected.get(token).copied().unwrap_or(0);
        if n > want {
            diffs.push(format!("unexpected {token} x{}", n - want));
        }
    }

    diffs.truncate(TOKEN_DIFF_LIMIT);
    diffs
}

/// Replaces tokens with opaque `__PH_n__` sentinels before a provider call.
///
/// One protector is shared by every text in a request, so the same token
/// gets the same sentinel in source, reference and draft.
#[derive(Debug, Clone, Default)]
pub struct Protector {
    tokens: Vec<String>,
}

impl Protector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn protect(&mut self, text: &str) -> String {
        TOKEN_RE
            .replace_all(text, |caps: &regex::Captures| {
                let token = &caps[0];
                let idx = match self.tokens.iter().position(|t| t == token) {
                    Some(i) => i,
                    None => {
                        self.tokens.push(token.to_string());
                        self.tokens.len() - 1
                    }
                };
                sentinel(idx)
            })
            .into_owned()
    }

    /// Restores tokens. Unknown sentinels are left as-is so validation
    /// reports them.
    pub fn unprotect(&self, text: &str) -> String {
        SENTINEL_RE
            .replace_all(text, |caps: &regex::Captures| {
                let s = &caps[0];
                s[4..s.len() - 2]
                    .parse::<usize>()
                    .ok()
                    .and_then(|i| self.tokens.get(i))
                    .cloned()
                    .unwrap_or_else(|| s.to_string())
            })
            .into_owned()
    }
}

fn sentinel(idx: usize) -> String {
    format!("__PH_{idx}__")
}
