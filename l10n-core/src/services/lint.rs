use serde::{Deserialize, Serialize};

use crate::model::mapping::LocaleMapping;
use crate::model::unit::Intent;
use crate::services::{intent, placeholder};

const CTA_MAX_WORDS: usize = 4;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Fail,
    Warn,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct LintIssue {
    pub key: String,
    pub code: String,
    pub severity: Severity,
    pub message: String,
}

impl LintIssue {
    fn fail(key: &str, code: &str, message: impl Into<String>) -> Self {
        Self {
            key: key.to_string(),
            code: code.to_string(),
            severity: Severity::Fail,
            message: message.into(),
        }
    }

    fn warn(key: &str, code: &str, message: impl Into<String>) -> Self {
        Self {
            key: key.to_string(),
            code: code.to_string(),
            severity: Severity::Warn,
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct LintReport {
    pub issues: Vec<LintIssue>,
}

impl LintReport {
    pub fn ok(&self) -> bool {
        !self.issues.iter().any(|i| i.severity == Severity::Fail)
    }

    pub fn failures(&self) -> usize {
        self.count(Severity::Fail)
    }

    pub fn warnings(&self) -> usize {
        self.count(Severity::Warn)
    }

    fn count(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }
}

/// Post-hoc check of a whole destination file against its source.
pub fn lint(source: &LocaleMapping, destination: &LocaleMapping) -> LintReport {
    let mut issues = check_keys(source, destination);
    issues.extend(check_tokens(source, destination));
    issues.extend(check_intent_style(destination));
    LintReport { issues }
}

pub fn check_keys(source: &LocaleMapping, destination: &LocaleMapping) -> Vec<LintIssue> {
    let mut issues: Vec<LintIssue> = source
        .keys()
        .filter(|k| !destination.contains_key(k))
        .map(|k| LintIssue::fail(k, "MISSING_KEY", "key missing from destination"))
        .collect();

    issues.extend(
        destination
            .keys()
            .filter(|k| !source.contains_key(k))
            .map(|k| LintIssue::fail(k, "EXTRA_KEY", "key not present in source")),
    );

    issues
}

pub fn check_tokens(source: &LocaleMapping, destination: &LocaleMapping) -> Vec<LintIssue> {
    source
        .iter()
        .filter_map(|(key, src)| {
            let dst = destination.get(key)?;
            let diffs = placeholder::diff_tokens(
                &placeholder::token_counts(src),
                &placeholder::token_counts(dst),
            );
            (!diffs.is_empty()).then(|| {
                LintIssue::fail(
                    key,
                    "PLACEHOLDER_MISMATCH",
                    format!("placeholder mismatch ({})", diffs.join(", ")),
                )
            })
        })
        .collect()
}

pub fn check_intent_style(destination: &LocaleMapping) -> Vec<LintIssue> {
    let mut issues = Vec::new();

    for (key, text) in destination.iter() {
        let text = text.trim();
        if text.is_empty() {
            continue;
        }

        match intent::infer(key) {
            Intent::Button => {
                let words = text.split_whitespace().count();
                if words > CTA_MAX_WORDS {
                    issues.push(LintIssue::warn(
                        key,
                        "CTA_TOO_LONG",
                        format!("call to action has {words} words (max {CTA_MAX_WORDS})"),
                    ));
                }
                if text.ends_with(['.', '?', ';', ',']) {
                    issues.push(LintIssue::warn(
                        key,
                        "CTA_PUNCTUATION",
                        "call to action ends with punctuation",
                    ));
                }
            }
            Intent::Title => {
                if text.chars().next().is_some_and(char::is_lowercase) {
                    issues.push(LintIssue::warn(
                        key,
                        "TITLE_LOWERCASE",
                        "title starts with a lowercase letter",
                    ));
                }
                if text.ends_with(['.', '!', '?']) {
                    issues.push(LintIssue::warn(
                        key,
                        "TITLE_PUNCTUATION",
                        "title ends with punctuation",
                    ));
                }
            }
            Intent::Error => {
                if text.ends_with('!') {
                    issues.push(LintIssue::warn(
                        key,
                        "ERROR_EXCLAMATION",
                        "error message ends with '!'",
                    ));
                }
            }
            _ => {}
        }
    }

    issues
}
