use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::model::validation::{ValidationFailure, ValidationWarning};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Provider,
    RateLimit,
    Timeout,
    Rejected,
    EmptyOutput,
    Echo,
    PlaceholderMismatch,
    Cancelled,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct KeyFailure {
    pub key: String,
    pub kind: FailureKind,
    pub message: String,
}

impl KeyFailure {
    pub fn provider(key: &str, err: &ProviderError) -> Self {
        let kind = match err {
            ProviderError::Provider(_) => FailureKind::Provider,
            ProviderError::RateLimited { .. } => FailureKind::RateLimit,
            ProviderError::Timeout(_) => FailureKind::Timeout,
            ProviderError::Rejected(_) => FailureKind::Rejected,
        };
        Self {
            key: key.to_string(),
            kind,
            message: err.to_string(),
        }
    }

    pub fn validation(key: &str, failure: &ValidationFailure) -> Self {
        let kind = match failure {
            ValidationFailure::Empty => FailureKind::EmptyOutput,
            ValidationFailure::Echo => FailureKind::Echo,
            ValidationFailure::PlaceholderMismatch { .. } => FailureKind::PlaceholderMismatch,
        };
        Self {
            key: key.to_string(),
            kind,
            message: failure.to_string(),
        }
    }

    pub fn cancelled(key: &str) -> Self {
        Self {
            key: key.to_string(),
            kind: FailureKind::Cancelled,
            message: "run interrupted before this key was translated".to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct KeyWarning {
    pub key: String,
    pub warning: ValidationWarning,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct RunReport {
    pub locale: String,
    /// Keys translated by a provider call during this run.
    pub translated: usize,
    pub cache_hits: usize,
    pub passthrough: usize,
    /// Keys already present in the destination and left alone.
    pub skipped: usize,
    pub provider_calls: usize,
    pub failed: Vec<KeyFailure>,
    pub warnings: Vec<KeyWarning>,
    /// Keys that fell back from dual to single reference mode.
    pub fallbacks: Vec<String>,
    pub cancelled: bool,
    pub written: bool,
}

impl RunReport {
    pub fn new(locale: &str) -> Self {
        Self {
            locale: locale.to_string(),
            ..Self::default()
        }
    }

    /// Keys merged into the destination this run.
    pub fn merged(&self) -> usize {
        self.translated + self.cache_hits + self.passthrough
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && !self.cancelled
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "locale {}:", self.locale)?;
        writeln!(
            f,
            "  succeeded: {} (translated {}, cached {}, copied {})",
            self.merged(),
            self.translated,
            self.cache_hits,
            self.passthrough
        )?;
        writeln!(f, "  skipped:   {}", self.skipped)?;
        writeln!(f, "  failed:    {}", self.failed.len())?;
        if !self.fallbacks.is_empty() {
            writeln!(f, "  single-reference fallbacks: {}", self.fallbacks.len())?;
        }
        for w in &self.warnings {
            writeln!(f, "  [warn] {}: {}", w.key, w.warning)?;
        }
        for e in &self.failed {
            writeln!(f, "  [fail] {}: {}", e.key, e.message)?;
        }
        if self.cancelled {
            writeln!(f, "  run was interrupted; rerun to finish the remaining keys")?;
        }
        if !self.written {
            writeln!(f, "  destination was not written")?;
        }
        Ok(())
    }
}
