use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Failures reading a locale file into a `LocaleMapping`.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not UTF-8 (looks like {detected})")]
    NotUtf8 { path: PathBuf, detected: String },

    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{path} must contain a JSON object at the root")]
    NotAnObject { path: PathBuf },
}

/// Destination could not be persisted. Fatal for the write step only.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("failed to serialize {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum CacheError {
    /// Unreadable or malformed cache file. Recovered by starting empty.
    #[error("cache file {path} is corrupt: {reason}")]
    Corruption { path: PathBuf, reason: String },

    #[error("cache file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Outcome of a single provider call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("provider error: {0}")]
    Provider(String),

    #[error("rate limited by provider")]
    RateLimited { retry_after: Option<Duration> },

    #[error("request timed out: {0}")]
    Timeout(String),

    /// Non-retryable: bad request, auth failure, unusable response.
    #[error("provider rejected the request: {0}")]
    Rejected(String),
}

impl ProviderError {
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ProviderError::Provider(_)
                | ProviderError::RateLimited { .. }
                | ProviderError::Timeout(_)
        )
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("environment variable {name} must be {expected}, got: {value}")]
    Env {
        name: &'static str,
        expected: &'static str,
        value: String,
    },

    #[error("{0}")]
    Invalid(String),
}

/// File-level failures. Any of these aborts the whole run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Write(#[from] WriteError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to read prompt context {path}: {reason}")]
    Context { path: PathBuf, reason: String },
}

pub type PipelineResult<T> = Result<T, PipelineError>;
