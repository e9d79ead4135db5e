use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// On-disk layout of the cache file.
///
/// `version` and `cache` are read by external tooling for statistics; the
/// other sections are optional so older files still load.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct CacheFile {
    pub version: String,

    #[serde(default)]
    pub cache: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub created: BTreeMap<String, DateTime<Utc>>,

    /// locale -> key -> source fingerprint at the time the key was merged.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub sources: BTreeMap<String, BTreeMap<String, String>>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub count: usize,
    /// Bytes on disk; zero if never written.
    pub size: u64,
    pub model_version: String,
}

/// What happened when the cache file was opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    Missing,
    Loaded { entries: usize },
    VersionMismatch { found: String },
    Corrupt { reason: String },
}
