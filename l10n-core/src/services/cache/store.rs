use std::{
    fs,
    path::{Path, PathBuf},
};

use chrono::Utc;
use tracing::{debug, info, warn};

use super::hash;
use super::model::{CacheFile, CacheStats, LoadStatus};
use crate::error::CacheError;
use crate::services::persist;

/// Persistent fingerprint -> translation store.
///
/// Entries are never edited in place: the first text stored for a
/// fingerprint wins, and a model version change drops every translation.
/// Source records are model independent and survive that reset. Writes go
/// to disk every `flush_every` changes and again when the handle is dropped.
#[derive(Debug)]
pub struct FingerprintCache {
    path: Option<PathBuf>,
    data: CacheFile,
    status: LoadStatus,
    flush_every: usize,
    pending: usize,
}

impl FingerprintCache {
    pub fn open(path: &Path, model_version: &str, flush_every: usize) -> Self {
        let (data, status) = match read_file(path) {
            Ok(None) => (empty(model_version), LoadStatus::Missing),
            Ok(Some(file)) if file.version != model_version => {
                warn!(
                    cached = %file.version,
                    current = %model_version,
                    "cache version mismatch, starting a fresh cache"
                );
                (
                    CacheFile {
                        sources: file.sources,
                        ..empty(model_version)
                    },
                    LoadStatus::VersionMismatch {
                        found: file.version,
                    },
                )
            }
            Ok(Some(file)) => {
                let entries = file.cache.len();
                info!(entries, path = %path.display(), "loaded translation cache");
                (file, LoadStatus::Loaded { entries })
            }
            Err(e) => {
                warn!("{e}; starting with an empty cache");
                let reason = match e {
                    CacheError::Corruption { reason, .. } => reason,
                    other => other.to_string(),
                };
                (empty(model_version), LoadStatus::Corrupt { reason })
            }
        };

        Self {
            path: Some(path.to_path_buf()),
            data,
            status,
            flush_every: flush_every.max(1),
            pending: 0,
        }
    }

    /// Cache that never touches disk; used when caching is switched off.
    pub fn in_memory(model_version: &str) -> Self {
        Self {
            path: None,
            data: empty(model_version),
            status: LoadStatus::Missing,
            flush_every: 1,
            pending: 0,
        }
    }

    pub fn load_status(&self) -> &LoadStatus {
        &self.status
    }

    pub fn fingerprint(&self, source: &str, reference: Option<&str>, locale: &str) -> String {
        hash::fingerprint(source, reference, locale, &self.data.version)
    }

    pub fn get(&self, fingerprint: &str) -> Option<&str> {
        self.data.cache.get(fingerprint).map(|s| s.as_str())
    }

    /// Stores `text` unless the fingerprint already has one, and returns the
    /// text that is now canonical for it.
    pub fn put(&mut self, fingerprint: &str, text: &str) -> String {
        if let Some(existing) = self.data.cache.get(fingerprint) {
            debug!(fingerprint, "cache already holds this fingerprint, keeping first");
            return existing.clone();
        }

        self.data
            .cache
            .insert(fingerprint.to_string(), text.to_string());
        self.data
            .created
            .insert(fingerprint.to_string(), Utc::now());
        self.mark_dirty();

        text.to_string()
    }

    pub fn source_record(&self, locale: &str, key: &str) -> Option<&str> {
        self.data
            .sources
            .get(locale)
            .and_then(|keys| keys.get(key))
            .map(|s| s.as_str())
    }

    pub fn record_source(&mut self, locale: &str, key: &str, source_fingerprint: &str) {
        let keys = self.data.sources.entry(locale.to_string()).or_default();
        if keys.get(key).map(|s| s.as_str()) == Some(source_fingerprint) {
            return;
        }
        keys.insert(key.to_string(), source_fingerprint.to_string());
        self.mark_dirty();
    }

    pub fn len(&self) -> usize {
        self.data.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.cache.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        let size = self
            .path
            .as_deref()
            .and_then(|p| fs::metadata(p).ok())
            .map(|m| m.len())
            .unwrap_or(0);

        CacheStats {
            count: self.data.cache.len(),
            size,
            model_version: self.data.version.clone(),
        }
    }

    pub fn flush(&mut self) -> Result<(), CacheError> {
        let Some(path) = self.path.as_deref() else {
            self.pending = 0;
            return Ok(());
        };

        let json = serde_json::to_string_pretty(&self.data).map_err(|e| {
            CacheError::Corruption {
                path: path.to_path_buf(),
                reason: e.to_string(),
            }
        })?;

        persist::write_atomic(path, json.as_bytes()).map_err(|source| CacheError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        self.pending = 0;
        Ok(())
    }

    fn mark_dirty(&mut self) {
        self.pending += 1;
        if self.pending >= self.flush_every {
            if let Err(e) = self.flush() {
                warn!("failed to persist cache: {e}");
            }
        }
    }
}

impl Drop for FingerprintCache {
    fn drop(&mut self) {
        if self.pending > 0 {
            if let Err(e) = self.flush() {
                warn!("failed to persist cache on shutdown: {e}");
            }
        }
    }
}

/// Reads stats straight from a cache file without a version check.
pub fn inspect(path: &Path) -> Result<CacheStats, CacheError> {
    let size = fs::metadata(path)
        .map_err(|source| CacheError::Io {
            path: path.to_path_buf(),
            source,
        })?
        .len();

    let file = read_file(path)?.unwrap_or_default();

    Ok(CacheStats {
        count: file.cache.len(),
        size,
        model_version: file.version,
    })
}

fn read_file(path: &Path) -> Result<Option<CacheFile>, CacheError> {
    if !path.exists() {
        return Ok(None);
    }

    let data = fs::read_to_string(path).map_err(|e| CacheError::Corruption {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    serde_json::from_str::<CacheFile>(&data)
        .map(Some)
        .map_err(|e| CacheError::Corruption {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

fn empty(model_version: &str) -> CacheFile {
    CacheFile {
        version: model_version.to_string(),
        ..CacheFile::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache_path(dir: &tempfile::TempDir) -> PathBuf {
        dir.path().join(".translation_cache.json")
    }

    #[test]
    fn test_put_is_persisted_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let path = cache_path(&dir);

        let mut cache = FingerprintCache::open(&path, "m:v1", 1);
        assert_eq!(cache.load_status(), &LoadStatus::Missing);
        let fp = cache.fingerprint("Save", None, "es");
        cache.put(&fp, "Guardar");

        // Simulate a crash: read the file while the handle is still alive.
        let stats = inspect(&path).unwrap();
        assert_eq!(stats.count, 1);
        assert_eq!(stats.model_version, "m:v1");
        drop(cache);

        let reopened = FingerprintCache::open(&path, "m:v1", 1);
        assert_eq!(reopened.get(&fp), Some("Guardar"));
        assert_eq!(reopened.load_status(), &LoadStatus::Loaded { entries: 1 });
    }

    #[test]
    fn test_first_writer_wins() {
        let mut cache = FingerprintCache::in_memory("m:v1");
        assert_eq!(cache.put("fp", "first"), "first");
        assert_eq!(cache.put("fp", "second"), "first");
        assert_eq!(cache.get("fp"), Some("first"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_model_version_change_drops_translations_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = cache_path(&dir);

        let fp_old;
        {
            let mut cache = FingerprintCache::open(&path, "old:v1", 1);
            fp_old = cache.fingerprint("Save", None, "es");
            cache.put(&fp_old, "Guardar");
            cache.record_source("es", "save", "abc");
        }

        let cache = FingerprintCache::open(&path, "new:v1", 1);
        assert_eq!(
            cache.load_status(),
            &LoadStatus::VersionMismatch {
                found: "old:v1".into()
            }
        );
        assert!(cache.is_empty());
        assert_eq!(cache.get(&fp_old), None);
        assert_eq!(cache.source_record("es", "save"), Some("abc"));
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = cache_path(&dir);
        fs::write(&path, "{ not json").unwrap();

        let cache = FingerprintCache::open(&path, "m:v1", 1);
        assert!(matches!(cache.load_status(), LoadStatus::Corrupt { .. }));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_batched_flush_writes_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = cache_path(&dir);

        {
            let mut cache = FingerprintCache::open(&path, "m:v1", 10);
            cache.put("a", "A");
            cache.put("b", "B");
            assert!(!path.exists());
        }

        assert_eq!(inspect(&path).unwrap().count, 2);
    }

    #[test]
    fn test_file_layout_exposes_version_and_cache() {
        let dir = tempfile::tempdir().unwrap();
        let path = cache_path(&dir);
        {
            let mut cache = FingerprintCache::open(&path, "m:v1", 1);
            cache.put("fp1", "uno");
        }

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["version"], "m:v1");
        assert_eq!(raw["cache"]["fp1"], "uno");
    }

    #[test]
    fn test_in_memory_cache_never_writes() {
        let mut cache = FingerprintCache::in_memory("m:v1");
        assert_eq!(cache.load_status(), &LoadStatus::Missing);
        cache.put("fp", "text");
        cache.record_source("es", "k", "abc");
        assert!(cache.flush().is_ok());
        assert_eq!(cache.stats().size, 0);
        assert_eq!(cache.get("fp"), Some("text"));
    }

    #[test]
    fn test_stats_report_size_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = cache_path(&dir);
        let mut cache = FingerprintCache::open(&path, "m:v1", 1);
        cache.put("fp", "text");
        let stats = cache.stats();
        assert_eq!(stats.count, 1);
        assert!(stats.size > 0);
    }
}
