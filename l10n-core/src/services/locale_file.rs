use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::error::{LoadError, WriteError};
use crate::model::mapping::LocaleMapping;
use crate::services::{encoding, persist};

/// Loads a locale JSON file. The file must exist.
pub fn load(path: &Path) -> Result<LocaleMapping, LoadError> {
    let bytes = fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let text = encoding::decode_utf8(&bytes).map_err(|detected| LoadError::NotUtf8 {
        path: path.to_path_buf(),
        detected,
    })?;

    let value: Value = serde_json::from_str(&text).map_err(|source| LoadError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    LocaleMapping::from_value(&value).ok_or_else(|| LoadError::NotAnObject {
        path: path.to_path_buf(),
    })
}

/// Like [`load`], but a missing file is an empty mapping.
pub fn load_optional(path: Option<&Path>) -> Result<LocaleMapping, LoadError> {
    match path {
        Some(p) if p.exists() => load(p),
        _ => Ok(LocaleMapping::new()),
    }
}

/// Pretty-printed, two-space indent, trailing newline.
pub fn save(path: &Path, mapping: &LocaleMapping) -> Result<(), WriteError> {
    let mut json =
        serde_json::to_string_pretty(&mapping.to_value()).map_err(|source| {
            WriteError::Serialize {
                path: path.to_path_buf(),
                source,
            }
        })?;
    json.push('\n');

    persist::write_atomic(path, json.as_bytes()).map_err(|source| WriteError::Io {
        path: path.to_path_buf(),
        source,
    })
}
