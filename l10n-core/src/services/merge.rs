use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, info};

use crate::error::WriteError;
use crate::model::mapping::LocaleMapping;
use crate::services::locale_file;

/// Builds the new destination mapping.
///
/// Keys follow the source order; keys only the destination knows are kept
/// and appended in their existing order. Translations win over existing
/// destination values. Source keys with neither are left out. The result
/// takes the source file's layout, including its non-text values.
pub fn merge(
    source: &LocaleMapping,
    destination: &LocaleMapping,
    translations: &HashMap<String, String>,
) -> LocaleMapping {
    let mut out = source.empty_like();

    for key in source.keys() {
        if let Some(text) = translations.get(key) {
            out.insert(key, text.as_str());
        } else if let Some(existing) = destination.get(key) {
            out.insert(key, existing);
        }
    }

    let mut orphans = 0usize;
    for key in destination.keys() {
        if !source.contains_key(key) && out.insert_from(destination, key) {
            orphans += 1;
        }
    }
    if orphans > 0 {
        debug!(orphans, "kept destination keys missing from the source");
    }

    out
}

pub fn write(path: &Path, mapping: &LocaleMapping) -> Result<(), WriteError> {
    locale_file::save(path, mapping)?;
    info!(keys = mapping.len(), path = %path.display(), "wrote destination");
    Ok(())
}
