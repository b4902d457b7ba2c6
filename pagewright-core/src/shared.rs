use std::path::Path;

use log::{info, warn};
use serde_json::Value;

use crate::data::{DataMap, load_file};

/// Builds the shared context tree rooted at `root`.
///
/// Subdirectories become nested mappings keyed by directory name, data files
/// become leaf mappings keyed by file name without extension. A missing root
/// gives an empty context. Files that fail to load are left out.
pub fn load_shared<P: AsRef<Path>>(root: P) -> DataMap {
    let root = root.as_ref();
    info!("Loading shared from {}", root.display());

    if !root.is_dir() {
        info!("Shared path {} is not found, ignoring", root.display());
        return DataMap::new();
    }

    load_dir(root)
}

fn load_dir(dir: &Path) -> DataMap {
    let mut shared = DataMap::new();

    let mut entries: Vec<_> = match std::fs::read_dir(dir) {
        Ok(entries) => entries.filter_map(|e| e.ok()).collect(),
        Err(e) => {
            warn!("Error reading shared directory {}: {}", dir.display(), e);
            return shared;
        }
    };
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let path = entry.path();

        let (key, value) = if path.is_dir() {
            let key = entry.file_name().to_string_lossy().to_string();
            (key, load_dir(&path))
        } else {
            let Some(stem) = path.file_stem() else {
                continue;
            };
            match load_file(&path) {
                Ok(data) => (stem.to_string_lossy().to_string(), data),
                Err(e) => {
                    warn!("Skipping shared file {}: {}", path.display(), e);
                    continue;
                }
            }
        };

        if shared.insert(key.clone(), Value::Object(value)).is_some() {
            warn!(
                "Shared key '{}' in {} defined more than once, {} wins",
                key,
                dir.display(),
                path.display()
            );
        }
    }

    shared
}
