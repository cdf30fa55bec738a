//! Tolerant JSON document persistence
//!
//! One file per store, full snapshot per write. Writes go through a temp
//! file and rename so a crash mid-write never leaves a partial document.
//! Corrupt files are backed up and replaced with an empty document on load.

use serde::{de::DeserializeOwned, Serialize};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tracing::warn;

use super::{StoreError, StoreResult};

/// Handle to a single JSON document on disk
pub struct JsonDocument<T> {
    path: PathBuf,
    _marker: PhantomData<T>,
}

impl<T> JsonDocument<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _marker: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the document, repairing a corrupt file in place
    ///
    /// Missing file yields the default value. A file that exists but fails
    /// to parse is copied to `<path>.backup-<millis>` and the store resets
    /// to empty; the failure is logged, never propagated.
    pub fn load(&self) -> T {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(_) => return T::default(),
        };

        if content.trim().is_empty() {
            return T::default();
        }

        match serde_json::from_str(&content) {
            Ok(value) => value,
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "store file is corrupt, backing up and resetting"
                );
                self.backup_corrupt();
                T::default()
            }
        }
    }

    /// Persist a full snapshot atomically (temp file + rename)
    pub fn save(&self, value: &T) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let content = serde_json::to_string_pretty(value)?;
        let temp_path = self.path.with_extension("tmp");
        std::fs::write(&temp_path, content)?;
        std::fs::rename(&temp_path, &self.path).map_err(StoreError::WriteFailure)?;
        Ok(())
    }

    fn backup_corrupt(&self) {
        let millis = chrono::Utc::now().timestamp_millis();
        let backup = self.path.with_extension(format!("backup-{millis}"));
        if let Err(e) = std::fs::copy(&self.path, &backup) {
            warn!(
                path = %self.path.display(),
                error = %e,
                "failed to back up corrupt store file"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_loads_default() {
        let dir = tempdir().unwrap();
        let doc: JsonDocument<Vec<String>> = JsonDocument::new(dir.path().join("missing.json"));

        assert!(doc.load().is_empty());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempdir().unwrap();
        let doc: JsonDocument<Vec<String>> = JsonDocument::new(dir.path().join("list.json"));

        doc.save(&vec!["a".to_string(), "b".to_string()]).unwrap();
        assert_eq!(doc.load(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_save_creates_parent_directories() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("data").join("stores").join("doc.json");
        let doc: JsonDocument<Vec<u32>> = JsonDocument::new(&nested);

        doc.save(&vec![1, 2, 3]).unwrap();
        assert!(nested.exists());
    }

    #[test]
    fn test_corrupt_file_backed_up_and_reset() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "{not valid json").unwrap();

        let doc: JsonDocument<HashMap<String, u32>> = JsonDocument::new(&path);
        assert!(doc.load().is_empty());

        // Original bytes survive in a backup next to the store
        let backups: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.file_name()
                    .to_string_lossy()
                    .starts_with("store.backup-")
            })
            .collect();
        assert_eq!(backups.len(), 1);
    }

    #[test]
    fn test_empty_file_loads_default_without_backup() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "  \n").unwrap();

        let doc: JsonDocument<Vec<u32>> = JsonDocument::new(&path);
        assert!(doc.load().is_empty());
    }

    #[test]
    fn test_no_temp_file_left_behind() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        let doc: JsonDocument<Vec<u32>> = JsonDocument::new(&path);

        doc.save(&vec![7]).unwrap();
        assert!(!path.with_extension("tmp").exists());
    }
}
