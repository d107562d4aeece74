// src/hash_cache.rs

//! Persistent map from repository path to the last synced remote object id.
//!
//! The remote id is content-derived, so an unchanged id means unchanged content
//! on the remote side. Local content is never re-hashed: a file edited locally
//! keeps its cached id and is not re-downloaded until the remote changes it or
//! the cache is cleared.

use crate::constants::{HASH_CACHE_FILE_NAME, STATE_DIR_NAME};
use crate::errors::{io_error_with_path, Error, Result};
use crate::security::resolve_safe_path;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// The side-file `<root>/.synccache/file_hashes.json`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashCache {
    root: PathBuf,
    file: PathBuf,
    entries: BTreeMap<String, String>,
}

impl HashCache {
    /// Location of the side-file for `root`.
    pub fn cache_file(root: &Path) -> PathBuf {
        root.join(STATE_DIR_NAME).join(HASH_CACHE_FILE_NAME)
    }

    /// Loads the cache for `root`. A missing file is an empty cache; an
    /// unreadable or corrupt file is logged and also treated as empty.
    pub fn load(root: &Path) -> Self {
        let file = Self::cache_file(root);
        let entries = match fs::read_to_string(&file) {
            Ok(text) => match serde_json::from_str::<BTreeMap<String, String>>(&text) {
                Ok(map) => map,
                Err(e) => {
                    log::warn!("Failed to load hash cache {}: {}", file.display(), e);
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                log::warn!("Failed to load hash cache {}: {}", file.display(), e);
                BTreeMap::new()
            }
        };
        log::debug!("Loaded {} cached ids from {}", entries.len(), file.display());
        Self {
            root: root.to_path_buf(),
            file,
            entries,
        }
    }

    /// True if `path` must be downloaded: the local file is missing, nothing is
    /// cached for it, or the cached id differs from `remote_id`.
    ///
    /// Only remote ids are compared; a local edit that keeps the file in place
    /// goes unnoticed until the cache is cleared.
    pub fn should_fetch(&self, path: &str, remote_id: &str) -> bool {
        let exists = resolve_safe_path(&self.root, path)
            .map(|p| p.is_file())
            .unwrap_or(false);
        if !exists {
            return true;
        }
        self.entries.get(path).map(String::as_str) != Some(remote_id)
    }

    /// Remembers that `path` now holds `remote_id`.
    pub fn record(&mut self, path: &str, remote_id: &str) {
        self.entries.insert(path.to_string(), remote_id.to_string());
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.entries.get(path).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &BTreeMap<String, String> {
        &self.entries
    }

    /// Writes the whole map to the side-file, replacing it atomically.
    pub fn save(&self) -> Result<()> {
        let dir = self
            .file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.root.clone());
        fs::create_dir_all(&dir).map_err(|e| io_error_with_path(e, &dir))?;

        let json = serde_json::to_string_pretty(&self.entries).map_err(|source| Error::Json {
            context: "hash cache".to_string(),
            source,
        })?;
        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(|e| io_error_with_path(e, &dir))?;
        tmp.write_all(json.as_bytes())
            .map_err(|e| io_error_with_path(e, tmp.path()))?;
        tmp.persist(&self.file)
            .map_err(|e| io_error_with_path(e.error, &self.file))?;
        log::debug!("Saved {} cached ids to {}", self.entries.len(), self.file.display());
        Ok(())
    }

    /// Forgets every entry and removes the side-file. Returns how many entries
    /// were dropped.
    pub fn clear(&mut self) -> Result<usize> {
        let count = self.entries.len();
        self.entries.clear();
        match fs::remove_file(&self.file) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(io_error_with_path(e, &self.file)),
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_cache_is_empty() {
        let root = tempdir().unwrap();
        let cache = HashCache::load(root.path());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_should_fetch_rules() {
        let root = tempdir().unwrap();
        let mut cache = HashCache::load(root.path());

        // not cached, not on disk
        assert!(cache.should_fetch("a.txt", "id1"));

        fs::write(root.path().join("a.txt"), "a").unwrap();
        // on disk but not cached
        assert!(cache.should_fetch("a.txt", "id1"));

        cache.record("a.txt", "id1");
        assert!(!cache.should_fetch("a.txt", "id1"));
        assert!(!cache.should_fetch("a.txt", "id1"));
        assert!(cache.should_fetch("a.txt", "id2"));

        fs::remove_file(root.path().join("a.txt")).unwrap();
        assert!(cache.should_fetch("a.txt", "id1"));
    }

    #[test]
    fn test_unsafe_path_always_fetches() {
        let root = tempdir().unwrap();
        let mut cache = HashCache::load(root.path());
        cache.record("../x", "id");
        assert!(cache.should_fetch("../x", "id"));
    }

    #[test]
    fn test_save_and_reload_round_trip() {
        let root = tempdir().unwrap();
        let mut cache = HashCache::load(root.path());
        cache.record("src/lib.rs", "abc");
        cache.record("README.md", "def");
        cache.save().unwrap();

        let reloaded = HashCache::load(root.path());
        assert_eq!(reloaded.entries(), cache.entries());

        let text = fs::read_to_string(HashCache::cache_file(root.path())).unwrap();
        assert!(text.contains("\n  \"README.md\": \"def\""));
    }

    #[test]
    fn test_corrupt_cache_is_treated_as_empty() {
        let root = tempdir().unwrap();
        let file = HashCache::cache_file(root.path());
        fs::create_dir_all(file.parent().unwrap()).unwrap();
        fs::write(&file, "{ not json").unwrap();
        assert!(HashCache::load(root.path()).is_empty());
    }

    #[test]
    fn test_clear_removes_side_file() {
        let root = tempdir().unwrap();
        let mut cache = HashCache::load(root.path());
        cache.record("a", "1");
        cache.save().unwrap();
        assert!(HashCache::cache_file(root.path()).exists());

        assert_eq!(cache.clear().unwrap(), 1);
        assert!(!HashCache::cache_file(root.path()).exists());
        assert_eq!(cache.clear().unwrap(), 0);
        assert!(HashCache::load(root.path()).is_empty());
    }
}
