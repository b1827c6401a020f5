//! File-backed cache store
//!
//! Every key is one file `<dir>/<key>.json`. Updates go through a
//! temporary file and a rename so a reader sees either the old or the new
//! value, never a torn write.

use super::{check_entry_size, validate_key, KvStore};
use crate::error::{Error, Result};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::trace;

/// Directory-based key-value store
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
    /// Per-entry byte ceiling (0 = unlimited)
    max_entry_bytes: usize,
}

impl FileStore {
    /// Open (and create if needed) a store rooted at `dir`
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            max_entry_bytes: 0,
        })
    }

    /// Set the per-entry byte ceiling (0 = unlimited)
    pub fn with_max_entry_bytes(mut self, limit: usize) -> Self {
        self.max_entry_bytes = limit;
        self
    }

    /// Root directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl KvStore for FileStore {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::store(key, e.to_string())),
        }
    }

    fn update(&self, key: &str, value: String) -> Result<()> {
        let path = self.path_for(key)?;
        check_entry_size(key, &value, self.max_entry_bytes)?;

        let tmp = self
            .dir
            .join(format!(".{key}.{:016x}.tmp", rand::random::<u64>()));
        std::fs::write(&tmp, value.as_bytes()).map_err(|e| Error::store(key, e.to_string()))?;

        if let Err(e) = std::fs::rename(&tmp, &path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(Error::store(key, e.to_string()));
        }

        trace!(key, bytes = value.len(), "Wrote cache entry");
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::store(key, e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_on_disk() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(temp_dir.path().join("cache")).unwrap();

        assert_eq!(store.read("meta").unwrap(), None);
        store.update("meta", "{\"a\":1}".to_string()).unwrap();
        assert_eq!(store.read("meta").unwrap().as_deref(), Some("{\"a\":1}"));
        assert!(temp_dir.path().join("cache").join("meta.json").exists());

        store.delete("meta").unwrap();
        assert_eq!(store.read("meta").unwrap(), None);
        assert!(store.delete("meta").is_ok());
    }

    #[test]
    fn test_reopen_sees_previous_values() {
        let temp_dir = tempfile::tempdir().unwrap();
        FileStore::open(temp_dir.path())
            .unwrap()
            .update("k", "persisted".to_string())
            .unwrap();

        let reopened = FileStore::open(temp_dir.path()).unwrap();
        assert_eq!(reopened.read("k").unwrap().as_deref(), Some("persisted"));
    }

    #[test]
    fn test_rejects_path_keys() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(temp_dir.path()).unwrap();
        assert!(matches!(
            store.update("../outside", String::new()),
            Err(Error::InvalidKey(_))
        ));
        assert!(store.read("a/b").is_err());
    }

    #[test]
    fn test_entry_limit() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(temp_dir.path())
            .unwrap()
            .with_max_entry_bytes(4);
        assert!(store.update("k", "12345".to_string()).is_err());
        assert_eq!(store.read("k").unwrap(), None);
    }

    #[test]
    fn test_no_temp_files_left_behind() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(temp_dir.path()).unwrap();
        store.update("a", "1".to_string()).unwrap();
        store.update("a", "2".to_string()).unwrap();

        let names: Vec<String> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.json".to_string()]);
    }
}
