//! File-backed store.
//!
//! All keys live in a single JSON object at `<state_dir>/state.json`. Every
//! write rewrites the document through a temporary file and an atomic rename,
//! so a crash mid-write leaves the previous document intact.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use super::{KeyValueStore, StorageError};

const STATE_FILE: &str = "state.json";

/// A store persisted as one JSON document on disk.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    /// Open (or create) the store inside `dir`.
    ///
    /// A document that cannot be parsed is logged and treated as empty; it is
    /// replaced on the next write.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the existing
    /// document cannot be read.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(|source| StorageError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let path = dir.join(STATE_FILE);
        let entries = match fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "Discarding unreadable state file");
                BTreeMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(StorageError::Io { path, source }),
        };

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// Path of the backing document.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let text = serde_json::to_string_pretty(entries).map_err(|source| {
            StorageError::Serialize {
                key: STATE_FILE,
                source,
            }
        })?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, text).map_err(|source| StorageError::Io {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &self.path).map_err(|source| StorageError::Io {
            path: self.path.clone(),
            source,
        })
    }

    fn update(
        &self,
        apply: impl FnOnce(&mut BTreeMap<String, String>),
    ) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let mut next = entries.clone();
        apply(&mut next);
        self.write(&next)?;
        *entries = next;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.update(|entries| {
            entries.insert(key.to_owned(), value.to_owned());
        })
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        if self.get(key).is_none() {
            return Ok(());
        }
        self.update(|entries| {
            entries.remove(key);
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("ecomm-store-{}", uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_values_survive_reopen() {
        let dir = temp_dir();
        {
            let store = FileStore::open(&dir).unwrap();
            store.set("auth_token", "abc").unwrap();
            store.set("cart", "[]").unwrap();
            store.remove("cart").unwrap();
        }

        let store = FileStore::open(&dir).unwrap();
        assert_eq!(store.get("auth_token").as_deref(), Some("abc"));
        assert_eq!(store.get("cart"), None);

        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_corrupt_document_opens_empty() {
        let dir = temp_dir();
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(STATE_FILE), "{not json").unwrap();

        let store = FileStore::open(&dir).unwrap();
        assert_eq!(store.get("auth_token"), None);

        store.set("auth_token", "fresh").unwrap();
        let reopened = FileStore::open(&dir).unwrap();
        assert_eq!(reopened.get("auth_token").as_deref(), Some("fresh"));

        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_remove_absent_key_is_ok() {
        let dir = temp_dir();
        let store = FileStore::open(&dir).unwrap();
        assert!(store.remove("missing").is_ok());
        fs::remove_dir_all(dir).ok();
    }
}
