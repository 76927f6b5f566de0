//! Raw key-value persistence.
//!
//! Stores hold opaque strings; integrity wrapping lives one level up in
//! [`SecureStorage`](crate::security::storage::SecureStorage).

use dashmap::DashMap;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;

use crate::observability::metrics;

/// Errors raised by a storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// A string-to-string store with `localStorage`-like semantics.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: String) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
    fn clear(&self) -> Result<(), StorageError>;
}

/// Process-local store. Contents vanish with the process.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<DashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.inner.get(key).map(|r| r.value().clone()))
    }

    fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        self.inner.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.inner.remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        self.inner.clear();
        Ok(())
    }
}

/// Store persisted as a single JSON object on disk.
///
/// Every mutation rewrites the file through a temp file and rename, which is
/// fine for the handful of keys a client keeps (tokens, cached profile). An
/// unreadable file is discarded on open and the store starts empty. On Unix
/// the file is created with mode 0600.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    inner: DashMap<String, String>,
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Open the store at `path`, loading existing contents if the file exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let inner = DashMap::new();
        if path.exists() {
            let reader = BufReader::new(File::open(&path)?);
            match serde_json::from_reader::<_, HashMap<String, String>>(reader) {
                Ok(map) => {
                    for (k, v) in map {
                        inner.insert(k, v);
                    }
                    tracing::debug!(path = ?path, entries = inner.len(), "Loaded storage file");
                }
                Err(e) => {
                    tracing::warn!(path = ?path, error = %e, "Discarding unreadable storage file");
                    metrics::record_storage_invalidated("corrupt_file");
                }
            }
        }
        Ok(Self {
            path,
            inner,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }

    fn persist(&self) -> Result<(), StorageError> {
        // The guard protects no data, so a poisoned lock is still usable.
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let map: HashMap<_, _> = self
            .inner
            .iter()
            .map(|r| (r.key().clone(), r.value().clone()))
            .collect();

        let temp_path = self.temp_path();
        let mut writer = BufWriter::new(create_private(&temp_path)?);
        serde_json::to_writer(&mut writer, &map)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
        drop(writer);

        std::fs::rename(&temp_path, &self.path)?;
        Ok(())
    }
}

fn create_private(path: &Path) -> std::io::Result<File> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options.open(path)
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.inner.get(key).map(|r| r.value().clone()))
    }

    fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        self.inner.insert(key.to_string(), value);
        self.persist()
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        if self.inner.remove(key).is_some() {
            self.persist()?;
        }
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        self.inner.clear();
        self.persist()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_operations() {
        let store = MemoryStore::new();
        assert!(store.get("a").unwrap().is_none());

        store.set("a", "1".into()).unwrap();
        store.set("b", "2".into()).unwrap();
        assert_eq!(store.get("a").unwrap().as_deref(), Some("1"));
        assert_eq!(store.len(), 2);

        store.remove("a").unwrap();
        assert!(store.get("a").unwrap().is_none());

        store.clear().unwrap();
        assert!(store.is_empty());
    }

    fn temp_store_path(prefix: &str) -> PathBuf {
        std::env::temp_dir().join(format!("{prefix}_{}.json", uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_file_store_persistence() {
        let path = temp_store_path("secure_client_store");

        let store = FileStore::open(&path).unwrap();
        assert_eq!(store.path(), path.as_path());
        store.set("auth_token", "abc".into()).unwrap();
        store.set("other", "x".into()).unwrap();
        store.remove("other").unwrap();
        assert!(!store.temp_path().exists());

        // Load new instance
        let loaded = FileStore::open(&path).unwrap();
        assert_eq!(loaded.get("auth_token").unwrap().as_deref(), Some("abc"));
        assert!(loaded.get("other").unwrap().is_none());

        loaded.clear().unwrap();
        let reloaded = FileStore::open(&path).unwrap();
        assert!(reloaded.get("auth_token").unwrap().is_none());

        std::fs::remove_file(&path).unwrap_or_default();
    }

    #[test]
    fn test_file_store_discards_corrupt_file() {
        let path = temp_store_path("secure_client_corrupt");
        std::fs::write(&path, r#"{"auth_token":"{\"value\":\"ab"#).unwrap();

        let store = FileStore::open(&path).unwrap();
        assert!(store.get("auth_token").unwrap().is_none());

        store.set("auth_token", "fresh".into()).unwrap();
        let reloaded = FileStore::open(&path).unwrap();
        assert_eq!(reloaded.get("auth_token").unwrap().as_deref(), Some("fresh"));

        std::fs::remove_file(&path).unwrap_or_default();
    }

    #[cfg(unix)]
    #[test]
    fn test_file_store_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let path = temp_store_path("secure_client_mode");
        let store = FileStore::open(&path).unwrap();
        store.set("auth_token", "abc".into()).unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);

        std::fs::remove_file(&path).unwrap_or_default();
    }
}
