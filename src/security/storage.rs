//! Checksummed, expiring key-value storage.
//!
//! Every value is stored as `{value, timestamp, checksum}`. A read that finds
//! a checksum mismatch, an expired record, or a record that no longer parses
//! deletes it and reports the key as absent.
//!
//! The checksum is an unkeyed SHA-256 of the value. It detects corruption and
//! casual edits; anyone with write access to the store can recompute it.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;

use crate::observability::metrics;
use crate::platform::{Clock, KeyValueStore, StorageError};

/// Key holding the bearer token.
pub const AUTH_TOKEN_KEY: &str = "auth_token";
/// Key holding the cached user profile.
pub const USER_DATA_KEY: &str = "user_data";

/// Maximum record age unless configured otherwise.
pub const DEFAULT_STORAGE_TTL: Duration = Duration::from_secs(24 * 3600);

/// The persisted form of a value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecureStorageEntry {
    pub value: String,
    /// Epoch milliseconds at write time.
    pub timestamp: u64,
    pub checksum: String,
}

pub fn checksum(value: &str) -> String {
    hex::encode(Sha256::digest(value.as_bytes()))
}

/// Integrity-checked view over a [`KeyValueStore`].
pub struct SecureStorage {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl SecureStorage {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self { store, clock, ttl }
    }

    pub fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let entry = SecureStorageEntry {
            value: value.to_string(),
            timestamp: self.clock.now_ms(),
            checksum: checksum(value),
        };
        self.store.set(key, serde_json::to_string(&entry)?)
    }

    pub fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let Some(raw) = self.store.get(key)? else {
            return Ok(None);
        };

        let entry: SecureStorageEntry = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(_) => return self.invalidate(key, "unparseable"),
        };

        if checksum(&entry.value) != entry.checksum {
            return self.invalidate(key, "checksum_mismatch");
        }

        let age_ms = self.clock.now_ms().saturating_sub(entry.timestamp);
        if age_ms > self.ttl.as_millis() as u64 {
            return self.invalidate(key, "expired");
        }

        Ok(Some(entry.value))
    }

    pub fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.store.remove(key)
    }

    pub fn clear(&self) -> Result<(), StorageError> {
        self.store.clear()
    }

    /// Drop the bearer token and cached profile together.
    pub fn clear_credentials(&self) -> Result<(), StorageError> {
        self.store.remove(AUTH_TOKEN_KEY)?;
        self.store.remove(USER_DATA_KEY)
    }

    fn invalidate(&self, key: &str, reason: &'static str) -> Result<Option<String>, StorageError> {
        tracing::warn!(key = %key, reason, "Discarding invalid storage record");
        metrics::record_storage_invalidated(reason);
        self.store.remove(key)?;
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{ManualClock, MemoryStore};

    fn storage() -> (SecureStorage, Arc<MemoryStore>, Arc<ManualClock>) {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let storage = SecureStorage::new(store.clone(), clock.clone(), DEFAULT_STORAGE_TTL);
        (storage, store, clock)
    }

    #[test]
    fn test_round_trip() {
        let (storage, _, _) = storage();
        storage.set_item("k", "value with ümlaut").unwrap();
        assert_eq!(storage.get_item("k").unwrap().as_deref(), Some("value with ümlaut"));
        assert!(storage.get_item("missing").unwrap().is_none());
    }

    #[test]
    fn test_tampered_value_is_deleted() {
        let (storage, store, _) = storage();
        storage.set_item("auth_token", "good").unwrap();

        let raw = store.get("auth_token").unwrap().unwrap();
        let mut entry: SecureStorageEntry = serde_json::from_str(&raw).unwrap();
        entry.value = "evil".into();
        store.set("auth_token", serde_json::to_string(&entry).unwrap()).unwrap();

        assert!(storage.get_item("auth_token").unwrap().is_none());
        assert!(store.get("auth_token").unwrap().is_none());
    }

    #[test]
    fn test_garbage_record_is_deleted() {
        let (storage, store, _) = storage();
        store.set("k", "{not json".into()).unwrap();
        assert!(storage.get_item("k").unwrap().is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_stale_record_is_absent() {
        let (storage, store, clock) = storage();
        storage.set_item("k", "v").unwrap();

        clock.advance(DEFAULT_STORAGE_TTL);
        assert_eq!(storage.get_item("k").unwrap().as_deref(), Some("v"));

        clock.advance(Duration::from_millis(1));
        assert!(storage.get_item("k").unwrap().is_none());
        assert!(store.get("k").unwrap().is_none());
    }

    #[test]
    fn test_clear_credentials() {
        let (storage, _, _) = storage();
        storage.set_item(AUTH_TOKEN_KEY, "t").unwrap();
        storage.set_item(USER_DATA_KEY, "{}").unwrap();
        storage.set_item("theme", "dark").unwrap();

        storage.clear_credentials().unwrap();
        assert!(storage.get_item(AUTH_TOKEN_KEY).unwrap().is_none());
        assert!(storage.get_item(USER_DATA_KEY).unwrap().is_none());
        assert_eq!(storage.get_item("theme").unwrap().as_deref(), Some("dark"));

        storage.clear().unwrap();
        assert!(storage.get_item("theme").unwrap().is_none());
    }

    #[test]
    fn test_checksum_is_stable() {
        assert_eq!(
            checksum("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
