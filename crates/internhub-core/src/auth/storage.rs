//! String key/value backends for the credential record.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};

use keyring::Entry;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Credentials file name in cache directory
const CREDENTIALS_FILE: &str = "credentials.json";

/// Service name for OS keychain entries
const KEYRING_SERVICE: &str = "internhub";

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Keychain error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("Corrupt storage file: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Durable string-only key/value storage.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Which backend holds the credential record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    #[default]
    File,
    Keyring,
    Memory,
    /// No durable storage, as in a headless or server-side context.
    None,
}

impl FromStr for StorageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "file" => Ok(StorageKind::File),
            "keyring" => Ok(StorageKind::Keyring),
            "memory" => Ok(StorageKind::Memory),
            "none" => Ok(StorageKind::None),
            other => Err(format!("Unknown storage kind: {}", other)),
        }
    }
}

impl StorageKind {
    /// Open the backend for this kind. `None` means storage is unavailable.
    /// Only the file backend needs `cache_dir`.
    pub fn open(self, cache_dir: Option<&Path>) -> Option<Box<dyn KeyValueStore>> {
        match self {
            StorageKind::File => match cache_dir {
                Some(dir) => Some(Box::new(FileStore::new(dir.join(CREDENTIALS_FILE)))),
                None => {
                    warn!("No cache directory, credentials will not persist");
                    None
                }
            },
            StorageKind::Keyring => Some(Box::new(KeyringStore::new(KEYRING_SERVICE))),
            StorageKind::Memory => Some(Box::new(MemoryStore::new())),
            StorageKind::None => None,
        }
    }
}

// ============================================================================
// Memory
// ============================================================================

/// Process-local storage. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.lock().remove(key);
        Ok(())
    }
}

// ============================================================================
// File
// ============================================================================

/// All entries in one JSON object on disk.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn load(&self) -> Result<HashMap<String, String>, StorageError> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let contents = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    fn save(&self, entries: &HashMap<String, String>) -> Result<(), StorageError> {
        if entries.is_empty() {
            if self.path.exists() {
                std::fs::remove_file(&self.path)?;
            }
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, contents)?;
        Ok(())
    }

    /// Load, falling back to an empty map when the file cannot be parsed so
    /// that a write can replace a corrupt file.
    fn load_or_reset(&self) -> Result<HashMap<String, String>, StorageError> {
        match self.load() {
            Ok(entries) => Ok(entries),
            Err(StorageError::Serialization(e)) => {
                warn!(path = ?self.path, error = %e, "Discarding corrupt credentials file");
                Ok(HashMap::new())
            }
            Err(e) => Err(e),
        }
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.load_or_reset()?;
        entries.insert(key.to_string(), value.to_string());
        self.save(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.load_or_reset()?;
        if entries.remove(key).is_some() || entries.is_empty() {
            self.save(&entries)?;
        }
        Ok(())
    }
}

// ============================================================================
// Keyring
// ============================================================================

/// One OS keychain entry per key.
#[derive(Debug, Clone)]
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    pub fn new(service: &str) -> Self {
        Self {
            service: service.to_string(),
        }
    }

    fn entry(&self, key: &str) -> Result<Entry, StorageError> {
        Ok(Entry::new(&self.service, key)?)
    }
}

impl KeyValueStore for KeyringStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entry(key)?.set_password(value)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_kind_from_str() {
        assert_eq!("file".parse::<StorageKind>(), Ok(StorageKind::File));
        assert_eq!(" Keyring ".parse::<StorageKind>(), Ok(StorageKind::Keyring));
        assert_eq!("MEMORY".parse::<StorageKind>(), Ok(StorageKind::Memory));
        assert_eq!("none".parse::<StorageKind>(), Ok(StorageKind::None));
        assert!("localstorage".parse::<StorageKind>().is_err());
    }

    #[test]
    fn test_storage_kind_none_is_unavailable() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(StorageKind::None.open(Some(dir.path())).is_none());
        assert!(StorageKind::Memory.open(Some(dir.path())).is_some());
        assert!(StorageKind::File.open(Some(dir.path())).is_some());
    }

    #[test]
    fn test_only_file_storage_needs_cache_dir() {
        assert!(StorageKind::File.open(None).is_none());
        assert!(StorageKind::Memory.open(None).is_some());
        assert!(StorageKind::Keyring.open(None).is_some());
    }

    #[test]
    fn test_memory_store_clones_share_entries() {
        let store = MemoryStore::new();
        let other = store.clone();
        store.set("token", "abc").expect("set");
        assert_eq!(other.get("token").expect("get"), Some("abc".to_string()));
        other.remove("token").expect("remove");
        assert!(store.is_empty());
    }

    #[test]
    fn test_file_store_roundtrip_and_cleanup() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join(CREDENTIALS_FILE);
        let store = FileStore::new(path.clone());

        assert_eq!(store.get("token").expect("get"), None);

        store.set("token", "abc").expect("set token");
        store.set("user", "{}").expect("set user");
        assert_eq!(store.get("token").expect("get"), Some("abc".to_string()));
        assert!(path.exists());

        store.remove("token").expect("remove token");
        assert!(path.exists());
        store.remove("user").expect("remove user");
        assert!(!path.exists());

        // Removing from an absent file is fine
        store.remove("user").expect("remove again");
    }

    #[test]
    fn test_file_store_corrupt_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CREDENTIALS_FILE);
        std::fs::write(&path, "not json").expect("write garbage");
        let store = FileStore::new(path);

        assert!(matches!(store.get("token"), Err(StorageError::Serialization(_))));

        store.set("token", "fresh").expect("overwrite corrupt file");
        assert_eq!(store.get("token").expect("get"), Some("fresh".to_string()));
    }
}
