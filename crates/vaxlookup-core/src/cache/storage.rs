//! Persistence backends for the vaccine detail cache.
//!
//! The cache persists a handful of named string slots. `FileStorage` keeps
//! each slot in its own JSON file under the cache directory; `MemoryStorage`
//! keeps them in a map and is what tests inject. Both can enforce a byte
//! quota, mirroring the limited storage a browser gives a page.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tracing::debug;

use super::CacheError;

/// Keyed string slots that survive process restarts.
pub trait CacheStorage: Send + Sync {
    /// Read a slot. A missing slot is `Ok(None)`.
    fn read(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Create or replace a slot.
    fn write(&self, key: &str, value: &str) -> Result<(), CacheError>;

    /// Remove a slot. Removing a missing slot succeeds.
    fn remove(&self, key: &str) -> Result<(), CacheError>;
}

fn check_quota(quota: Option<u64>, needed: u64) -> Result<(), CacheError> {
    match quota {
        Some(quota) if needed > quota => Err(CacheError::QuotaExceeded { needed, quota }),
        _ => Ok(()),
    }
}

/// One file per slot: `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
    quota_bytes: Option<u64>,
}

impl FileStorage {
    pub fn new(dir: PathBuf) -> Result<Self, CacheError> {
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            quota_bytes: None,
        })
    }

    /// Limit the combined size of all slot files.
    pub fn with_quota(mut self, quota_bytes: u64) -> Self {
        self.quota_bytes = Some(quota_bytes);
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn slot_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    /// Bytes used by every slot except `key`.
    fn used_bytes_excluding(&self, key: &str) -> Result<u64, CacheError> {
        let skip = self.slot_path(key);
        let mut total = 0;
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path == skip || path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            total += std::fs::metadata(&path)?.len();
        }
        Ok(total)
    }
}

impl CacheStorage for FileStorage {
    fn read(&self, key: &str) -> Result<Option<String>, CacheError> {
        let path = self.slot_path(key);
        match std::fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<(), CacheError> {
        if self.quota_bytes.is_some() {
            let needed = self.used_bytes_excluding(key)? + value.len() as u64;
            check_quota(self.quota_bytes, needed)?;
        }

        // Write to a sibling temp file and rename so readers never see half a slot.
        let path = self.slot_path(key);
        let tmp = self.dir.join(format!("{}.json.tmp", key));
        std::fs::write(&tmp, value)?;
        std::fs::rename(&tmp, &path)?;
        debug!(slot = key, bytes = value.len(), "Wrote cache slot");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), CacheError> {
        match std::fs::remove_file(self.slot_path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-process slots, for tests and for running without a cache directory.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    slots: Mutex<HashMap<String, String>>,
    quota_bytes: Option<u64>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota_bytes: u64) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            quota_bytes: Some(quota_bytes),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }
}

impl CacheStorage for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>, CacheError> {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(slots.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), CacheError> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        let others: usize = slots
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(_, v)| v.len())
            .sum();
        check_quota(self.quota_bytes, (others + value.len()) as u64)?;
        slots.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), CacheError> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.remove(key);
        Ok(())
    }
}
