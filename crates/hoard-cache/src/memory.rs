use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::adapter::CacheAdapter;
use crate::fs_util::now_secs;

#[derive(Debug)]
struct MemoryRecord {
    expires_at: u64,
    value: serde_json::Value,
}

/// In-process cache adapter backed by a mutex-guarded map.
///
/// The in-memory analogue of [`FileCache`](crate::FileCache): same contract,
/// no persistence. Records accumulate until they expire, are removed, or the
/// cache is flushed.
#[derive(Debug, Default)]
pub struct MemoryCache {
    key_prefix: Option<String>,
    records: Mutex<HashMap<String, MemoryRecord>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Namespace every key with `prefix`, so independent subsystems can share
    /// one cache instance without colliding.
    pub fn with_key_prefix(prefix: impl Into<String>) -> Self {
        Self {
            key_prefix: Some(prefix.into()),
            records: Mutex::new(HashMap::new()),
        }
    }

    fn key_string(&self, key: &str) -> String {
        match &self.key_prefix {
            Some(prefix) => format!("{prefix}{key}"),
            None => key.to_owned(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, MemoryRecord>> {
        // A panicked writer can't leave the map structurally broken, so a
        // poisoned lock is still usable.
        match self.records.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl CacheAdapter for MemoryCache {
    fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let key = self.key_string(key);
        let now = now_secs();
        let mut records = self.lock();

        let (expired, value) = match records.get(&key) {
            None => return None,
            Some(record) => (record.expires_at <= now, record.value.clone()),
        };
        if expired {
            records.remove(&key);
            return None;
        }

        match serde_json::from_value(value) {
            Ok(value) => Some(value),
            Err(_) => {
                // The stored value doesn't fit the requested type; treat it
                // like a corrupt record and drop it.
                records.remove(&key);
                None
            }
        }
    }

    fn set<T: Serialize>(&self, key: &str, value: &T, ttl_secs: u64) -> bool {
        let value = match serde_json::to_value(value) {
            Ok(value) => value,
            Err(_) => return false,
        };
        let record = MemoryRecord {
            expires_at: now_secs().saturating_add(ttl_secs),
            value,
        };
        self.lock().insert(self.key_string(key), record);
        true
    }

    fn set_if_not_exists<T: Serialize>(&self, key: &str, value: &T, ttl_secs: u64) -> bool {
        let value = match serde_json::to_value(value) {
            Ok(value) => value,
            Err(_) => return false,
        };
        let key = self.key_string(key);
        let now = now_secs();
        let mut records = self.lock();

        if let Some(record) = records.get(&key) {
            if record.expires_at > now {
                return false;
            }
        }
        // Unlike the filesystem adapter, this check-then-insert runs under
        // the lock and is therefore atomic within the process.
        records.insert(
            key,
            MemoryRecord {
                expires_at: now.saturating_add(ttl_secs),
                value,
            },
        );
        true
    }

    fn renew(&self, key: &str, ttl_secs: u64) -> bool {
        let key = self.key_string(key);
        let now = now_secs();
        let mut records = self.lock();

        match records.get_mut(&key) {
            Some(record) if record.expires_at > now => {
                record.expires_at = now.saturating_add(ttl_secs);
                true
            }
            Some(_) => {
                records.remove(&key);
                false
            }
            None => false,
        }
    }

    fn remove(&self, key: &str) -> bool {
        self.lock().remove(&self.key_string(key)).is_some()
    }

    fn flush(&self) -> bool {
        self.lock().clear();
        true
    }
}
