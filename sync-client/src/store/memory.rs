//! In-memory key-value store.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{KvStore, StoreError};

/// In-memory store for tests and ephemeral sessions.
///
/// Clones share the same map. Reads and writes can be made to fail on demand
/// to exercise the engine's fallback paths.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    fail_reads: Arc<AtomicBool>,
    fail_writes: Arc<AtomicBool>,
    failing_reads: Arc<std::sync::Mutex<HashSet<String>>>,
    failing_writes: Arc<std::sync::Mutex<HashSet<String>>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `get` fail (or succeed again).
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent `set` and `remove` fail (or succeed again).
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make reads of one key fail (or succeed again).
    pub fn fail_reads_of(&self, key: &str, fail: bool) {
        toggle(&self.failing_reads, key, fail);
    }

    /// Make writes and removals of one key fail (or succeed again).
    pub fn fail_writes_of(&self, key: &str, fail: bool) {
        toggle(&self.failing_writes, key, fail);
    }

    fn refuses_read(&self, key: &str) -> bool {
        self.fail_reads.load(Ordering::SeqCst) || listed(&self.failing_reads, key)
    }

    fn refuses_write(&self, key: &str) -> bool {
        self.fail_writes.load(Ordering::SeqCst) || listed(&self.failing_writes, key)
    }

    /// Check whether a key is present.
    pub async fn contains(&self, key: &str) -> bool {
        self.entries.lock().await.contains_key(key)
    }

    /// Number of keys stored.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Check if the store is empty.
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

fn toggle(keys: &std::sync::Mutex<HashSet<String>>, key: &str, on: bool) {
    let mut keys = keys.lock().unwrap_or_else(PoisonError::into_inner);
    if on {
        keys.insert(key.to_string());
    } else {
        keys.remove(key);
    }
}

fn listed(keys: &std::sync::Mutex<HashSet<String>>, key: &str) -> bool {
    keys.lock()
        .unwrap_or_else(PoisonError::into_inner)
        .contains(key)
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        if self.refuses_read(key) {
            return Err(StoreError::Unavailable(format!("read of {key} refused")));
        }
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        if self.refuses_write(key) {
            return Err(StoreError::Unavailable(format!("write of {key} refused")));
        }
        self.entries
            .lock()
            .await
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        if self.refuses_write(key) {
            return Err(StoreError::Unavailable(format!("remove of {key} refused")));
        }
        self.entries.lock().await.remove(key);
        Ok(())
    }
}
