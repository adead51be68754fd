//! Persistent key-value storage for the offline engine.
//!
//! The engine keeps each of its collections under one key as a single
//! sealed [`Envelope`]. Absence of a key means empty state.
//!
//! Backends:
//! - [`MemoryStore`]: in-process map with failure injection for tests
//! - [`SqliteStore`]: one `kv` table in a SQLite database (WAL mode)

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use practice_sync_types::{Envelope, RecordKind, SyncError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Stored bytes could not be encoded or decoded.
    #[error("record error: {0}")]
    Record(#[from] SyncError),

    /// Backend refused the operation.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Byte-blob storage addressed by string keys.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Read the value under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Replace the value under `key`.
    async fn set(&self, key: &str, value: &[u8]) -> Result<(), StoreError>;

    /// Delete `key`. Deleting a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Read and decode the record of `kind`.
pub async fn read_record<T: DeserializeOwned>(
    store: &dyn KvStore,
    kind: RecordKind,
) -> Result<Option<T>, StoreError> {
    match store.get(kind.key()).await? {
        Some(bytes) => Ok(Some(Envelope::open(kind, &bytes)?)),
        None => Ok(None),
    }
}

/// Encode and write the record of `kind`.
pub async fn write_record<T: Serialize + Sync>(
    store: &dyn KvStore,
    kind: RecordKind,
    value: &T,
) -> Result<(), StoreError> {
    let bytes = Envelope::seal(kind, value)?;
    store.set(kind.key(), &bytes).await
}

/// Read a record, falling back to its default when missing or unreadable.
///
/// Read failures are logged and never surfaced; the engine prefers an empty
/// view over refusing to work.
pub async fn read_or_default<T: DeserializeOwned + Default>(
    store: &dyn KvStore,
    kind: RecordKind,
) -> T {
    match read_record(store, kind).await {
        Ok(Some(value)) => value,
        Ok(None) => T::default(),
        Err(e) => {
            tracing::warn!("Failed to read {}, using empty state: {}", kind.key(), e);
            T::default()
        }
    }
}
