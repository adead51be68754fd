//! Envelope - the storage format wrapper for every persisted value.
//!
//! Each value the engine writes to the key-value store is MessagePack
//! encoded and wrapped in an [`Envelope`] carrying a format version and a
//! record kind, so a blob written under one key can never be decoded as
//! another record type.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::SyncError;

/// Current envelope format version.
pub const ENVELOPE_VERSION: u8 = 1;

/// Record kind discriminator; also determines the storage key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum RecordKind {
    /// The list of cached work items.
    CachedItems = 1,
    /// The ordered list of pending results.
    PendingResults = 2,
    /// The local progress snapshot.
    Progress = 3,
    /// Timestamp of the last completed drain.
    LastSync = 4,
    /// Offline activity counters.
    Stats = 5,
}

impl RecordKind {
    /// Key under which this record lives in the key-value store.
    pub fn key(&self) -> &'static str {
        match self {
            RecordKind::CachedItems => "offline.cached_items",
            RecordKind::PendingResults => "offline.pending_results",
            RecordKind::Progress => "offline.progress",
            RecordKind::LastSync => "offline.last_sync",
            RecordKind::Stats => "offline.stats",
        }
    }
}

impl TryFrom<u8> for RecordKind {
    type Error = SyncError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(RecordKind::CachedItems),
            2 => Ok(RecordKind::PendingResults),
            3 => Ok(RecordKind::Progress),
            4 => Ok(RecordKind::LastSync),
            5 => Ok(RecordKind::Stats),
            _ => Err(SyncError::InvalidRecordKind(value)),
        }
    }
}

/// Versioned wrapper around an encoded record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Envelope format version (currently 1)
    pub version: u8,
    /// Record kind discriminator
    pub kind: u8,
    /// MessagePack-encoded record
    pub body: Vec<u8>,
}

impl Envelope {
    /// Encode `value` and wrap it for storage.
    pub fn seal<T: Serialize>(kind: RecordKind, value: &T) -> Result<Vec<u8>, SyncError> {
        let body = rmp_serde::to_vec_named(value).map_err(SyncError::Serialization)?;
        Self {
            version: ENVELOPE_VERSION,
            kind: kind as u8,
            body,
        }
        .to_bytes()
    }

    /// Unwrap a stored blob, checking version and kind, and decode the record.
    pub fn open<T: DeserializeOwned>(kind: RecordKind, bytes: &[u8]) -> Result<T, SyncError> {
        let envelope = Self::from_bytes(bytes)?;
        if envelope.version != ENVELOPE_VERSION {
            return Err(SyncError::UnsupportedVersion(envelope.version));
        }
        let found = envelope.record_kind()?;
        if found != kind {
            return Err(SyncError::KindMismatch {
                expected: kind,
                found,
            });
        }
        rmp_serde::from_slice(&envelope.body).map_err(SyncError::Deserialization)
    }

    /// Serialize to MessagePack bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, SyncError> {
        rmp_serde::to_vec(self).map_err(SyncError::Serialization)
    }

    /// Deserialize from MessagePack bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SyncError> {
        rmp_serde::from_slice(bytes).map_err(SyncError::Deserialization)
    }

    /// Get the record kind as an enum.
    pub fn record_kind(&self) -> Result<RecordKind, SyncError> {
        RecordKind::try_from(self.kind)
    }
}
