//! Error types for practice-sync records.

use thiserror::Error;

use crate::RecordKind;

/// Errors that can occur encoding, decoding or validating records.
#[derive(Debug, Error)]
pub enum SyncError {
    /// MessagePack serialization failed
    #[error("serialization failed: {0}")]
    Serialization(#[source] rmp_serde::encode::Error),

    /// MessagePack deserialization failed
    #[error("deserialization failed: {0}")]
    Deserialization(#[source] rmp_serde::decode::Error),

    /// Invalid record kind discriminator
    #[error("invalid record kind: {0}")]
    InvalidRecordKind(u8),

    /// Stored record is of a different kind than requested
    #[error("record kind mismatch: expected {expected:?}, found {found:?}")]
    KindMismatch {
        /// Kind the caller asked for.
        expected: RecordKind,
        /// Kind found in the envelope.
        found: RecordKind,
    },

    /// Invalid envelope version
    #[error("unsupported envelope version: {0}")]
    UnsupportedVersion(u8),

    /// Invalid data format
    #[error("invalid data: {0}")]
    InvalidData(String),
}
