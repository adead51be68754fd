//! # sync-types
//!
//! Data model for the practice-sync offline engine.
//!
//! This crate provides the foundational types used across all practice-sync crates:
//! - [`ItemId`], [`ResultId`], [`Category`], [`Timestamp`] - Identity and ordering types
//! - [`CachedItem`], [`PendingResult`], [`ProgressSnapshot`] - Persisted records
//! - [`SyncOutcome`] - Transient report of a single drain
//! - [`IssueRequest`], [`SubmitRequest`] and friends - Remote work source boundary
//! - [`Envelope`] - Versioned wrapper for every persisted value
//! - [`SyncError`] - Error types

#![warn(missing_docs)]
#![warn(clippy::all)]

mod envelope;
mod error;
mod ids;
mod messages;
mod records;

pub use envelope::{Envelope, RecordKind, ENVELOPE_VERSION};
pub use error::SyncError;
pub use ids::{Category, ItemId, ResultId, Timestamp};
pub use messages::{IssueRequest, IssuedItem, SubmitReceipt, SubmitRequest};
pub use records::{
    CachedItem, Difficulty, OfflineStats, PendingResult, ProgressDelta, ProgressSnapshot,
    SyncOutcome,
};
