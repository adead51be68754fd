//! # sync-core
//!
//! Pure logic for practice-sync (no I/O, instant tests).
//!
//! This crate implements the item pool, the pending-result log, drain
//! bookkeeping, the level curve and the connectivity state machine without
//! any network, disk or clock access.
//!
//! ## Design Philosophy
//!
//! All modules in this crate are **pure** - they take input (including the
//! current time) and produce output without side effects. This enables:
//! - Instant unit tests (no mocks, no async)
//! - Deterministic behavior (same input → same output)
//!
//! The actual I/O is performed by `sync-client`, which loads state from
//! storage, runs it through these types, and writes it back.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod drain;
pub mod pool;
pub mod progress;
pub mod queue;
pub mod state;

pub use drain::{DrainLedger, RetryPolicy};
pub use pool::{ItemPool, ITEM_TTL};
pub use progress::{apply_delta, level_for_xp, level_progress, LevelProgress, MAX_LEVEL};
pub use queue::PendingLog;
pub use state::{Action, Connectivity, Event, NetworkEvent};
