//! # sync-client
//!
//! Offline-first sync engine for practice apps.
//!
//! This is the library an application embeds to keep working without a
//! network: it caches work items ahead of need, records answers locally, and
//! reconciles them with the server when connectivity returns.
//!
//! ## Features
//!
//! - **Item Cache**: TTL-bound pre-fetched items, served at most once
//! - **Result Queue**: durable FIFO of unconfirmed answers
//! - **Reconciliation Loop**: single-flight drain with per-item failure isolation
//! - **Pluggable Edges**: key-value store, work source, connectivity probe, clock
//! - **Pure Core**: uses sync-core for side-effect-free logic
//!
//! ## Example
//!
//! ```ignore
//! use practice_sync_client::{
//!     EngineConfig, HttpProbe, HttpWorkSource, HttpWorkSourceConfig, SqliteStore, SyncEngine,
//!     SystemClock,
//! };
//!
//! let store = SqliteStore::open(&path).await?;
//! let source = HttpWorkSource::new(HttpWorkSourceConfig::default())?;
//! let probe = HttpProbe::new("http://localhost:8000", Duration::from_secs(5))?;
//! let engine = SyncEngine::new(
//!     EngineConfig::default(),
//!     Arc::new(store),
//!     Arc::new(source),
//!     Arc::new(probe),
//!     Arc::new(SystemClock),
//! );
//! engine.start().await?;
//!
//! engine.cache().fill("arithmetic", 10, None).await;
//! let item = engine.cache().take("arithmetic").await;
//! engine.queue().enqueue("q-1", "23", 4_000, "arithmetic").await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cache;
pub mod clock;
pub mod engine;
pub mod error;
pub mod network;
pub mod progress;
pub mod queue;
pub mod reconcile;
pub mod remote;
pub mod store;

pub use cache::ItemCache;
pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{EngineConfig, SyncEngine, DEFAULT_FILL_BATCH_LIMIT, DEFAULT_PROBE_INTERVAL};
pub use error::ClientError;
pub use network::{ConnectivityProbe, HttpProbe, ManualProbe, NetworkMonitor, ProbeError};
pub use progress::ProgressStore;
pub use queue::ResultQueue;
pub use reconcile::Reconciler;
pub use remote::{HttpWorkSource, HttpWorkSourceConfig, MockWorkSource, RemoteError, WorkSource};
pub use store::{KvStore, MemoryStore, SqliteStore, StoreError};

pub use practice_sync_core::{NetworkEvent, RetryPolicy};
