//! SyncEngine - one explicitly constructed offline engine.
//!
//! The engine owns the Item Cache, Result Queue, Reconciliation Loop, Local
//! Progress Store and Network State Monitor, all wired over the injected
//! store, work source, probe and clock.
//!
//! ```text
//! probe ─► NetworkMonitor ─(TriggerDrain)─► listener task ─► Reconciler::drain
//!                 │                                                │
//!                 └────────── ItemCache            ResultQueue ◄───┘
//! ```
//!
//! `start()` spawns the listener task; `stop()` signals it and waits. A drain
//! already in flight when `stop()` is called runs to completion.

use std::future;
use std::sync::Arc;
use std::time::Duration;

use practice_sync_core::{RetryPolicy, ITEM_TTL};
use practice_sync_types::SyncOutcome;
use tokio::sync::{broadcast, Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::{interval, Interval, MissedTickBehavior};

use crate::cache::ItemCache;
use crate::clock::Clock;
use crate::error::ClientError;
use crate::network::{ConnectivityProbe, NetworkMonitor};
use crate::progress::ProgressStore;
use crate::queue::ResultQueue;
use crate::reconcile::Reconciler;
use crate::remote::WorkSource;
use crate::store::KvStore;

/// Default cap on items fetched by one fill.
pub const DEFAULT_FILL_BATCH_LIMIT: usize = 50;

/// Default interval between background connectivity probes.
pub const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_secs(30);

/// Engine tuning.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Lifetime of a cached item.
    pub ttl: Duration,
    /// When failed results are given up on.
    pub retry: RetryPolicy,
    /// Upper bound on items fetched by one fill.
    pub fill_batch_limit: usize,
    /// Background probe interval; `None` relies on pushed reports only.
    pub probe_interval: Option<Duration>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ttl: ITEM_TTL,
            retry: RetryPolicy::default(),
            fill_batch_limit: DEFAULT_FILL_BATCH_LIMIT,
            probe_interval: Some(DEFAULT_PROBE_INTERVAL),
        }
    }
}

/// The offline-first sync engine.
pub struct SyncEngine {
    config: EngineConfig,
    cache: Arc<ItemCache>,
    queue: Arc<ResultQueue>,
    reconciler: Arc<Reconciler>,
    progress: Arc<ProgressStore>,
    monitor: Arc<NetworkMonitor>,
    shutdown_tx: broadcast::Sender<()>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl SyncEngine {
    /// Build an engine over its collaborators. Nothing runs until `start()`.
    pub fn new(
        config: EngineConfig,
        store: Arc<dyn KvStore>,
        source: Arc<dyn WorkSource>,
        probe: Arc<dyn ConnectivityProbe>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let monitor = Arc::new(NetworkMonitor::new(probe));
        let queue = Arc::new(ResultQueue::new(Arc::clone(&store), Arc::clone(&clock)));
        let progress = Arc::new(ProgressStore::new(Arc::clone(&store), Arc::clone(&clock)));
        let cache = Arc::new(ItemCache::new(
            Arc::clone(&store),
            Arc::clone(&clock),
            Arc::clone(&source),
            Arc::clone(&monitor),
            config.ttl,
            config.fill_batch_limit,
        ));
        let reconciler = Arc::new(Reconciler::new(
            store,
            clock,
            source,
            Arc::clone(&monitor),
            Arc::clone(&queue),
            Arc::clone(&progress),
            config.retry,
        ));
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            cache,
            queue,
            reconciler,
            progress,
            monitor,
            shutdown_tx,
            listener: Mutex::new(None),
        }
    }

    /// Spawn the listener task and take a first connectivity reading.
    ///
    /// If the device is already online this triggers an initial drain.
    pub async fn start(&self) -> Result<(), ClientError> {
        let mut listener = self.listener.lock().await;
        if listener.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return Err(ClientError::AlreadyStarted);
        }

        let reconciler = Arc::clone(&self.reconciler);
        let monitor = Arc::clone(&self.monitor);
        let trigger = self.monitor.drain_trigger();
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let mut ticker = self.config.probe_interval.map(|period| {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            ticker
        });

        *listener = Some(tokio::spawn(async move {
            tracing::info!("Sync engine started");
            loop {
                tokio::select! {
                    _ = trigger.notified() => {
                        let outcome = reconciler.drain().await;
                        if let Some(note) = &outcome.note {
                            tracing::debug!("Triggered drain did nothing: {}", note);
                        }
                        discard_stored_trigger(&trigger).await;
                    }
                    _ = tick(&mut ticker) => {
                        monitor.check_online().await;
                    }
                    _ = shutdown_rx.recv() => {
                        tracing::info!("Sync engine stopping");
                        break;
                    }
                }
            }
        }));
        drop(listener);

        self.monitor.check_online().await;
        Ok(())
    }

    /// Signal the listener task to finish and wait for it.
    ///
    /// Stopping an engine that is not running does nothing.
    pub async fn stop(&self) {
        let Some(handle) = self.listener.lock().await.take() else {
            return;
        };
        // Err only when the task already exited and dropped its receiver.
        let _ = self.shutdown_tx.send(());
        if let Err(e) = handle.await {
            tracing::warn!("Sync engine listener ended abnormally: {}", e);
        }
    }

    /// Whether the listener task is running.
    pub async fn is_started(&self) -> bool {
        self.listener
            .lock()
            .await
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Drain now, outside the listener.
    pub async fn drain(&self) -> SyncOutcome {
        self.reconciler.drain().await
    }

    /// The Item Cache.
    pub fn cache(&self) -> &ItemCache {
        &self.cache
    }

    /// The Result Queue.
    pub fn queue(&self) -> &ResultQueue {
        &self.queue
    }

    /// The Reconciliation Loop.
    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    /// The Local Progress Store.
    pub fn progress(&self) -> &ProgressStore {
        &self.progress
    }

    /// The Network State Monitor.
    pub fn monitor(&self) -> &NetworkMonitor {
        &self.monitor
    }

    /// Configuration the engine was built with.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

/// Consume a wake-up stored while a drain was already running.
///
/// A reconnect during a drain does not queue another one.
async fn discard_stored_trigger(trigger: &Notify) {
    tokio::select! {
        biased;
        _ = trigger.notified() => {
            tracing::debug!("Ignoring drain trigger raised mid-drain");
        }
        _ = future::ready(()) => {}
    }
}

/// Next tick of an optional interval; never resolves without one.
async fn tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => future::pending::<()>().await,
    }
}
