//! Result Queue: durable FIFO of answers the server has not confirmed.
//!
//! Every mutation is a read-modify-write of the whole persisted log,
//! serialized by a per-queue lock. Mutations read strictly: if the stored
//! log cannot be read, the mutation fails rather than overwrite it with an
//! empty one. Plain reads fall back to an empty view.

use std::sync::Arc;

use practice_sync_core::{PendingLog, RetryPolicy};
use practice_sync_types::{Category, OfflineStats, PendingResult, RecordKind, ResultId};
use tokio::sync::Mutex;

use crate::clock::Clock;
use crate::error::ClientError;
use crate::store::{read_or_default, read_record, write_record, KvStore};

/// Durable queue of pending results.
pub struct ResultQueue {
    store: Arc<dyn KvStore>,
    clock: Arc<dyn Clock>,
    lock: Mutex<()>,
}

impl ResultQueue {
    /// Create a queue persisted in `store`.
    pub fn new(store: Arc<dyn KvStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            lock: Mutex::new(()),
        }
    }

    async fn load_strict(&self) -> Result<PendingLog, ClientError> {
        let entries: Option<Vec<PendingResult>> =
            read_record(self.store.as_ref(), RecordKind::PendingResults).await?;
        Ok(PendingLog::from_entries(entries.unwrap_or_default()))
    }

    async fn save(&self, log: PendingLog) -> Result<(), ClientError> {
        write_record(
            self.store.as_ref(),
            RecordKind::PendingResults,
            &log.into_entries(),
        )
        .await?;
        Ok(())
    }

    /// Record an answer locally. Never touches the network.
    ///
    /// Returns the new result's id once it is durably stored.
    pub async fn enqueue(
        &self,
        item_id: &str,
        answer: &str,
        elapsed_ms: u64,
        category: impl Into<Category>,
    ) -> Result<ResultId, ClientError> {
        let _lock = self.lock.lock().await;

        let result = PendingResult::new(
            item_id,
            answer,
            elapsed_ms,
            category.into(),
            self.clock.now(),
        );
        let id = result.id;

        let mut log = self.load_strict().await?;
        log.push(result);
        let pending = log.len();
        self.save(log).await?;

        self.update_stats(|stats| stats.answered_offline += 1).await;
        tracing::debug!("Enqueued result {} for item {} ({} pending)", id, item_id, pending);
        Ok(id)
    }

    /// All pending results, oldest first.
    pub async fn list(&self) -> Vec<PendingResult> {
        read_or_default(self.store.as_ref(), RecordKind::PendingResults).await
    }

    /// Number of pending results.
    pub async fn len(&self) -> usize {
        self.list().await.len()
    }

    /// Check if nothing is pending.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Remove exactly `ids`, re-reading the current queue first.
    ///
    /// Results enqueued after the caller's snapshot are kept.
    pub async fn remove_confirmed(&self, ids: &[ResultId]) -> Result<usize, ClientError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let _lock = self.lock.lock().await;

        let mut log = self.load_strict().await?;
        let removed = log.remove(ids);
        self.save(log).await?;
        Ok(removed)
    }

    /// Bump attempt counters for failed submissions.
    pub async fn record_failures(&self, failures: &[(ResultId, String)]) -> Result<(), ClientError> {
        if failures.is_empty() {
            return Ok(());
        }
        let _lock = self.lock.lock().await;

        let mut log = self.load_strict().await?;
        log.record_failures(failures);
        self.save(log).await
    }

    /// Apply a finished drain in one step.
    ///
    /// Removes confirmed ids, records failures, then drops whatever the
    /// policy says is exhausted. Returns the dropped results.
    pub(crate) async fn settle(
        &self,
        confirmed: &[ResultId],
        failures: &[(ResultId, String)],
        policy: &RetryPolicy,
    ) -> Result<Vec<PendingResult>, ClientError> {
        let _lock = self.lock.lock().await;

        let mut log = self.load_strict().await?;
        let synced = log.remove(confirmed);
        log.record_failures(failures);
        let discarded = log.take_exhausted(policy);
        self.save(log).await?;

        let dropped = discarded.len();
        if synced > 0 || dropped > 0 {
            self.update_stats(|stats| {
                stats.synced += synced as u64;
                stats.discarded += dropped as u64;
            })
            .await;
        }
        Ok(discarded)
    }

    /// Drop results on the host's request, returning what was removed.
    pub async fn discard(&self, ids: &[ResultId]) -> Result<Vec<PendingResult>, ClientError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let _lock = self.lock.lock().await;

        let log = self.load_strict().await?;
        let (dropped, kept): (Vec<_>, Vec<_>) = log
            .into_entries()
            .into_iter()
            .partition(|entry| ids.contains(&entry.id));
        self.save(PendingLog::from_entries(kept)).await?;

        if !dropped.is_empty() {
            for entry in &dropped {
                tracing::warn!(
                    "Discarded result {} for item {} on request",
                    entry.id,
                    entry.item_id
                );
            }
            let n = dropped.len() as u64;
            self.update_stats(|stats| stats.discarded += n).await;
        }
        Ok(dropped)
    }

    /// Offline activity counters.
    pub async fn stats(&self) -> OfflineStats {
        read_or_default(self.store.as_ref(), RecordKind::Stats).await
    }

    /// Caller must hold `self.lock`. Skipped if the counters cannot be read.
    async fn update_stats(&self, update: impl FnOnce(&mut OfflineStats)) {
        let mut stats: OfflineStats =
            match read_record(self.store.as_ref(), RecordKind::Stats).await {
                Ok(stats) => stats.unwrap_or_default(),
                Err(e) => {
                    tracing::warn!("Failed to read offline stats, not updating: {}", e);
                    return;
                }
            };
        update(&mut stats);
        if let Err(e) = write_record(self.store.as_ref(), RecordKind::Stats, &stats).await {
            tracing::warn!("Failed to update offline stats: {}", e);
        }
    }
}
