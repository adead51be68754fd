//! Reconciliation Loop: drain the Result Queue to the remote work source.
//!
//! A drain works over a snapshot of the queue. Each result is submitted in
//! order; one result failing never stops the others. When the pass ends,
//! exactly the confirmed ids are removed from a fresh read of the queue, so
//! answers recorded mid-drain are kept for the next one.
//!
//! At most one drain runs at a time. A second caller gets a zero-effect
//! outcome noted [`SyncOutcome::ALREADY_RUNNING`] instead of waiting.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use practice_sync_core::{DrainLedger, RetryPolicy};
use practice_sync_types::{ProgressDelta, RecordKind, SyncOutcome, Timestamp};

use crate::clock::Clock;
use crate::network::NetworkMonitor;
use crate::progress::ProgressStore;
use crate::queue::ResultQueue;
use crate::remote::WorkSource;
use crate::store::{read_record, write_record, KvStore};

/// Clears the running flag however the drain exits.
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Drives pending results to the server.
pub struct Reconciler {
    store: Arc<dyn KvStore>,
    clock: Arc<dyn Clock>,
    source: Arc<dyn WorkSource>,
    monitor: Arc<NetworkMonitor>,
    queue: Arc<ResultQueue>,
    progress: Arc<ProgressStore>,
    policy: RetryPolicy,
    running: AtomicBool,
}

impl Reconciler {
    /// Wire a reconciler over shared components.
    pub fn new(
        store: Arc<dyn KvStore>,
        clock: Arc<dyn Clock>,
        source: Arc<dyn WorkSource>,
        monitor: Arc<NetworkMonitor>,
        queue: Arc<ResultQueue>,
        progress: Arc<ProgressStore>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            store,
            clock,
            source,
            monitor,
            queue,
            progress,
            policy,
            running: AtomicBool::new(false),
        }
    }

    /// Whether a drain is in progress right now.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Retry policy in force.
    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Submit every pending result once.
    pub async fn drain(&self) -> SyncOutcome {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("Drain requested while another is running");
            return SyncOutcome::skipped(SyncOutcome::ALREADY_RUNNING);
        }
        let _running = RunningGuard(&self.running);

        if !self.monitor.check_online().await {
            tracing::debug!("Drain skipped: offline");
            return SyncOutcome::skipped(SyncOutcome::OFFLINE);
        }

        let snapshot = self.queue.list().await;
        tracing::debug!("Draining {} pending results", snapshot.len());

        let mut ledger = DrainLedger::new();
        for result in &snapshot {
            match self.source.submit(result.to_submit_request()).await {
                Ok(receipt) if receipt.accepted => {
                    tracing::debug!("Result {} accepted (+{} xp)", result.id, receipt.reward);
                    ledger.accepted(result, receipt.reward);
                }
                Ok(receipt) => {
                    let reason = receipt
                        .feedback
                        .unwrap_or_else(|| "no reason given".to_string());
                    tracing::debug!("Result {} rejected: {}", result.id, reason);
                    ledger.failed(result, format!("rejected: {reason}"));
                }
                Err(e) => {
                    tracing::debug!("Result {} failed: {}", result.id, e);
                    ledger.failed(result, e);
                }
            }
        }

        let reward = ledger.reward();
        let (discarded, settle_error) = match self
            .queue
            .settle(ledger.confirmed(), ledger.failures(), &self.policy)
            .await
        {
            Ok(discarded) => (discarded, None),
            Err(e) => {
                tracing::warn!("Failed to update queue after drain: {}", e);
                (Vec::new(), Some(e))
            }
        };

        for result in &discarded {
            tracing::warn!(
                "Discarding result {} for item {} after {} failed attempts (last error: {})",
                result.id,
                result.item_id,
                result.attempts,
                result.last_error.as_deref().unwrap_or("none")
            );
        }

        // Unsettled results go out again next drain and earn their XP then.
        if reward > 0 && settle_error.is_none() {
            let xp = i64::try_from(reward).unwrap_or(i64::MAX);
            match self.progress.apply_delta(&ProgressDelta::xp(xp)).await {
                Ok(Some(_)) => {}
                Ok(None) => tracing::debug!("No local progress to credit {} xp to", reward),
                Err(e) => tracing::warn!("Failed to credit {} xp locally: {}", reward, e),
            }
        }

        let finished = self.clock.now();
        if let Err(e) = write_record(self.store.as_ref(), RecordKind::LastSync, &finished).await {
            tracing::warn!("Failed to record last sync time: {}", e);
        }

        let mut outcome = ledger.finish(discarded);
        if let Some(e) = settle_error {
            outcome
                .diagnostics
                .push(format!("queue not updated, results will be resubmitted: {e}"));
        }

        tracing::info!(
            "Drain complete: {} succeeded, {} failed, {} discarded, +{} xp",
            outcome.succeeded,
            outcome.failed,
            outcome.discarded.len(),
            outcome.reward
        );
        outcome
    }

    /// When the last drain finished, if ever.
    pub async fn last_sync(&self) -> Option<Timestamp> {
        match read_record(self.store.as_ref(), RecordKind::LastSync).await {
            Ok(ts) => ts,
            Err(e) => {
                tracing::warn!("Failed to read last sync time: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::network::ManualProbe;
    use crate::remote::MockWorkSource;
    use crate::store::MemoryStore;
    use std::time::Duration;

    struct Fixture {
        store: MemoryStore,
        reconciler: Arc<Reconciler>,
        queue: Arc<ResultQueue>,
        progress: Arc<ProgressStore>,
        source: MockWorkSource,
        probe: ManualProbe,
        clock: ManualClock,
    }

    fn fixture(policy: RetryPolicy) -> Fixture {
        let memory = MemoryStore::new();
        let store: Arc<dyn KvStore> = Arc::new(memory.clone());
        let clock = ManualClock::new(Timestamp::from_millis(5_000));
        let source = MockWorkSource::new();
        let probe = ManualProbe::new(true);
        let monitor = Arc::new(NetworkMonitor::new(Arc::new(probe.clone())));
        let queue = Arc::new(ResultQueue::new(store.clone(), Arc::new(clock.clone())));
        let progress = Arc::new(ProgressStore::new(store.clone(), Arc::new(clock.clone())));
        let reconciler = Arc::new(Reconciler::new(
            store,
            Arc::new(clock.clone()),
            Arc::new(source.clone()),
            monitor,
            queue.clone(),
            progress.clone(),
            policy,
        ));
        Fixture {
            store: memory,
            reconciler,
            queue,
            progress,
            source,
            probe,
            clock,
        }
    }

    #[tokio::test]
    async fn offline_drain_is_a_no_op() {
        let f = fixture(RetryPolicy::default());
        f.queue.enqueue("q-1", "4", 100, "arithmetic").await.unwrap();
        f.probe.set_online(false);

        let outcome = f.reconciler.drain().await;
        assert!(outcome.is_offline());
        assert_eq!(outcome.attempted(), 0);
        assert_eq!(f.source.submit_calls(), 0);
        assert_eq!(f.queue.len().await, 1);
        assert!(!f.reconciler.is_running());
        assert!(f.reconciler.last_sync().await.is_none());
    }

    #[tokio::test]
    async fn drain_submits_all_and_empties_queue() {
        let f = fixture(RetryPolicy::default());
        f.queue.enqueue("q-1", "4", 100, "arithmetic").await.unwrap();
        f.queue.enqueue("q-2", "9", 100, "arithmetic").await.unwrap();

        let outcome = f.reconciler.drain().await;
        assert_eq!(outcome.succeeded, 2);
        assert_eq!(outcome.failed, 0);
        assert_eq!(outcome.reward, 20);
        assert!(f.queue.is_empty().await);
        assert_eq!(f.queue.stats().await.synced, 2);

        let order: Vec<String> = f.source.submissions().into_iter().map(|s| s.item_id).collect();
        assert_eq!(order, vec!["q-1", "q-2"]);
    }

    #[tokio::test]
    async fn drain_records_last_sync_even_with_failures() {
        let f = fixture(RetryPolicy::default());
        f.queue.enqueue("q-1", "4", 100, "arithmetic").await.unwrap();
        f.source.fail_item("q-1", "connection reset");
        f.clock.advance(Duration::from_secs(1));

        let outcome = f.reconciler.drain().await;
        assert_eq!(outcome.failed, 1);
        assert_eq!(outcome.diagnostics.len(), 1);
        assert_eq!(
            f.reconciler.last_sync().await,
            Some(Timestamp::from_millis(6_000))
        );
    }

    #[tokio::test]
    async fn failed_result_keeps_position_and_counts_attempts() {
        let f = fixture(RetryPolicy::default());
        f.queue.enqueue("q-1", "4", 100, "arithmetic").await.unwrap();
        f.queue.enqueue("q-2", "x", 100, "arithmetic").await.unwrap();
        f.queue.enqueue("q-3", "6", 100, "arithmetic").await.unwrap();
        f.source.reject_item("q-2", "malformed answer");

        f.reconciler.drain().await;
        f.reconciler.drain().await;

        let pending = f.queue.list().await;
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].item_id, "q-2");
        assert_eq!(pending[0].attempts, 2);
        assert_eq!(
            pending[0].last_error.as_deref(),
            Some("rejected: malformed answer")
        );
    }

    #[tokio::test]
    async fn reward_is_credited_to_local_progress() {
        let f = fixture(RetryPolicy::default());
        f.progress.initialize("learner-1").await.unwrap();
        f.source.set_reward(60);
        f.queue.enqueue("q-1", "4", 100, "arithmetic").await.unwrap();
        f.queue.enqueue("q-2", "5", 100, "arithmetic").await.unwrap();

        f.reconciler.drain().await;

        let snap = f.progress.snapshot_read().await.unwrap();
        assert_eq!(snap.total_xp, 120);
        assert_eq!(snap.level, 2);
    }

    #[tokio::test]
    async fn unsettled_drain_credits_no_reward() {
        let f = fixture(RetryPolicy::default());
        f.progress.initialize("learner-1").await.unwrap();
        f.queue.enqueue("q-1", "4", 100, "arithmetic").await.unwrap();

        let key = RecordKind::PendingResults.key();
        f.store.fail_writes_of(key, true);
        let outcome = f.reconciler.drain().await;
        f.store.fail_writes_of(key, false);

        assert_eq!(outcome.succeeded, 1);
        assert!(outcome
            .diagnostics
            .iter()
            .any(|d| d.starts_with("queue not updated")));
        assert_eq!(f.queue.len().await, 1);
        assert_eq!(f.progress.snapshot_read().await.unwrap().total_xp, 0);

        // The resubmission is what earns the XP, exactly once.
        let retry = f.reconciler.drain().await;
        assert_eq!(retry.succeeded, 1);
        assert!(f.queue.is_empty().await);
        assert_eq!(f.source.submit_calls(), 2);
        assert_eq!(f.progress.snapshot_read().await.unwrap().total_xp, 10);
    }

    #[tokio::test]
    async fn concurrent_drain_is_rejected() {
        let f = fixture(RetryPolicy::default());
        f.queue.enqueue("q-1", "4", 100, "arithmetic").await.unwrap();
        f.source.set_submit_delay(Duration::from_millis(200));

        let first = tokio::spawn({
            let reconciler = f.reconciler.clone();
            async move { reconciler.drain().await }
        });
        // Let the first drain reach its submission.
        while f.source.submit_calls() == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        let second = f.reconciler.drain().await;
        assert!(second.is_already_running());
        assert_eq!(second.attempted(), 0);

        let first = first.await.unwrap();
        assert_eq!(first.succeeded, 1);
        assert_eq!(f.source.submit_calls(), 1);
        assert!(!f.reconciler.is_running());
    }

    #[tokio::test]
    async fn bounded_policy_discards_explicitly() {
        let f = fixture(RetryPolicy::bounded(2));
        f.queue.enqueue("q-1", "4", 100, "arithmetic").await.unwrap();
        f.source.reject_item("q-1", "unknown question");

        let first = f.reconciler.drain().await;
        assert!(first.discarded.is_empty());
        assert_eq!(f.queue.len().await, 1);

        let second = f.reconciler.drain().await;
        assert_eq!(second.discarded.len(), 1);
        assert_eq!(second.discarded[0].item_id, "q-1");
        assert_eq!(second.discarded[0].attempts, 2);
        assert!(f.queue.is_empty().await);
        assert_eq!(f.queue.stats().await.discarded, 1);
    }

    #[tokio::test]
    async fn empty_queue_drain_succeeds_trivially() {
        let f = fixture(RetryPolicy::default());
        let outcome = f.reconciler.drain().await;
        assert_eq!(outcome, SyncOutcome::default());
        assert!(f.reconciler.last_sync().await.is_some());
    }
}
