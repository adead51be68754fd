//! Local Progress Store: a mirror of the user's progress for instant feedback.

use std::sync::Arc;

use practice_sync_core::apply_delta;
use practice_sync_types::{ProgressDelta, ProgressSnapshot, RecordKind, Timestamp};
use tokio::sync::Mutex;

use crate::clock::Clock;
use crate::error::ClientError;
use crate::store::{read_record, write_record, KvStore};

/// Persisted progress snapshot with delta merging.
pub struct ProgressStore {
    store: Arc<dyn KvStore>,
    clock: Arc<dyn Clock>,
    lock: Mutex<()>,
}

impl ProgressStore {
    /// Create a progress store persisted in `store`.
    pub fn new(store: Arc<dyn KvStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            lock: Mutex::new(()),
        }
    }

    /// Current snapshot, or `None` if never written or unreadable.
    pub async fn snapshot_read(&self) -> Option<ProgressSnapshot> {
        match read_record(self.store.as_ref(), RecordKind::Progress).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!("Failed to read progress snapshot: {}", e);
                None
            }
        }
    }

    /// Read for a mutation: a failed read is an error, never "absent".
    async fn load_strict(&self) -> Result<Option<ProgressSnapshot>, ClientError> {
        Ok(read_record(self.store.as_ref(), RecordKind::Progress).await?)
    }

    /// Replace the snapshot wholesale (e.g. hydration from the server).
    pub async fn write(&self, snapshot: &ProgressSnapshot) -> Result<(), ClientError> {
        let _lock = self.lock.lock().await;
        write_record(self.store.as_ref(), RecordKind::Progress, snapshot).await?;
        Ok(())
    }

    /// Create a fresh level-1 snapshot for `user_id` unless one exists.
    ///
    /// Fails without writing if the stored snapshot cannot be read.
    pub async fn initialize(&self, user_id: &str) -> Result<ProgressSnapshot, ClientError> {
        let _lock = self.lock.lock().await;
        if let Some(existing) = self.load_strict().await? {
            return Ok(existing);
        }
        let snapshot = ProgressSnapshot::new(user_id, self.clock.now());
        write_record(self.store.as_ref(), RecordKind::Progress, &snapshot).await?;
        Ok(snapshot)
    }

    /// Merge `delta` into the stored snapshot.
    ///
    /// Returns the updated snapshot, or `None` without writing anything if
    /// no snapshot exists yet.
    pub async fn apply_delta(
        &self,
        delta: &ProgressDelta,
    ) -> Result<Option<ProgressSnapshot>, ClientError> {
        self.update(|snapshot, now| {
            if apply_delta(snapshot, delta, now) {
                tracing::info!("Level up: now level {}", snapshot.level);
            }
        })
        .await
    }

    /// Extend the practice streak by `n`.
    pub async fn extend_streak(&self, n: u32) -> Result<Option<ProgressSnapshot>, ClientError> {
        self.apply_delta(&ProgressDelta::default().with_streak(n)).await
    }

    /// Reset the streak to zero. Only ever called on explicit user action.
    pub async fn reset_streak(&self) -> Result<Option<ProgressSnapshot>, ClientError> {
        self.update(|snapshot, now| {
            snapshot.streak = 0;
            snapshot.last_updated = now;
        })
        .await
    }

    async fn update(
        &self,
        change: impl FnOnce(&mut ProgressSnapshot, Timestamp),
    ) -> Result<Option<ProgressSnapshot>, ClientError> {
        let _lock = self.lock.lock().await;

        let Some(mut snapshot) = self.load_strict().await? else {
            tracing::debug!("Progress not initialized, ignoring update");
            return Ok(None);
        };
        change(&mut snapshot, self.clock.now());
        write_record(self.store.as_ref(), RecordKind::Progress, &snapshot).await?;
        Ok(Some(snapshot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::store::MemoryStore;
    use practice_sync_types::Category;
    use std::time::Duration;

    fn progress() -> (ProgressStore, ManualClock, MemoryStore) {
        let store = MemoryStore::new();
        let clock = ManualClock::new(Timestamp::from_millis(10));
        (
            ProgressStore::new(Arc::new(store.clone()), Arc::new(clock.clone())),
            clock,
            store,
        )
    }

    #[tokio::test]
    async fn uninitialized_store_ignores_deltas() {
        let (progress, _clock, store) = progress();
        assert!(progress.snapshot_read().await.is_none());

        let result = progress.apply_delta(&ProgressDelta::xp(50)).await.unwrap();
        assert!(result.is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn initialize_is_idempotent() {
        let (progress, _clock, _store) = progress();
        let first = progress.initialize("learner-1").await.unwrap();
        progress.apply_delta(&ProgressDelta::xp(40)).await.unwrap();

        let again = progress.initialize("someone-else").await.unwrap();
        assert_eq!(first.level, 1);
        assert_eq!(again.user_id, "learner-1");
        assert_eq!(again.total_xp, 40);
    }

    #[tokio::test]
    async fn apply_delta_merges_and_stamps() {
        let (progress, clock, _store) = progress();
        progress.initialize("learner-1").await.unwrap();
        clock.advance(Duration::from_secs(60));

        let delta = ProgressDelta::xp(150).with_mastery("fractions", 0.25);
        let snap = progress.apply_delta(&delta).await.unwrap().unwrap();

        assert_eq!(snap.total_xp, 150);
        assert_eq!(snap.level, 2);
        assert_eq!(snap.mastery_for(&Category::from("fractions")), 0.25);
        assert_eq!(snap.last_updated, Timestamp::from_millis(60_010));
        assert_eq!(progress.snapshot_read().await, Some(snap));
    }

    #[tokio::test]
    async fn write_replaces_snapshot() {
        let (progress, _clock, _store) = progress();
        let mut snap = ProgressSnapshot::new("learner-2", Timestamp::from_millis(5));
        snap.total_xp = 1_000;
        snap.level = 4;
        progress.write(&snap).await.unwrap();

        assert_eq!(progress.snapshot_read().await, Some(snap));
    }

    #[tokio::test]
    async fn streak_extend_and_reset() {
        let (progress, _clock, _store) = progress();
        progress.initialize("learner-1").await.unwrap();

        progress.extend_streak(2).await.unwrap();
        let snap = progress.extend_streak(1).await.unwrap().unwrap();
        assert_eq!(snap.streak, 3);

        let snap = progress.reset_streak().await.unwrap().unwrap();
        assert_eq!(snap.streak, 0);
    }

    #[tokio::test]
    async fn unreadable_snapshot_is_never_reinitialized() {
        let (progress, _clock, store) = progress();
        progress.initialize("learner-1").await.unwrap();
        progress
            .apply_delta(&ProgressDelta::xp(500).with_streak(7))
            .await
            .unwrap();

        store.fail_reads(true);
        assert!(matches!(
            progress.initialize("learner-1").await,
            Err(ClientError::Store(_))
        ));
        assert!(matches!(
            progress.extend_streak(1).await,
            Err(ClientError::Store(_))
        ));
        store.fail_reads(false);

        let snap = progress.snapshot_read().await.unwrap();
        assert_eq!(snap.total_xp, 500);
        assert_eq!(snap.streak, 7);
        assert_eq!(snap.level, 3);
    }

    #[tokio::test]
    async fn write_failure_is_reported() {
        let (progress, _clock, store) = progress();
        progress.initialize("learner-1").await.unwrap();
        store.fail_writes(true);

        assert!(matches!(
            progress.apply_delta(&ProgressDelta::xp(5)).await,
            Err(ClientError::Store(_))
        ));
    }
}
