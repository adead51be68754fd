//! Item Cache: work items fetched ahead of need for offline use.
//!
//! The cache is a convenience, not a record of anything the user did, so it
//! never fails its caller: unreadable state is treated as empty and write
//! failures are logged and swallowed.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use practice_sync_core::ItemPool;
use practice_sync_types::{CachedItem, Category, Difficulty, IssueRequest, RecordKind};
use tokio::sync::Mutex;

use crate::clock::Clock;
use crate::network::NetworkMonitor;
use crate::remote::WorkSource;
use crate::store::{read_or_default, write_record, KvStore};

/// Cache of pre-fetched work items.
pub struct ItemCache {
    store: Arc<dyn KvStore>,
    clock: Arc<dyn Clock>,
    source: Arc<dyn WorkSource>,
    monitor: Arc<NetworkMonitor>,
    ttl: Duration,
    batch_limit: usize,
    lock: Mutex<()>,
}

impl ItemCache {
    /// Create a cache persisted in `store`.
    pub fn new(
        store: Arc<dyn KvStore>,
        clock: Arc<dyn Clock>,
        source: Arc<dyn WorkSource>,
        monitor: Arc<NetworkMonitor>,
        ttl: Duration,
        batch_limit: usize,
    ) -> Self {
        Self {
            store,
            clock,
            source,
            monitor,
            ttl,
            batch_limit,
            lock: Mutex::new(()),
        }
    }

    async fn load(&self) -> ItemPool {
        ItemPool::from_items(read_or_default(self.store.as_ref(), RecordKind::CachedItems).await)
    }

    async fn save(&self, pool: &ItemPool) -> bool {
        match write_record(self.store.as_ref(), RecordKind::CachedItems, &pool.items()).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Failed to persist item cache: {}", e);
                false
            }
        }
    }

    /// Fetch up to `count` items of `category` and cache them.
    ///
    /// Returns 0 without touching the network when offline. Individual
    /// fetch failures are skipped. Returns how many items were actually
    /// added.
    pub async fn fill(
        &self,
        category: impl Into<Category>,
        count: usize,
        difficulty: Option<Difficulty>,
    ) -> usize {
        let category = category.into();
        if !self.monitor.check_online().await {
            tracing::debug!("Skipping fill for {}: offline", category);
            return 0;
        }

        let wanted = count.min(self.batch_limit);
        if wanted < count {
            tracing::debug!("Fill for {} capped at {} items", category, wanted);
        }

        let mut fetched = Vec::with_capacity(wanted);
        for _ in 0..wanted {
            let request = IssueRequest {
                category: category.clone(),
                difficulty,
            };
            match self.source.issue(request).await {
                Ok(issued) => fetched.push(issued),
                Err(e) => tracing::warn!("Failed to fetch item for {}: {}", category, e),
            }
        }
        if fetched.is_empty() {
            return 0;
        }

        let _lock = self.lock.lock().await;
        let now = self.clock.now();
        let mut pool = self.load().await;
        let mut new_ids = Vec::with_capacity(fetched.len());
        for issued in fetched {
            let item = CachedItem::from_issued(issued, category.clone(), difficulty, now, self.ttl);
            new_ids.push(item.id);
            pool.push(item);
        }
        pool.sweep(now);
        // Only what survived the sweep counts as added.
        let added = pool
            .items()
            .iter()
            .filter(|item| new_ids.contains(&item.id))
            .count();

        if !self.save(&pool).await {
            return 0;
        }
        tracing::info!("Cached {} items for {}", added, category);
        added
    }

    /// Fill several categories in one call; returns the total added.
    pub async fn fill_many(
        &self,
        categories: &[Category],
        per_category: usize,
        difficulty: Option<Difficulty>,
    ) -> usize {
        let mut total = 0;
        for category in categories {
            total += self.fill(category.clone(), per_category, difficulty).await;
        }
        total
    }

    /// Remove and return the earliest valid item of `category`.
    ///
    /// An item is handed out at most once: if its removal cannot be
    /// persisted, nothing is returned.
    pub async fn take(&self, category: impl Into<Category>) -> Option<CachedItem> {
        let category = category.into();
        let _lock = self.lock.lock().await;

        let mut pool = self.load().await;
        let before = pool.len();
        let taken = pool.take(&category, self.clock.now());
        if taken.is_none() && pool.len() == before {
            return None;
        }
        if !self.save(&pool).await {
            return None;
        }
        if let Some(item) = &taken {
            tracing::debug!("Served cached item {} ({})", item.remote_id, category);
        }
        taken
    }

    /// Number of valid items, optionally for one category only.
    pub async fn count(&self, category: Option<&Category>) -> usize {
        let _lock = self.lock.lock().await;

        let mut pool = self.load().await;
        let before = pool.len();
        let count = pool.count(category, self.clock.now());
        if pool.len() != before {
            self.save(&pool).await;
        }
        count
    }

    /// Valid item count per category.
    pub async fn breakdown(&self) -> BTreeMap<Category, usize> {
        let _lock = self.lock.lock().await;

        let mut pool = self.load().await;
        let before = pool.len();
        let counts = pool.breakdown(self.clock.now());
        if pool.len() != before {
            self.save(&pool).await;
        }
        counts
    }

    /// Purge expired items; returns how many were removed.
    pub async fn sweep(&self) -> usize {
        let _lock = self.lock.lock().await;

        let mut pool = self.load().await;
        let removed = pool.sweep(self.clock.now());
        if removed > 0 && self.save(&pool).await {
            tracing::info!("Swept {} expired items", removed);
            return removed;
        }
        0
    }

    /// Drop every cached item.
    pub async fn clear(&self) {
        let _lock = self.lock.lock().await;
        if let Err(e) = self.store.remove(RecordKind::CachedItems.key()).await {
            tracing::warn!("Failed to clear item cache: {}", e);
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
    use practice_sync_core::ITEM_TTL;
    use practice_sync_types::Timestamp;

    const HOUR: Duration = Duration::from_secs(60 * 60);

    struct Fixture {
        cache: ItemCache,
        store: MemoryStore,
        clock: ManualClock,
        source: MockWorkSource,
        probe: ManualProbe,
    }

    fn fixture() -> Fixture {
        fixture_with_ttl(ITEM_TTL)
    }

    fn fixture_with_ttl(ttl: Duration) -> Fixture {
        let store = MemoryStore::new();
        let clock = ManualClock::new(Timestamp::from_millis(1_700_000_000_000));
        let source = MockWorkSource::new();
        let probe = ManualProbe::new(true);
        let monitor = Arc::new(NetworkMonitor::new(Arc::new(probe.clone())));
        let cache = ItemCache::new(
            Arc::new(store.clone()),
            Arc::new(clock.clone()),
            Arc::new(source.clone()),
            monitor,
            ttl,
            50,
        );
        Fixture {
            cache,
            store,
            clock,
            source,
            probe,
        }
    }

    #[tokio::test]
    async fn fill_then_take_in_order() {
        let f = fixture();
        assert_eq!(f.cache.fill("arithmetic", 3, None).await, 3);

        let first = f.cache.take("arithmetic").await.unwrap();
        let second = f.cache.take("arithmetic").await.unwrap();
        assert_eq!(first.remote_id, "q-1");
        assert_eq!(second.remote_id, "q-2");
        assert_eq!(f.cache.count(None).await, 1);
    }

    #[tokio::test]
    async fn fill_offline_does_nothing() {
        let f = fixture();
        f.probe.set_online(false);

        assert_eq!(f.cache.fill("arithmetic", 5, None).await, 0);
        assert!(f.source.issue_requests().is_empty());
    }

    #[tokio::test]
    async fn fill_skips_failed_fetches() {
        let f = fixture();
        f.source.fail_next_issue("server busy");

        assert_eq!(
            f.cache
                .fill("fractions", 3, Some(Difficulty::Intermediate))
                .await,
            2
        );
        assert_eq!(f.source.issue_requests().len(), 3);
        let item = f.cache.take("fractions").await.unwrap();
        assert_eq!(item.difficulty, Some(Difficulty::Intermediate));
    }

    #[tokio::test]
    async fn fill_respects_batch_limit() {
        let f = fixture();
        assert_eq!(f.cache.fill("geometry", 500, None).await, 50);
    }

    #[tokio::test]
    async fn fill_swallows_write_failure() {
        let f = fixture();
        f.store.fail_writes(true);
        assert_eq!(f.cache.fill("arithmetic", 2, None).await, 0);
    }

    #[tokio::test]
    async fn fill_counts_only_items_that_outlive_the_sweep() {
        let f = fixture_with_ttl(Duration::ZERO);
        assert_eq!(f.cache.fill("arithmetic", 3, None).await, 0);
        assert_eq!(f.source.issue_requests().len(), 3);
        assert_eq!(f.cache.count(None).await, 0);
    }

    #[tokio::test]
    async fn items_expire_after_ttl() {
        let f = fixture();
        f.cache.fill("arithmetic", 3, None).await;

        f.clock.advance(25 * HOUR);
        assert!(f.cache.take("arithmetic").await.is_none());
        assert_eq!(f.cache.count(Some(&"arithmetic".into())).await, 0);
    }

    #[tokio::test]
    async fn take_withholds_item_if_removal_not_persisted() {
        let f = fixture();
        f.cache.fill("arithmetic", 1, None).await;

        f.store.fail_writes(true);
        assert!(f.cache.take("arithmetic").await.is_none());

        f.store.fail_writes(false);
        assert!(f.cache.take("arithmetic").await.is_some());
        assert!(f.cache.take("arithmetic").await.is_none());
    }

    #[tokio::test]
    async fn sweep_is_idempotent() {
        let f = fixture();
        f.cache.fill("arithmetic", 2, None).await;
        f.clock.advance(12 * HOUR);
        f.cache.fill("ratios", 1, None).await;
        f.clock.advance(13 * HOUR);

        assert_eq!(f.cache.sweep().await, 2);
        assert_eq!(f.cache.sweep().await, 0);
        assert_eq!(f.cache.count(None).await, 1);
    }

    #[tokio::test]
    async fn fill_many_and_breakdown() {
        let f = fixture();
        let categories: Vec<Category> = vec!["arithmetic".into(), "percentages".into()];
        assert_eq!(f.cache.fill_many(&categories, 2, None).await, 4);

        let counts = f.cache.breakdown().await;
        assert_eq!(counts.get(&Category::from("arithmetic")), Some(&2));
        assert_eq!(counts.get(&Category::from("percentages")), Some(&2));

        f.cache.clear().await;
        assert_eq!(f.cache.count(None).await, 0);
    }
}
