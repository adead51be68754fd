//! Item pool for practice-sync.
//!
//! This module provides the in-memory model of the item cache:
//! - Time-to-live expiry (an item is valid strictly before `expires_at`)
//! - Lazy purging: every read sweeps expired items first
//! - "First valid, then remove" consumption per category
//!
//! The pool never reads the clock itself; callers pass `now` in. The
//! sync-client cache loads a pool from storage, mutates it, and writes it
//! back.

use std::collections::BTreeMap;
use std::time::Duration;

use practice_sync_types::{CachedItem, Category, Timestamp};

/// Default lifetime of a cached item: 24 hours.
pub const ITEM_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Pool of cached items, kept in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemPool {
    items: Vec<CachedItem>,
}

impl ItemPool {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a pool from persisted items.
    pub fn from_items(items: Vec<CachedItem>) -> Self {
        Self { items }
    }

    /// Consume the pool, yielding its items for persistence.
    pub fn into_items(self) -> Vec<CachedItem> {
        self.items
    }

    /// All items currently held, including any not yet swept.
    pub fn items(&self) -> &[CachedItem] {
        &self.items
    }

    /// Append a freshly fetched item.
    pub fn push(&mut self, item: CachedItem) {
        self.items.push(item);
    }

    /// Drop every item that has expired at `now`.
    ///
    /// Returns the number of items removed. Calling it again with the same
    /// `now` removes nothing.
    pub fn sweep(&mut self, now: Timestamp) -> usize {
        let before = self.items.len();
        self.items.retain(|item| item.is_valid_at(now));
        before - self.items.len()
    }

    /// Remove and return the earliest valid item of `category`.
    ///
    /// Sweeps first, so an expired item is never returned.
    pub fn take(&mut self, category: &Category, now: Timestamp) -> Option<CachedItem> {
        self.sweep(now);
        let index = self
            .items
            .iter()
            .enumerate()
            .filter(|(_, item)| &item.category == category)
            .min_by_key(|(_, item)| item.cached_at)
            .map(|(index, _)| index)?;
        Some(self.items.remove(index))
    }

    /// Number of valid items, optionally restricted to one category.
    pub fn count(&mut self, category: Option<&Category>, now: Timestamp) -> usize {
        self.sweep(now);
        match category {
            Some(category) => self
                .items
                .iter()
                .filter(|item| &item.category == category)
                .count(),
            None => self.items.len(),
        }
    }

    /// Valid item count per category.
    pub fn breakdown(&mut self, now: Timestamp) -> BTreeMap<Category, usize> {
        self.sweep(now);
        let mut counts = BTreeMap::new();
        for item in &self.items {
            *counts.entry(item.category.clone()).or_insert(0) += 1;
        }
        counts
    }

    /// Number of items held (swept or not).
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Remove every item.
    pub fn clear(&mut self) {
        self.items.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use practice_sync_types::IssuedItem;
    use serde_json::json;
    use std::collections::HashSet;

    const HOUR: Duration = Duration::from_secs(60 * 60);

    fn t(hours: u64) -> Timestamp {
        Timestamp::from_millis(0).plus(HOUR * hours as u32)
    }

    fn item(category: &str, remote_id: &str, at: Timestamp) -> CachedItem {
        CachedItem::from_issued(
            IssuedItem {
                item_id: remote_id.into(),
                payload: json!({ "id": remote_id }),
            },
            category.into(),
            None,
            at,
            ITEM_TTL,
        )
    }

    #[test]
    fn take_returns_earliest_of_category() {
        let mut pool = ItemPool::new();
        pool.push(item("arithmetic", "a1", t(1)));
        pool.push(item("fractions", "f1", t(1)));
        pool.push(item("arithmetic", "a2", t(2)));

        let taken = pool.take(&"arithmetic".into(), t(3)).unwrap();
        assert_eq!(taken.remote_id, "a1");
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn take_never_returns_expired_item() {
        let mut pool = ItemPool::new();
        pool.push(item("arithmetic", "old", t(0)));
        pool.push(item("arithmetic", "fresh", t(10)));

        // At T+24h the first item is exactly at expiry and must be skipped.
        let taken = pool.take(&"arithmetic".into(), t(24)).unwrap();
        assert_eq!(taken.remote_id, "fresh");
        assert!(pool.take(&"arithmetic".into(), t(24)).is_none());
    }

    #[test]
    fn take_is_at_most_once() {
        let mut pool = ItemPool::new();
        for i in 0..5 {
            pool.push(item("geometry", &format!("g{i}"), t(0)));
        }

        let mut seen = HashSet::new();
        while let Some(taken) = pool.take(&"geometry".into(), t(1)) {
            assert!(seen.insert(taken.id), "item served twice");
        }
        assert_eq!(seen.len(), 5);
    }

    #[test]
    fn take_from_unknown_category_is_none() {
        let mut pool = ItemPool::new();
        pool.push(item("arithmetic", "a1", t(0)));
        assert!(pool.take(&"trigonometry".into(), t(0)).is_none());
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn whole_batch_expires_after_ttl() {
        let mut pool = ItemPool::new();
        for i in 0..3 {
            pool.push(item("arithmetic", &format!("a{i}"), t(0)));
        }

        assert_eq!(pool.count(Some(&"arithmetic".into()), t(23)), 3);
        assert!(pool.take(&"arithmetic".into(), t(25)).is_none());
        assert_eq!(pool.count(Some(&"arithmetic".into()), t(25)), 0);
    }

    #[test]
    fn count_filters_by_category() {
        let mut pool = ItemPool::new();
        pool.push(item("arithmetic", "a1", t(0)));
        pool.push(item("arithmetic", "a2", t(0)));
        pool.push(item("ratios", "r1", t(0)));

        assert_eq!(pool.count(None, t(1)), 3);
        assert_eq!(pool.count(Some(&"ratios".into()), t(1)), 1);
        assert_eq!(pool.count(Some(&"algebra".into()), t(1)), 0);
    }

    #[test]
    fn sweep_is_idempotent() {
        let mut pool = ItemPool::new();
        pool.push(item("arithmetic", "old", t(0)));
        pool.push(item("arithmetic", "new", t(20)));

        assert_eq!(pool.sweep(t(30)), 1);
        assert_eq!(pool.sweep(t(30)), 0);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn breakdown_counts_valid_items_per_category() {
        let mut pool = ItemPool::new();
        pool.push(item("arithmetic", "a1", t(0)));
        pool.push(item("fractions", "f1", t(5)));
        pool.push(item("fractions", "f2", t(5)));

        let counts = pool.breakdown(t(26));
        assert_eq!(counts.get(&Category::from("arithmetic")), None);
        assert_eq!(counts.get(&Category::from("fractions")), Some(&2));
    }

    #[test]
    fn items_roundtrip_through_persistence_form() {
        let mut pool = ItemPool::new();
        pool.push(item("arithmetic", "a1", t(0)));
        let restored = ItemPool::from_items(pool.clone().into_items());
        assert_eq!(pool, restored);
    }

    #[test]
    fn clear_removes_all() {
        let mut pool = ItemPool::new();
        pool.push(item("arithmetic", "a1", t(0)));
        pool.clear();
        assert!(pool.is_empty());
    }
}
