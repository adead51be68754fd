//! Ordered log of results awaiting server confirmation.
//!
//! The log is FIFO by enqueue order. Removal is always by exact id so that
//! results appended while a drain was in flight are never dropped.

use std::collections::{HashMap, HashSet};

use practice_sync_types::{PendingResult, ResultId};

use crate::RetryPolicy;

/// FIFO log of pending results.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingLog {
    entries: Vec<PendingResult>,
}

impl PendingLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a log from persisted entries.
    pub fn from_entries(entries: Vec<PendingResult>) -> Self {
        Self { entries }
    }

    /// Consume the log, yielding its entries for persistence.
    pub fn into_entries(self) -> Vec<PendingResult> {
        self.entries
    }

    /// Entries in enqueue order.
    pub fn entries(&self) -> &[PendingResult] {
        &self.entries
    }

    /// Append a result at the tail.
    pub fn push(&mut self, result: PendingResult) {
        self.entries.push(result);
    }

    /// Number of pending results.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the log is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove exactly the listed ids, keeping the order of the rest.
    ///
    /// Returns how many entries were removed. Unknown ids are ignored.
    pub fn remove(&mut self, ids: &[ResultId]) -> usize {
        if ids.is_empty() {
            return 0;
        }
        let ids: HashSet<&ResultId> = ids.iter().collect();
        let before = self.entries.len();
        self.entries.retain(|entry| !ids.contains(&entry.id));
        before - self.entries.len()
    }

    /// Bump the attempt counter and store the diagnostic for each failure.
    pub fn record_failures(&mut self, failures: &[(ResultId, String)]) {
        if failures.is_empty() {
            return;
        }
        let failures: HashMap<&ResultId, &String> =
            failures.iter().map(|(id, reason)| (id, reason)).collect();
        for entry in &mut self.entries {
            if let Some(reason) = failures.get(&entry.id) {
                entry.attempts = entry.attempts.saturating_add(1);
                entry.last_error = Some((*reason).clone());
            }
        }
    }

    /// Remove and return entries the policy says are out of attempts.
    pub fn take_exhausted(&mut self, policy: &RetryPolicy) -> Vec<PendingResult> {
        let (exhausted, kept) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition(|entry| policy.is_exhausted(entry.attempts));
        self.entries = kept;
        exhausted
    }

    /// Apply the result of a drain to the current log.
    ///
    /// Confirmed ids are removed, failures are recorded, then exhausted
    /// entries are discarded and returned. Entries not mentioned in either
    /// list (appended since the drain started) are left untouched.
    pub fn settle(
        &mut self,
        confirmed: &[ResultId],
        failures: &[(ResultId, String)],
        policy: &RetryPolicy,
    ) -> Vec<PendingResult> {
        self.remove(confirmed);
        self.record_failures(failures);
        self.take_exhausted(policy)
    }
}
