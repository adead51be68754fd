//! Bookkeeping for one reconciliation pass.
//!
//! A drain works from a snapshot of the pending log. Each submission is
//! recorded into a [`DrainLedger`] as accepted or failed; when the pass ends
//! the ledger yields the exact ids to remove and the failures to record,
//! which the caller applies to a freshly re-read log via
//! [`PendingLog::settle`](crate::PendingLog::settle).

use std::fmt;

use practice_sync_types::{PendingResult, ResultId, SyncOutcome};
use serde::{Deserialize, Serialize};

/// How many times a result may fail before it is discarded.
///
/// The default is unbounded: failed results stay queued forever.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Failed attempts after which a result is dropped. `None` keeps it forever.
    #[serde(default)]
    pub max_attempts: Option<u32>,
}

impl RetryPolicy {
    /// Keep retrying forever.
    pub fn unbounded() -> Self {
        Self { max_attempts: None }
    }

    /// Discard a result once it has failed `max_attempts` times.
    pub fn bounded(max_attempts: u32) -> Self {
        Self {
            max_attempts: Some(max_attempts),
        }
    }

    /// Whether a result with this many failed attempts should be dropped.
    pub fn is_exhausted(&self, attempts: u32) -> bool {
        match self.max_attempts {
            Some(max) => attempts >= max,
            None => false,
        }
    }
}

/// Accumulates per-result verdicts during a drain.
#[derive(Debug, Default)]
pub struct DrainLedger {
    confirmed: Vec<ResultId>,
    failures: Vec<(ResultId, String)>,
    outcome: SyncOutcome,
}

impl DrainLedger {
    /// Start an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that the server accepted `result` and granted `reward`.
    pub fn accepted(&mut self, result: &PendingResult, reward: u64) {
        self.confirmed.push(result.id);
        self.outcome.succeeded += 1;
        self.outcome.reward = self.outcome.reward.saturating_add(reward);
    }

    /// Record that submitting `result` failed.
    pub fn failed(&mut self, result: &PendingResult, reason: impl fmt::Display) {
        let reason = reason.to_string();
        self.outcome.failed += 1;
        self.outcome.diagnostics.push(format!(
            "result {} (item {}): {}",
            result.id, result.item_id, reason
        ));
        self.failures.push((result.id, reason));
    }

    /// Ids the server confirmed, in submission order.
    pub fn confirmed(&self) -> &[ResultId] {
        &self.confirmed
    }

    /// Failed ids with their diagnostics.
    pub fn failures(&self) -> &[(ResultId, String)] {
        &self.failures
    }

    /// Reward accumulated so far.
    pub fn reward(&self) -> u64 {
        self.outcome.reward
    }

    /// Close the ledger, attaching any results the retry policy dropped.
    pub fn finish(self, discarded: Vec<PendingResult>) -> SyncOutcome {
        SyncOutcome {
            discarded,
            ..self.outcome
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use practice_sync_types::Timestamp;

    fn result(item: &str) -> PendingResult {
        PendingResult::new(item, "x", 500, "fractions".into(), Timestamp::from_millis(1))
    }

    #[test]
    fn default_policy_is_unbounded() {
        let policy = RetryPolicy::default();
        assert_eq!(policy, RetryPolicy::unbounded());
        assert!(!policy.is_exhausted(u32::MAX));
    }

    #[test]
    fn bounded_policy_exhausts_at_limit() {
        let policy = RetryPolicy::bounded(3);
        assert!(!policy.is_exhausted(2));
        assert!(policy.is_exhausted(3));
        assert!(policy.is_exhausted(4));
    }

    #[test]
    fn policy_parses_from_toml() {
        let policy: RetryPolicy = toml::from_str("max_attempts = 5").unwrap();
        assert_eq!(policy, RetryPolicy::bounded(5));

        let policy: RetryPolicy = toml::from_str("").unwrap();
        assert_eq!(policy, RetryPolicy::unbounded());
    }

    #[test]
    fn ledger_tallies_mixed_batch() {
        let ok1 = result("q1");
        let bad = result("q2");
        let ok2 = result("q3");

        let mut ledger = DrainLedger::new();
        ledger.accepted(&ok1, 10);
        ledger.failed(&bad, "server rejected result: unknown question");
        ledger.accepted(&ok2, 15);

        assert_eq!(ledger.confirmed(), &[ok1.id, ok2.id]);
        assert_eq!(ledger.failures().len(), 1);
        assert_eq!(ledger.reward(), 25);

        let outcome = ledger.finish(Vec::new());
        assert_eq!(outcome.succeeded, 2);
        assert_eq!(outcome.failed, 1);
        assert_eq!(outcome.reward, 25);
        assert_eq!(outcome.diagnostics.len(), 1);
        assert!(outcome.diagnostics[0].contains("q2"));
        assert!(outcome.diagnostics[0].contains("unknown question"));
        assert!(outcome.note.is_none());
    }

    #[test]
    fn empty_ledger_is_zero_outcome() {
        let outcome = DrainLedger::new().finish(Vec::new());
        assert_eq!(outcome, SyncOutcome::default());
    }

    #[test]
    fn finish_attaches_discards() {
        let dropped = result("q9");
        let mut ledger = DrainLedger::new();
        ledger.failed(&dropped, "timeout");
        let outcome = ledger.finish(vec![dropped.clone()]);
        assert_eq!(outcome.discarded, vec![dropped]);
    }
}
