//! Mock work source for testing.
//!
//! Issues numbered items, records every submission, and lets a test script
//! per-item verdicts, transport failures and latency.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use practice_sync_types::{IssueRequest, IssuedItem, SubmitReceipt, SubmitRequest};
use serde_json::json;

use super::{RemoteError, WorkSource};

/// Reward granted per accepted submission unless changed.
const DEFAULT_REWARD: u64 = 10;

/// Scripted outcome for one remote item id.
#[derive(Debug, Clone)]
enum Verdict {
    Reject(String),
    Fail(String),
}

/// Mock work source for testing.
///
/// Clones share state, so a test can keep a handle after giving one to the
/// engine.
#[derive(Debug, Clone, Default)]
pub struct MockWorkSource {
    inner: Arc<Mutex<MockWorkSourceInner>>,
}

#[derive(Debug, Default)]
struct MockWorkSourceInner {
    issued: u64,
    issue_requests: Vec<IssueRequest>,
    submissions: Vec<SubmitRequest>,
    verdicts: HashMap<String, Verdict>,
    reward: Option<u64>,
    submit_delay: Option<Duration>,
    fail_next_issue: Option<String>,
    fail_issues_after: Option<u64>,
    fail_next_submit: Option<String>,
}

impl MockWorkSource {
    /// Create a source that accepts everything.
    pub fn new() -> Self {
        Self::default()
    }

    fn inner(&self) -> MutexGuard<'_, MockWorkSourceInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Answer submissions for `item_id` with `accepted = false`.
    pub fn reject_item(&self, item_id: &str, reason: &str) {
        self.inner()
            .verdicts
            .insert(item_id.to_string(), Verdict::Reject(reason.to_string()));
    }

    /// Fail submissions for `item_id` with a transport error.
    pub fn fail_item(&self, item_id: &str, error: &str) {
        self.inner()
            .verdicts
            .insert(item_id.to_string(), Verdict::Fail(error.to_string()));
    }

    /// Forget every scripted verdict; everything is accepted from now on.
    pub fn accept_all(&self) {
        self.inner().verdicts.clear();
    }

    /// Reward granted per accepted submission.
    pub fn set_reward(&self, reward: u64) {
        self.inner().reward = Some(reward);
    }

    /// Delay every submission by `delay`.
    pub fn set_submit_delay(&self, delay: Duration) {
        self.inner().submit_delay = Some(delay);
    }

    /// Cause the next issue() to fail with the given error.
    pub fn fail_next_issue(&self, error: &str) {
        self.inner().fail_next_issue = Some(error.to_string());
    }

    /// Let `n` more issue() calls succeed, then fail every one after.
    pub fn fail_issues_after(&self, n: u64) {
        let mut inner = self.inner();
        inner.fail_issues_after = Some(inner.issued + n);
    }

    /// Cause the next submit() to fail with the given error.
    pub fn fail_next_submit(&self, error: &str) {
        self.inner().fail_next_submit = Some(error.to_string());
    }

    /// Every submission received, in order.
    pub fn submissions(&self) -> Vec<SubmitRequest> {
        self.inner().submissions.clone()
    }

    /// Number of submit() calls received.
    pub fn submit_calls(&self) -> usize {
        self.inner().submissions.len()
    }

    /// Every issue request received, in order.
    pub fn issue_requests(&self) -> Vec<IssueRequest> {
        self.inner().issue_requests.clone()
    }

    /// Clear all state (recordings and scripts).
    pub fn reset(&self) {
        *self.inner() = MockWorkSourceInner::default();
    }
}

#[async_trait]
impl WorkSource for MockWorkSource {
    async fn issue(&self, request: IssueRequest) -> Result<IssuedItem, RemoteError> {
        let mut inner = self.inner();
        inner.issue_requests.push(request.clone());

        if let Some(error) = inner.fail_next_issue.take() {
            return Err(RemoteError::Unreachable(error));
        }
        if inner
            .fail_issues_after
            .is_some_and(|limit| inner.issued >= limit)
        {
            return Err(RemoteError::Unreachable("issue quota exhausted".into()));
        }

        inner.issued += 1;
        let item_id = format!("q-{}", inner.issued);
        Ok(IssuedItem {
            payload: json!({
                "question_id": item_id,
                "topic": request.category.as_str(),
                "difficulty": request.difficulty.map(|d| d.hint()),
                "expression": format!("{} + {} = ?", inner.issued, inner.issued),
            }),
            item_id,
        })
    }

    async fn submit(&self, request: SubmitRequest) -> Result<SubmitReceipt, RemoteError> {
        let delay = {
            let mut inner = self.inner();
            inner.submissions.push(request.clone());
            inner.submit_delay
        };

        // Lock released before sleeping so concurrent callers are recorded.
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut inner = self.inner();
        if let Some(error) = inner.fail_next_submit.take() {
            return Err(RemoteError::Unreachable(error));
        }

        match inner.verdicts.get(&request.item_id) {
            Some(Verdict::Reject(reason)) => Ok(SubmitReceipt::rejected(reason.clone())),
            Some(Verdict::Fail(error)) => Err(RemoteError::Unreachable(error.clone())),
            None => Ok(SubmitReceipt::accepted(
                inner.reward.unwrap_or(DEFAULT_REWARD),
            )),
        }
    }
}
