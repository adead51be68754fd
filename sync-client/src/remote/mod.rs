//! Remote work source abstraction.
//!
//! The engine only ever talks to the server through [`WorkSource`]:
//! - `issue()` asks for one work item in a category
//! - `submit()` hands in one answer and returns the server's verdict
//!
//! Timeouts are the implementation's business; a timed-out call simply
//! returns [`RemoteError::Timeout`].

mod http;
mod mock;

pub use http::{HttpWorkSource, HttpWorkSourceConfig};
pub use mock::MockWorkSource;

use async_trait::async_trait;
use practice_sync_types::{IssueRequest, IssuedItem, SubmitReceipt, SubmitRequest};
use thiserror::Error;

/// Remote work source errors.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The call did not complete in time.
    #[error("request timed out")]
    Timeout,

    /// The server could not be reached.
    #[error("server unreachable: {0}")]
    Unreachable(String),

    /// The server answered with an error status.
    #[error("server rejected request: {0}")]
    Rejected(String),

    /// The server answered with something we could not understand.
    #[error("protocol error: {0}")]
    Protocol(String),
}

/// Source of work items and sink for results.
#[async_trait]
pub trait WorkSource: Send + Sync {
    /// Request one work item.
    async fn issue(&self, request: IssueRequest) -> Result<IssuedItem, RemoteError>;

    /// Submit one result.
    ///
    /// `Ok` with `accepted = false` is a valid verdict, distinct from a
    /// transport failure.
    async fn submit(&self, request: SubmitRequest) -> Result<SubmitReceipt, RemoteError>;
}
