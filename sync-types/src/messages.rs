//! Requests and responses exchanged with the remote work source.
//!
//! These are transport-neutral; an adapter maps them onto whatever wire
//! format the server speaks.

use serde::{Deserialize, Serialize};

use crate::{Category, Difficulty};

/// Ask the remote source to issue one work item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRequest {
    /// Topic to draw the item from.
    pub category: Category,
    /// Optional difficulty hint.
    pub difficulty: Option<Difficulty>,
}

/// A work item as issued by the remote source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssuedItem {
    /// Server-side identifier, echoed back on submission.
    pub item_id: String,
    /// Opaque item body.
    pub payload: serde_json::Value,
}

/// Submit one answer to the remote source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitRequest {
    /// Server-side identifier of the answered item.
    pub item_id: String,
    /// The answer as typed.
    pub answer: String,
    /// Time taken to answer, in milliseconds.
    pub elapsed_ms: u64,
}

/// The remote source's verdict on a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitReceipt {
    /// Whether the server accepted (recorded) the result.
    pub accepted: bool,
    /// Reward granted for this result (experience points).
    #[serde(default)]
    pub reward: u64,
    /// Optional server feedback.
    #[serde(default)]
    pub feedback: Option<String>,
}

impl SubmitReceipt {
    /// An accepting receipt with the given reward.
    pub fn accepted(reward: u64) -> Self {
        Self {
            accepted: true,
            reward,
            feedback: None,
        }
    }

    /// A rejecting receipt with a reason.
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            accepted: false,
            reward: 0,
            feedback: Some(reason.into()),
        }
    }
}
