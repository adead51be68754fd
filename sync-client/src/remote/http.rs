//! HTTP work source speaking the practice server's JSON API.
//!
//! - `POST /api/v1/questions/generate` issues a question
//! - `POST /api/v1/answers/validate` grades an answer
//!
//! A graded answer counts as accepted whether or not it was correct; the
//! reward reflects correctness.

use std::time::Duration;

use async_trait::async_trait;
use practice_sync_types::{IssueRequest, IssuedItem, SubmitReceipt, SubmitRequest};
use serde::{Deserialize, Serialize};

use super::{RemoteError, WorkSource};

/// XP for a correct answer.
pub const CORRECT_ANSWER_XP: u64 = 10;
/// Bonus XP for a correct answer given quickly.
pub const QUICK_ANSWER_XP: u64 = 5;
/// Answers faster than this earn the quick bonus.
pub const QUICK_ANSWER_MS: u64 = 10_000;

/// Connection settings for [`HttpWorkSource`].
#[derive(Debug, Clone)]
pub struct HttpWorkSourceConfig {
    /// Server root, e.g. `http://localhost:8000`.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for HttpWorkSourceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Serialize)]
struct GenerateBody<'a> {
    topic_slug: &'a str,
    difficulty: Option<f64>,
    multiple_choice: bool,
}

#[derive(Debug, Serialize)]
struct ValidateBody<'a> {
    question_id: &'a str,
    user_answer: &'a str,
    response_time_ms: u64,
}

#[derive(Debug, Deserialize)]
struct ValidateReply {
    is_correct: bool,
    #[serde(default)]
    feedback: Option<String>,
}

/// Work source backed by the practice server's HTTP API.
#[derive(Debug, Clone)]
pub struct HttpWorkSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpWorkSource {
    /// Build a source with its own HTTP client.
    pub fn new(config: HttpWorkSourceConfig) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RemoteError::Protocol(format!("client setup failed: {e}")))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// XP the server's grading is worth locally.
pub fn reward_for(is_correct: bool, elapsed_ms: u64) -> u64 {
    match (is_correct, elapsed_ms < QUICK_ANSWER_MS) {
        (false, _) => 0,
        (true, false) => CORRECT_ANSWER_XP,
        (true, true) => CORRECT_ANSWER_XP + QUICK_ANSWER_XP,
    }
}

pub(crate) fn map_reqwest_error(e: reqwest::Error) -> RemoteError {
    if e.is_timeout() {
        RemoteError::Timeout
    } else if e.is_decode() {
        RemoteError::Protocol(e.to_string())
    } else {
        RemoteError::Unreachable(e.to_string())
    }
}

#[async_trait]
impl WorkSource for HttpWorkSource {
    async fn issue(&self, request: IssueRequest) -> Result<IssuedItem, RemoteError> {
        let response = self
            .client
            .post(self.url("/api/v1/questions/generate"))
            .json(&GenerateBody {
                topic_slug: request.category.as_str(),
                difficulty: request.difficulty.map(|d| d.hint()),
                multiple_choice: true,
            })
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::Rejected(format!("generate returned {status}")));
        }

        let payload: serde_json::Value = response.json().await.map_err(map_reqwest_error)?;
        let item_id = payload
            .get("question_id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| RemoteError::Protocol("response has no question_id".into()))?
            .to_string();

        Ok(IssuedItem { item_id, payload })
    }

    async fn submit(&self, request: SubmitRequest) -> Result<SubmitReceipt, RemoteError> {
        let response = self
            .client
            .post(self.url("/api/v1/answers/validate"))
            .json(&ValidateBody {
                question_id: &request.item_id,
                user_answer: &request.answer,
                response_time_ms: request.elapsed_ms,
            })
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if status.is_client_error() {
            // The server will never take this result; report it as a verdict.
            return Ok(SubmitReceipt::rejected(format!("validate returned {status}")));
        }
        if !status.is_success() {
            return Err(RemoteError::Rejected(format!("validate returned {status}")));
        }

        let reply: ValidateReply = response.json().await.map_err(map_reqwest_error)?;
        Ok(SubmitReceipt {
            accepted: true,
            reward: reward_for(reply.is_correct, request.elapsed_ms),
            feedback: reply.feedback,
        })
    }
}
