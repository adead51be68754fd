//! Records persisted by the offline engine, plus the transient drain report.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::{Category, IssuedItem, ItemId, ResultId, SubmitRequest, SyncError, Timestamp};

/// Difficulty tier requested from, and reported by, the remote work source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    /// Score below 0.2.
    Novice,
    /// Score in [0.2, 0.4).
    Beginner,
    /// Score in [0.4, 0.6).
    Intermediate,
    /// Score in [0.6, 0.8).
    Advanced,
    /// Score of 0.8 and above.
    Expert,
}

impl Difficulty {
    /// Numeric hint sent to the remote source (midpoint of the tier band).
    pub fn hint(&self) -> f64 {
        match self {
            Difficulty::Novice => 0.1,
            Difficulty::Beginner => 0.3,
            Difficulty::Intermediate => 0.5,
            Difficulty::Advanced => 0.7,
            Difficulty::Expert => 0.9,
        }
    }

    /// Map a difficulty score in [0, 1] to its tier.
    pub fn from_score(score: f64) -> Self {
        if score < 0.2 {
            Difficulty::Novice
        } else if score < 0.4 {
            Difficulty::Beginner
        } else if score < 0.6 {
            Difficulty::Intermediate
        } else if score < 0.8 {
            Difficulty::Advanced
        } else {
            Difficulty::Expert
        }
    }

    /// Lowercase tier name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Novice => "novice",
            Difficulty::Beginner => "beginner",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
            Difficulty::Expert => "expert",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "novice" => Ok(Difficulty::Novice),
            "beginner" => Ok(Difficulty::Beginner),
            "intermediate" => Ok(Difficulty::Intermediate),
            "advanced" => Ok(Difficulty::Advanced),
            "expert" => Ok(Difficulty::Expert),
            other => Err(SyncError::InvalidData(format!(
                "unknown difficulty tier: {other}"
            ))),
        }
    }
}

/// A pre-fetched work item waiting to be served offline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedItem {
    /// Local identifier, unique per cached copy.
    pub id: ItemId,
    /// Topic the item was fetched for.
    pub category: Category,
    /// Difficulty the item was requested at, if any.
    pub difficulty: Option<Difficulty>,
    /// Identifier assigned by the remote work source (used when submitting).
    pub remote_id: String,
    /// The work item exactly as received.
    pub payload: serde_json::Value,
    /// When the item entered the cache.
    pub cached_at: Timestamp,
    /// `cached_at + ttl`; the item is unusable from this instant on.
    pub expires_at: Timestamp,
}

impl CachedItem {
    /// Wrap a freshly issued item, stamping it with `now` and `now + ttl`.
    pub fn from_issued(
        issued: IssuedItem,
        category: Category,
        difficulty: Option<Difficulty>,
        now: Timestamp,
        ttl: Duration,
    ) -> Self {
        Self {
            id: ItemId::new(),
            category,
            difficulty,
            remote_id: issued.item_id,
            payload: issued.payload,
            cached_at: now,
            expires_at: now.plus(ttl),
        }
    }

    /// An item is valid strictly before its expiry instant.
    pub fn is_valid_at(&self, now: Timestamp) -> bool {
        now < self.expires_at
    }
}

/// A locally recorded answer that the server has not yet confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingResult {
    /// Time-ordered local identifier.
    pub id: ResultId,
    /// Remote identifier of the work item that was answered.
    pub item_id: String,
    /// The user's answer, verbatim.
    pub answer: String,
    /// Time the user took to answer, in milliseconds.
    pub elapsed_ms: u64,
    /// Topic of the answered item.
    pub category: Category,
    /// When the answer was recorded.
    pub created_at: Timestamp,
    /// Failed submission attempts so far.
    #[serde(default)]
    pub attempts: u32,
    /// Diagnostic from the most recent failed attempt.
    #[serde(default)]
    pub last_error: Option<String>,
}

impl PendingResult {
    /// Record a new answer with a fresh id and zero attempts.
    pub fn new(
        item_id: impl Into<String>,
        answer: impl Into<String>,
        elapsed_ms: u64,
        category: Category,
        now: Timestamp,
    ) -> Self {
        Self {
            id: ResultId::new(),
            item_id: item_id.into(),
            answer: answer.into(),
            elapsed_ms,
            category,
            created_at: now,
            attempts: 0,
            last_error: None,
        }
    }

    /// Build the request that submits this result to the remote source.
    pub fn to_submit_request(&self) -> SubmitRequest {
        SubmitRequest {
            item_id: self.item_id.clone(),
            answer: self.answer.clone(),
            elapsed_ms: self.elapsed_ms,
        }
    }
}

/// Locally mirrored progress used for instant feedback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    /// Owner of this snapshot.
    pub user_id: String,
    /// Total experience points.
    pub total_xp: u64,
    /// Level derived from `total_xp`.
    pub level: u32,
    /// Consecutive-practice streak.
    pub streak: u32,
    /// Mastery estimate per category, each in [0, 1].
    pub mastery: BTreeMap<Category, f64>,
    /// When any field last changed.
    pub last_updated: Timestamp,
}

impl ProgressSnapshot {
    /// A fresh snapshot at level 1 with no progress.
    pub fn new(user_id: impl Into<String>, now: Timestamp) -> Self {
        Self {
            user_id: user_id.into(),
            total_xp: 0,
            level: 1,
            streak: 0,
            mastery: BTreeMap::new(),
            last_updated: now,
        }
    }

    /// Mastery for a category, 0.0 when never practiced.
    pub fn mastery_for(&self, category: &Category) -> f64 {
        self.mastery.get(category).copied().unwrap_or(0.0)
    }
}

/// Changes to merge into a [`ProgressSnapshot`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressDelta {
    /// Signed change to total XP.
    pub xp: i64,
    /// Signed change to mastery per category.
    pub mastery: BTreeMap<Category, f64>,
    /// Number of practice units to add to the streak.
    pub streak: u32,
}

impl ProgressDelta {
    /// A delta that only changes XP.
    pub fn xp(xp: i64) -> Self {
        Self {
            xp,
            ..Self::default()
        }
    }

    /// Add a mastery change for one category.
    pub fn with_mastery(mut self, category: impl Into<Category>, change: f64) -> Self {
        *self.mastery.entry(category.into()).or_insert(0.0) += change;
        self
    }

    /// Extend the streak by `n`.
    pub fn with_streak(mut self, n: u32) -> Self {
        self.streak = self.streak.saturating_add(n);
        self
    }

    /// True when applying this delta would change nothing but the timestamp.
    pub fn is_empty(&self) -> bool {
        self.xp == 0 && self.streak == 0 && self.mastery.values().all(|v| *v == 0.0)
    }
}

/// Local counters about offline activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfflineStats {
    /// Results recorded locally (every enqueue counts).
    pub answered_offline: u64,
    /// Results confirmed by the server.
    pub synced: u64,
    /// Results discarded by the retry policy or by the host.
    pub discarded: u64,
}

/// Report of one drain. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncOutcome {
    /// Results the server accepted.
    pub succeeded: u32,
    /// Results that failed and remain queued (or were discarded).
    pub failed: u32,
    /// Sum of rewards granted for accepted results.
    pub reward: u64,
    /// One human-readable line per failure.
    pub diagnostics: Vec<String>,
    /// Why the drain did nothing, when it did nothing.
    pub note: Option<String>,
    /// Results dropped by the retry policy during this drain.
    pub discarded: Vec<PendingResult>,
}

impl SyncOutcome {
    /// Note attached when a drain is already running.
    pub const ALREADY_RUNNING: &'static str = "sync already in progress";
    /// Note attached when connectivity is absent.
    pub const OFFLINE: &'static str = "device is offline";

    /// A zero-effect outcome carrying an explanatory note.
    pub fn skipped(note: &str) -> Self {
        Self {
            note: Some(note.to_string()),
            ..Self::default()
        }
    }

    /// Total submissions attempted.
    pub fn attempted(&self) -> u32 {
        self.succeeded + self.failed
    }

    /// True when this drain was skipped because another one is running.
    pub fn is_already_running(&self) -> bool {
        self.note.as_deref() == Some(Self::ALREADY_RUNNING)
    }

    /// True when this drain was skipped because the device is offline.
    pub fn is_offline(&self) -> bool {
        self.note.as_deref() == Some(Self::OFFLINE)
    }
}
