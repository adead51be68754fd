//! Level curve and delta merging for the local progress mirror.
//!
//! Advancing from level `n` to `n + 1` costs `floor(100 * n^1.5)` XP. The
//! curve tops out at [`MAX_LEVEL`].

use practice_sync_types::{ProgressDelta, ProgressSnapshot, Timestamp};

/// Highest reachable level.
pub const MAX_LEVEL: u32 = 100;

/// XP needed to advance from `level` to the next one; 0 at the cap.
pub fn xp_for_next_level(level: u32) -> u64 {
    if level >= MAX_LEVEL {
        return 0;
    }
    let n = f64::from(level.max(1));
    (100.0 * n * n.sqrt()).floor() as u64
}

/// Total XP needed to reach `level` from zero.
pub fn xp_to_reach(level: u32) -> u64 {
    (1..level.min(MAX_LEVEL)).map(xp_for_next_level).sum()
}

/// Where a total XP value sits on the level curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelProgress {
    /// Current level, 1 through [`MAX_LEVEL`].
    pub level: u32,
    /// XP earned since reaching the current level.
    pub xp_this_level: u64,
    /// XP the current level costs in total; 0 at the cap.
    pub xp_to_next_level: u64,
}

impl LevelProgress {
    /// Fraction of the current level completed, 1.0 at the cap.
    pub fn fraction(&self) -> f64 {
        if self.xp_to_next_level == 0 {
            1.0
        } else {
            self.xp_this_level as f64 / self.xp_to_next_level as f64
        }
    }
}

/// Locate `total_xp` on the level curve.
pub fn level_progress(total_xp: u64) -> LevelProgress {
    let mut level = 1;
    let mut spent = 0u64;
    while level < MAX_LEVEL {
        let cost = xp_for_next_level(level);
        if total_xp < spent + cost {
            break;
        }
        spent += cost;
        level += 1;
    }
    LevelProgress {
        level,
        xp_this_level: total_xp - spent,
        xp_to_next_level: xp_for_next_level(level),
    }
}

/// Level for a total XP value.
pub fn level_for_xp(total_xp: u64) -> u32 {
    level_progress(total_xp).level
}

/// Merge `delta` into `snapshot`.
///
/// XP saturates at zero, mastery is clamped to [0, 1] per category, the
/// level is recomputed from the new XP and `last_updated` is set to `now`.
/// Returns true when the level went up.
pub fn apply_delta(snapshot: &mut ProgressSnapshot, delta: &ProgressDelta, now: Timestamp) -> bool {
    let old_level = snapshot.level;

    snapshot.total_xp = if delta.xp >= 0 {
        snapshot.total_xp.saturating_add(delta.xp.unsigned_abs())
    } else {
        snapshot.total_xp.saturating_sub(delta.xp.unsigned_abs())
    };

    for (category, change) in &delta.mastery {
        let current = snapshot.mastery_for(category);
        let updated = (current + change).clamp(0.0, 1.0);
        snapshot.mastery.insert(category.clone(), updated);
    }

    snapshot.streak = snapshot.streak.saturating_add(delta.streak);
    snapshot.level = level_for_xp(snapshot.total_xp);
    snapshot.last_updated = now;

    snapshot.level > old_level
}
