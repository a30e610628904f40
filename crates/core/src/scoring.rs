//! Scoring module - line clear rewards, drop bonus, level and gravity
//!
//! Level is never stored as independent state: it is recomputed from score
//! every time it is needed. The multiplier for any scoring event is the level
//! captured immediately before the action that triggered it.

use crate::types::{GRAVITY_INTERVALS_MS, HARD_DROP_ROW_BONUS, LEVEL_THRESHOLDS, LINE_SCORES};

/// Points for clearing `lines` rows at once at `level`.
pub fn calculate_line_score(lines: usize, level: u32) -> u32 {
    if lines == 0 || lines > 4 {
        return 0;
    }
    LINE_SCORES[lines].saturating_mul(level)
}

/// Bonus for a hard drop that skipped `rows` rows at `level`.
pub fn calculate_drop_bonus(rows: u32, level: u32) -> u32 {
    rows.saturating_mul(HARD_DROP_ROW_BONUS).saturating_mul(level)
}

/// Number of thresholds the score meets or exceeds.
pub fn level_for_score(score: u32) -> u32 {
    LEVEL_THRESHOLDS.iter().filter(|&&t| score >= t).count() as u32
}

/// Gravity interval for a level (in milliseconds)
/// Returns the last table entry for levels past the end of the table
pub fn gravity_interval_ms(level: u32) -> u32 {
    let idx = (level.max(1) - 1) as usize;
    GRAVITY_INTERVALS_MS
        .get(idx)
        .copied()
        .unwrap_or(GRAVITY_INTERVALS_MS[GRAVITY_INTERVALS_MS.len() - 1])
}
