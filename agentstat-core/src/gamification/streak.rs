//! Consecutive-success streak tracking.

use crate::types::EventStatus;

/// Advance a streak by one outcome.
///
/// Returns `(current_streak, best_streak)`. A success extends the streak, any
/// other status resets it to 0. The best streak never decreases. Negative
/// inputs are treated as 0.
pub fn update_streak(current_streak: i64, new_status: EventStatus, best_streak: i64) -> (u32, u32) {
    let current = clamp(current_streak);
    let best = clamp(best_streak);

    let current = if new_status.is_success() {
        current.saturating_add(1)
    } else {
        0
    };

    (current, best.max(current))
}

fn clamp(value: i64) -> u32 {
    value.clamp(0, i64::from(u32::MAX)) as u32
}
