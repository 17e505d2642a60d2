//! Experience and level calculations
//!
//! Pure functions converting raw invocation outcomes into XP, and XP totals
//! into levels, titles and progress. No state is kept here.
//!
//! A successful invocation earns:
//!
//! ```text
//! base + speed bonus + error-recovery bonus + contribution XP + streak bonus
//! ```
//!
//! Failures earn nothing.

use crate::error::{Error, Result};
use crate::types::{ContributionType, EventStatus};

/// Default XP for any successful invocation.
pub const DEFAULT_BASE_XP: u32 = 10;

/// Bonus for the first success after a failure.
pub const ERROR_RECOVERY_BONUS: u32 = 10;

/// XP required to reach levels 1 through 8.
pub const LEVEL_THRESHOLDS: [i64; 8] = [0, 50, 150, 400, 800, 1500, 3000, 5000];

const LEVEL_TITLES: [&str; 8] = [
    "Intern",
    "Junior",
    "Mid-Level",
    "Senior",
    "Staff",
    "Principal",
    "Distinguished",
    "Fellow",
];

pub const MAX_LEVEL: u32 = LEVEL_THRESHOLDS.len() as u32;

/// XP for a successful invocation before any bonus.
pub fn calculate_xp_for_successful_invocation(base_xp: u32) -> u64 {
    u64::from(base_xp)
}

/// Fixed XP carried by each contribution kind.
pub fn contribution_xp(kind: ContributionType) -> u32 {
    match kind {
        ContributionType::Commit => 5,
        ContributionType::PrCreated => 15,
        ContributionType::PrMerged => 30,
        ContributionType::TestWritten => 20,
        ContributionType::TicketCompleted => 25,
        ContributionType::FileCreated => 3,
        ContributionType::FileModified => 2,
        ContributionType::IssueCreated => 8,
    }
}

/// Look up contribution XP by name.
///
/// Fails with [`Error::InvalidArgument`] naming the kind when it is not one
/// of the known contribution types.
pub fn calculate_xp_for_contribution_type(kind: &str) -> Result<u32> {
    let kind: ContributionType = kind.parse()?;
    Ok(contribution_xp(kind))
}

/// 10 under 30s, 5 under 60s, 0 otherwise.
pub fn calculate_speed_bonus(duration_seconds: f64) -> u32 {
    if duration_seconds < 30.0 {
        10
    } else if duration_seconds < 60.0 {
        5
    } else {
        0
    }
}

/// Bonus for the first success of a new streak that follows a failure.
///
/// `current_streak` is the post-update streak, so it must be exactly 1.
pub fn calculate_error_recovery_bonus(current_streak: i64, previous_status: EventStatus) -> u32 {
    if current_streak == 1 && !previous_status.is_success() {
        ERROR_RECOVERY_BONUS
    } else {
        0
    }
}

/// One XP per streak step; non-positive streaks earn nothing.
pub fn calculate_streak_bonus(current_streak: i64) -> u64 {
    current_streak.max(0) as u64
}

/// Total XP for one successful invocation.
///
/// `duration_seconds` of `None` means the duration is not scored and no speed
/// bonus applies.
pub fn calculate_total_xp_for_success(
    base_xp: u32,
    duration_seconds: Option<f64>,
    current_streak: i64,
    previous_status: EventStatus,
    contribution_xp: u64,
) -> u64 {
    let speed = duration_seconds.map(calculate_speed_bonus).unwrap_or(0);

    calculate_xp_for_successful_invocation(base_xp)
        + u64::from(speed)
        + u64::from(calculate_error_recovery_bonus(
            current_streak,
            previous_status,
        ))
        + contribution_xp
        + calculate_streak_bonus(current_streak)
}

pub fn level_thresholds() -> &'static [i64; 8] {
    &LEVEL_THRESHOLDS
}

/// Title for `level`; levels outside 1..=8 are rejected.
pub fn level_title(level: i64) -> Result<&'static str> {
    usize::try_from(level)
        .ok()
        .filter(|l| (1..=LEVEL_TITLES.len()).contains(l))
        .map(|l| LEVEL_TITLES[l - 1])
        .ok_or_else(|| {
            Error::InvalidArgument(format!("level must be between 1 and 8, got {}", level))
        })
}

/// Level for an XP total. Negative XP clamps to level 1, anything at or
/// above the top threshold caps at level 8.
pub fn calculate_level_from_xp(xp: i64) -> u32 {
    LEVEL_THRESHOLDS
        .iter()
        .rposition(|&threshold| xp >= threshold)
        .map(|idx| idx as u32 + 1)
        .unwrap_or(1)
}

/// XP still needed to reach the next level; 0 once level 8 is reached.
pub fn calculate_xp_for_next_level(xp: i64) -> u64 {
    let xp = xp.max(0);
    let level = calculate_level_from_xp(xp);
    if level >= MAX_LEVEL {
        return 0;
    }
    (LEVEL_THRESHOLDS[level as usize] - xp) as u64
}

/// `(xp earned inside the current level, xp span of the current level)`.
///
/// Both components are 0 at or above the top threshold.
pub fn calculate_xp_progress_in_level(xp: i64) -> (u64, u64) {
    let xp = xp.max(0);
    let level = calculate_level_from_xp(xp);
    if level >= MAX_LEVEL {
        return (0, 0);
    }
    let floor = LEVEL_THRESHOLDS[level as usize - 1];
    let ceiling = LEVEL_THRESHOLDS[level as usize];
    ((xp - floor) as u64, (ceiling - floor) as u64)
}
