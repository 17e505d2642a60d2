//! Gamification module for agentstat
//!
//! Stateless scoring used by the profile aggregator:
//! - XP awards, levels and titles ([`xp`])
//! - Consecutive-success streaks ([`streak`])
//! - Token cost estimation ([`cost`])
//! - Badges and strength/weakness tags ([`achievements`])

pub mod achievements;
pub mod cost;
pub mod streak;
pub mod xp;

pub use achievements::{detect_signals, newly_earned, Achievement, AwardContext, Signals};
pub use cost::{estimate_cost_usd, TokenPricing};
pub use streak::update_streak;
pub use xp::{
    calculate_error_recovery_bonus, calculate_level_from_xp, calculate_speed_bonus,
    calculate_streak_bonus, calculate_total_xp_for_success,
    calculate_xp_for_contribution_type, calculate_xp_for_next_level,
    calculate_xp_for_successful_invocation, calculate_xp_progress_in_level, contribution_xp,
    level_thresholds, level_title, LEVEL_THRESHOLDS,
};
