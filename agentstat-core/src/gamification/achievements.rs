//! Achievement badges and qualitative strength/weakness tags.
//!
//! Badges are earned once and never revoked. Strengths and weaknesses are
//! recomputed after every event from the agent's recent window.

use crate::types::{AgentEvent, AgentProfile, EventStatus};

/// Minimum number of recent events before any strength/weakness is reported.
pub const MIN_SIGNAL_SAMPLE: usize = 3;

/// Earnable badges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Achievement {
    /// First successful invocation
    FirstBlood,
    /// Five successes in a row
    HotStreak,
    /// Ten successes in a row
    OnFire,
    /// Twenty-five successes in a row
    Unstoppable,
    /// Succeeded right after a failure
    ComebackKid,
    /// A success that finished in under 30 seconds
    SpeedDemon,
    /// One hundred successful invocations
    CenturyClub,
    /// Twenty or more invocations without a single failure
    Perfectionist,
    /// Ten dollars of estimated spend
    BigSpender,
}

impl Achievement {
    pub const ALL: [Achievement; 9] = [
        Achievement::FirstBlood,
        Achievement::HotStreak,
        Achievement::OnFire,
        Achievement::Unstoppable,
        Achievement::ComebackKid,
        Achievement::SpeedDemon,
        Achievement::CenturyClub,
        Achievement::Perfectionist,
        Achievement::BigSpender,
    ];

    /// Identifier stored in `AgentProfile::achievements`.
    pub fn id(&self) -> &'static str {
        match self {
            Achievement::FirstBlood => "first_blood",
            Achievement::HotStreak => "hot_streak",
            Achievement::OnFire => "on_fire",
            Achievement::Unstoppable => "unstoppable",
            Achievement::ComebackKid => "comeback_kid",
            Achievement::SpeedDemon => "speed_demon",
            Achievement::CenturyClub => "century_club",
            Achievement::Perfectionist => "perfectionist",
            Achievement::BigSpender => "big_spender",
        }
    }

    /// Get the display name for this badge.
    pub fn name(&self) -> &'static str {
        match self {
            Achievement::FirstBlood => "First Blood",
            Achievement::HotStreak => "Hot Streak",
            Achievement::OnFire => "On Fire",
            Achievement::Unstoppable => "Unstoppable",
            Achievement::ComebackKid => "Comeback Kid",
            Achievement::SpeedDemon => "Speed Demon",
            Achievement::CenturyClub => "Century Club",
            Achievement::Perfectionist => "Perfectionist",
            Achievement::BigSpender => "Big Spender",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.id() == id)
    }

    fn is_earned(&self, ctx: &AwardContext<'_>) -> bool {
        let profile = ctx.profile;
        let success = ctx.event.status.is_success();
        match self {
            Achievement::FirstBlood => profile.successful_invocations >= 1,
            Achievement::HotStreak => profile.current_streak >= 5,
            Achievement::OnFire => profile.current_streak >= 10,
            Achievement::Unstoppable => profile.current_streak >= 25,
            Achievement::ComebackKid => ctx.recovered,
            Achievement::SpeedDemon => success && ctx.event.duration_seconds < 30.0,
            Achievement::CenturyClub => profile.successful_invocations >= 100,
            Achievement::Perfectionist => {
                profile.total_invocations >= 20 && profile.failed_invocations == 0
            }
            Achievement::BigSpender => profile.total_cost_usd >= 10.0,
        }
    }
}

/// What the aggregator knows right after folding an event into a profile.
pub struct AwardContext<'a> {
    /// Profile with the event already applied
    pub profile: &'a AgentProfile,
    pub event: &'a AgentEvent,
    /// Whether this event earned the error-recovery bonus
    pub recovered: bool,
}

/// Badges earned by this event that the profile does not hold yet.
pub fn newly_earned(ctx: &AwardContext<'_>) -> Vec<Achievement> {
    Achievement::ALL
        .into_iter()
        .filter(|a| !ctx.profile.has_achievement(a.id()) && a.is_earned(ctx))
        .collect()
}

/// Qualitative tags derived from recent performance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Signals {
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
}

/// Derive strengths and weaknesses from an agent's recent events.
///
/// Returns empty signals until [`MIN_SIGNAL_SAMPLE`] events are available.
pub fn detect_signals(profile: &AgentProfile, recent: &[&AgentEvent]) -> Signals {
    let mut signals = Signals::default();
    if recent.len() < MIN_SIGNAL_SAMPLE {
        return signals;
    }

    let count = recent.len() as f64;
    let successes = recent.iter().filter(|e| e.status.is_success()).count();
    let success_rate = successes as f64 / count;
    let avg_duration = recent.iter().map(|e| e.duration_seconds).sum::<f64>() / count;
    let stalled = recent
        .iter()
        .filter(|e| matches!(e.status, EventStatus::Blocked | EventStatus::Timeout))
        .count();
    let cost_per_success = if successes > 0 {
        Some(recent.iter().map(|e| e.estimated_cost_usd).sum::<f64>() / successes as f64)
    } else {
        None
    };

    let mut strength = |tag: &str| signals.strengths.push(tag.to_string());
    if success_rate >= 0.9 {
        strength("high_success_rate");
    }
    if avg_duration < 30.0 {
        strength("fast_execution");
    }
    if cost_per_success.is_some_and(|c| c < 0.01) {
        strength("cost_efficient");
    }
    if profile.current_streak >= 5 {
        strength("consistent");
    }

    let mut weakness = |tag: &str| signals.weaknesses.push(tag.to_string());
    if success_rate < 0.7 {
        weakness("error_prone");
    }
    if avg_duration > 300.0 {
        weakness("slow_execution");
    }
    if cost_per_success.is_some_and(|c| c > 0.10) {
        weakness("expensive");
    }
    if stalled >= 2 {
        weakness("frequently_blocked");
    }

    signals
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn event(status: EventStatus, duration: f64, cost: f64) -> AgentEvent {
        let now = Utc::now();
        AgentEvent {
            event_id: uuid::Uuid::new_v4().to_string(),
            agent_name: "coding".into(),
            session_id: "s".into(),
            ticket_key: String::new(),
            started_at: now,
            ended_at: now,
            duration_seconds: duration,
            status,
            input_tokens: 0,
            output_tokens: 0,
            total_tokens: 0,
            estimated_cost_usd: cost,
            artifacts: vec![],
            error_message: String::new(),
            model_used: "sonnet".into(),
            contributions: vec![],
            lines_added: 0,
            lines_removed: 0,
        }
    }

    #[test]
    fn test_first_blood_once() {
        let mut profile = AgentProfile::new("coding");
        profile.total_invocations = 1;
        profile.successful_invocations = 1;
        profile.current_streak = 1;
        let e = event(EventStatus::Success, 120.0, 0.0);

        let earned = newly_earned(&AwardContext {
            profile: &profile,
            event: &e,
            recovered: false,
        });
        assert_eq!(earned, vec![Achievement::FirstBlood]);

        profile.achievements.push("first_blood".into());
        let earned = newly_earned(&AwardContext {
            profile: &profile,
            event: &e,
            recovered: false,
        });
        assert!(earned.is_empty());
    }

    #[test]
    fn test_failure_earns_no_speed_badge() {
        let mut profile = AgentProfile::new("coding");
        profile.total_invocations = 1;
        profile.failed_invocations = 1;
        let e = event(EventStatus::Error, 1.0, 0.0);

        let earned = newly_earned(&AwardContext {
            profile: &profile,
            event: &e,
            recovered: false,
        });
        assert!(earned.is_empty());
    }

    #[test]
    fn test_streak_and_recovery_badges() {
        let mut profile = AgentProfile::new("coding");
        profile.total_invocations = 10;
        profile.successful_invocations = 10;
        profile.current_streak = 10;
        profile.achievements.push("first_blood".into());
        let e = event(EventStatus::Success, 45.0, 0.0);

        let earned = newly_earned(&AwardContext {
            profile: &profile,
            event: &e,
            recovered: true,
        });
        assert_eq!(
            earned,
            vec![
                Achievement::HotStreak,
                Achievement::OnFire,
                Achievement::ComebackKid
            ]
        );
    }

    #[test]
    fn test_achievement_ids_roundtrip() {
        for a in Achievement::ALL {
            assert_eq!(Achievement::from_id(a.id()), Some(a));
        }
        assert_eq!(Achievement::from_id("nope"), None);
    }

    #[test]
    fn test_signals_need_sample() {
        let profile = AgentProfile::new("coding");
        let a = event(EventStatus::Success, 1.0, 0.0);
        let b = event(EventStatus::Success, 1.0, 0.0);
        assert_eq!(detect_signals(&profile, &[&a, &b]), Signals::default());
    }

    #[test]
    fn test_strengths_detected() {
        let profile = AgentProfile::new("coding");
        let events: Vec<_> = (0..4)
            .map(|_| event(EventStatus::Success, 5.0, 0.001))
            .collect();
        let refs: Vec<_> = events.iter().collect();

        let signals = detect_signals(&profile, &refs);
        assert_eq!(
            signals.strengths,
            vec!["high_success_rate", "fast_execution", "cost_efficient"]
        );
        assert!(signals.weaknesses.is_empty());
    }

    #[test]
    fn test_weaknesses_detected() {
        let profile = AgentProfile::new("github");
        let events = [
            event(EventStatus::Blocked, 400.0, 0.0),
            event(EventStatus::Timeout, 400.0, 0.0),
            event(EventStatus::Success, 400.0, 0.5),
        ];
        let refs: Vec<_> = events.iter().collect();

        let signals = detect_signals(&profile, &refs);
        assert!(signals.strengths.is_empty());
        assert_eq!(
            signals.weaknesses,
            vec![
                "error_prone",
                "slow_execution",
                "expensive",
                "frequently_blocked"
            ]
        );
    }
}
