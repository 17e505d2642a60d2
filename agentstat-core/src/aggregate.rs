//! Profile aggregation
//!
//! Folds each finalized [`AgentEvent`] into the running [`AgentProfile`] of
//! its agent and appends it to the global history.
//!
//! Aggregation is deterministic: replaying the event list through
//! [`rebuild_profiles`] reproduces the stored profiles exactly.

use std::collections::BTreeMap;

use chrono::Utc;

use crate::config::MetricsConfig;
use crate::gamification::{self, AwardContext};
use crate::types::{AgentEvent, AgentProfile, ContributionType, DashboardState, EventStatus};

/// What folding a single event changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FoldOutcome {
    pub xp_awarded: u64,
    pub level_before: u32,
    pub level_after: u32,
    pub new_achievements: Vec<String>,
}

/// Applies finalized events to a [`DashboardState`].
pub struct ProfileAggregator<'a> {
    config: &'a MetricsConfig,
}

impl<'a> ProfileAggregator<'a> {
    pub fn new(config: &'a MetricsConfig) -> Self {
        Self { config }
    }

    /// Fold `event` into its agent's profile, append it to the event history
    /// and advance the running resource totals.
    pub fn apply(&self, state: &mut DashboardState, event: AgentEvent) -> FoldOutcome {
        let profile = state
            .agents
            .entry(event.agent_name.clone())
            .or_insert_with(|| AgentProfile::new(event.agent_name.as_str()));

        let outcome = fold_event(profile, &event, &state.events, self.config);

        state.total_tokens = state.total_tokens.saturating_add(event.total_tokens);
        state.total_cost_usd += event.estimated_cost_usd;
        state.total_duration_seconds += event.duration_seconds;
        state.updated_at = Utc::now();

        tracing::debug!(
            agent = %event.agent_name,
            event_id = %event.event_id,
            status = %event.status,
            xp_awarded = outcome.xp_awarded,
            level = outcome.level_after,
            "Folded event into profile"
        );
        if outcome.level_after > outcome.level_before {
            tracing::info!(
                agent = %event.agent_name,
                level = outcome.level_after,
                "Agent levelled up"
            );
        }

        state.events.push(event);
        outcome
    }
}

/// Replay `events` from scratch and return the resulting profiles.
pub fn rebuild_profiles(
    events: &[AgentEvent],
    config: &MetricsConfig,
) -> BTreeMap<String, AgentProfile> {
    let mut profiles: BTreeMap<String, AgentProfile> = BTreeMap::new();
    for (idx, event) in events.iter().enumerate() {
        let profile = profiles
            .entry(event.agent_name.clone())
            .or_insert_with(|| AgentProfile::new(event.agent_name.as_str()));
        fold_event(profile, event, &events[..idx], config);
    }
    profiles
}

/// Fold one event into `profile`. `history` holds every earlier event.
fn fold_event(
    profile: &mut AgentProfile,
    event: &AgentEvent,
    history: &[AgentEvent],
    config: &MetricsConfig,
) -> FoldOutcome {
    let success = event.status.is_success();
    let previous_status = profile.last_status.unwrap_or(EventStatus::Success);
    let level_before = profile.level;

    profile.total_invocations += 1;
    if success {
        profile.successful_invocations += 1;
    } else {
        profile.failed_invocations += 1;
    }

    profile.total_tokens = profile.total_tokens.saturating_add(event.total_tokens);
    profile.total_cost_usd += event.estimated_cost_usd;
    profile.total_duration_seconds += event.duration_seconds;

    if success {
        apply_contributions(profile, event);
    }
    recompute_rates(profile);

    let (current, best) = gamification::update_streak(
        i64::from(profile.current_streak),
        event.status,
        i64::from(profile.best_streak),
    );
    profile.current_streak = current;
    profile.best_streak = best;

    let mut xp_awarded = 0;
    let mut recovered = false;
    if success {
        let contribution_total: u64 = event
            .contributions
            .iter()
            .map(|&kind| u64::from(gamification::contribution_xp(kind)))
            .sum();
        let duration = config.award_speed_bonus.then_some(event.duration_seconds);

        xp_awarded = gamification::calculate_total_xp_for_success(
            config.base_xp,
            duration,
            i64::from(current),
            previous_status,
            contribution_total,
        );
        recovered =
            gamification::calculate_error_recovery_bonus(i64::from(current), previous_status) > 0;
    }
    profile.xp = profile.xp.saturating_add(xp_awarded);
    profile.level =
        gamification::calculate_level_from_xp(i64::try_from(profile.xp).unwrap_or(i64::MAX));

    profile.recent_events.push(event.event_id.clone());
    let window = config.recent_events_window.max(1);
    if profile.recent_events.len() > window {
        let excess = profile.recent_events.len() - window;
        profile.recent_events.drain(..excess);
    }

    if !success {
        profile.last_error = event.error_message.clone();
    }
    profile.last_active = Some(event.ended_at);
    profile.last_status = Some(event.status);

    let new_achievements: Vec<String> = gamification::newly_earned(&AwardContext {
        profile: &*profile,
        event,
        recovered,
    })
    .into_iter()
    .map(|a| a.id().to_string())
    .collect();
    profile.achievements.extend(new_achievements.iter().cloned());

    let recent: Vec<&AgentEvent> = profile
        .recent_events
        .iter()
        .filter_map(|id| {
            if *id == event.event_id {
                Some(event)
            } else {
                history.iter().rev().find(|e| e.event_id == *id)
            }
        })
        .collect();
    let signals = gamification::detect_signals(&*profile, &recent);
    profile.strengths = signals.strengths;
    profile.weaknesses = signals.weaknesses;

    FoldOutcome {
        xp_awarded,
        level_before,
        level_after: profile.level,
        new_achievements,
    }
}

fn apply_contributions(profile: &mut AgentProfile, event: &AgentEvent) {
    for kind in &event.contributions {
        let counter = match kind {
            ContributionType::Commit => &mut profile.commits_made,
            ContributionType::PrCreated => &mut profile.prs_created,
            ContributionType::PrMerged => &mut profile.prs_merged,
            ContributionType::TestWritten => &mut profile.tests_written,
            ContributionType::TicketCompleted => &mut profile.issues_completed,
            ContributionType::FileCreated => &mut profile.files_created,
            ContributionType::FileModified => &mut profile.files_modified,
            ContributionType::IssueCreated => &mut profile.issues_created,
        };
        *counter += 1;
    }

    for artifact in &event.artifacts {
        if artifact.starts_with("message:") {
            profile.messages_sent += 1;
        } else if artifact.starts_with("review:") {
            profile.reviews_completed += 1;
        }
    }

    profile.lines_added = profile.lines_added.saturating_add(event.lines_added);
    profile.lines_removed = profile.lines_removed.saturating_add(event.lines_removed);
}

/// Recompute every derived rate from the raw counters; zero denominators give 0.
fn recompute_rates(profile: &mut AgentProfile) {
    let total = profile.total_invocations as f64;
    let successes = profile.successful_invocations as f64;

    if profile.total_invocations > 0 {
        profile.success_rate = successes / total;
        profile.avg_duration_seconds = profile.total_duration_seconds / total;
        profile.avg_tokens_per_call = profile.total_tokens as f64 / total;
    } else {
        profile.success_rate = 0.0;
        profile.avg_duration_seconds = 0.0;
        profile.avg_tokens_per_call = 0.0;
    }

    profile.cost_per_success_usd = if profile.successful_invocations > 0 {
        profile.total_cost_usd / successes
    } else {
        0.0
    };
}
