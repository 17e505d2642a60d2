//! Core domain types for agentstat
//!
//! These types make up the persisted state document and the records handed
//! back to callers.
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Agent** | A named delegate (e.g. `coding`, `github`) invoked by an orchestrator |
//! | **Event** | One finalized, immutable record of a single agent invocation |
//! | **Session** | A bounded unit of work containing zero or more events |
//! | **Profile** | The running aggregate of all events ever recorded for one agent |
//! | **Streak** | Consecutive successful invocations of one agent |
//! | **Contribution** | A fixed category of work product carrying its own XP value |
//! | **Artifact** | An opaque string describing a side effect (`file:x`, `commit:y`) |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::Error;
use crate::gamification::xp;

/// Schema version written into every state document.
pub const STATE_VERSION: u32 = 1;

// ============================================
// Statuses
// ============================================

/// Outcome of a single agent invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    #[default]
    Success,
    Error,
    Timeout,
    Blocked,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Success => "success",
            EventStatus::Error => "error",
            EventStatus::Timeout => "timeout",
            EventStatus::Blocked => "blocked",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, EventStatus::Success)
    }
}

impl std::fmt::Display for EventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for EventStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(EventStatus::Success),
            "error" => Ok(EventStatus::Error),
            "timeout" => Ok(EventStatus::Timeout),
            "blocked" => Ok(EventStatus::Blocked),
            _ => Err(format!("unknown event status: {}", s)),
        }
    }
}

/// Kind of failure recorded through `set_error`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailureKind {
    #[default]
    Error,
    Timeout,
    Blocked,
}

impl From<FailureKind> for EventStatus {
    fn from(kind: FailureKind) -> Self {
        match kind {
            FailureKind::Error => EventStatus::Error,
            FailureKind::Timeout => EventStatus::Timeout,
            FailureKind::Blocked => EventStatus::Blocked,
        }
    }
}

/// Whether a session opened a unit of work or continued one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionType {
    Initializer,
    Continuation,
}

impl SessionType {
    pub fn from_initializer(is_initializer: bool) -> Self {
        if is_initializer {
            SessionType::Initializer
        } else {
            SessionType::Continuation
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionType::Initializer => "initializer",
            SessionType::Continuation => "continuation",
        }
    }
}

/// Status a session is closed with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// More work remains for a follow-up session
    #[default]
    Continue,
    Error,
    Complete,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Continue => "continue",
            SessionStatus::Error => "error",
            SessionStatus::Complete => "complete",
        }
    }
}

impl std::str::FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "continue" => Ok(SessionStatus::Continue),
            "error" => Ok(SessionStatus::Error),
            "complete" => Ok(SessionStatus::Complete),
            _ => Err(format!("unknown session status: {}", s)),
        }
    }
}

// ============================================
// Contributions
// ============================================

/// Fixed categories of concrete work product.
///
/// Each carries a fixed XP value (see [`xp::contribution_xp`]) and maps onto
/// one of the contribution counters of [`AgentProfile`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContributionType {
    Commit,
    PrCreated,
    PrMerged,
    TestWritten,
    TicketCompleted,
    FileCreated,
    FileModified,
    IssueCreated,
}

impl ContributionType {
    pub const ALL: [ContributionType; 8] = [
        ContributionType::Commit,
        ContributionType::PrCreated,
        ContributionType::PrMerged,
        ContributionType::TestWritten,
        ContributionType::TicketCompleted,
        ContributionType::FileCreated,
        ContributionType::FileModified,
        ContributionType::IssueCreated,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContributionType::Commit => "commit",
            ContributionType::PrCreated => "pr_created",
            ContributionType::PrMerged => "pr_merged",
            ContributionType::TestWritten => "test_written",
            ContributionType::TicketCompleted => "ticket_completed",
            ContributionType::FileCreated => "file_created",
            ContributionType::FileModified => "file_modified",
            ContributionType::IssueCreated => "issue_created",
        }
    }
}

impl std::fmt::Display for ContributionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ContributionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ContributionType::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| Error::InvalidArgument(format!("Unknown contribution type: {}", s)))
    }
}

// ============================================
// Events
// ============================================

/// One finalized agent invocation.
///
/// Built by the event tracker when its scope closes; never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentEvent {
    /// Unique identifier (UUID v4)
    pub event_id: String,
    pub agent_name: String,
    /// Session this invocation belonged to
    pub session_id: String,
    /// Ticket/work-item key, empty when none was given
    #[serde(default)]
    pub ticket_key: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration_seconds: f64,
    pub status: EventStatus,
    pub input_tokens: u64,
    pub output_tokens: u64,
    /// Always `input_tokens + output_tokens`
    pub total_tokens: u64,
    pub estimated_cost_usd: f64,
    /// Produced side effects, in the order they were recorded
    #[serde(default)]
    pub artifacts: Vec<String>,
    /// Empty for successful invocations
    #[serde(default)]
    pub error_message: String,
    pub model_used: String,
    /// Contribution kinds attributed to this invocation
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contributions: Vec<ContributionType>,
    #[serde(default)]
    pub lines_added: u64,
    #[serde(default)]
    pub lines_removed: u64,
}

// ============================================
// Profiles
// ============================================

/// Running aggregate for one agent name.
///
/// Derived fields (`success_rate`, `avg_*`, `cost_per_success_usd`, `level`)
/// are cached here but always recomputed from the raw counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentProfile {
    pub agent_name: String,

    // Invocation counters
    pub total_invocations: u64,
    pub successful_invocations: u64,
    pub failed_invocations: u64,

    // Resource totals
    pub total_tokens: u64,
    pub total_cost_usd: f64,
    pub total_duration_seconds: f64,

    // Contribution counters
    pub commits_made: u64,
    pub prs_created: u64,
    pub prs_merged: u64,
    pub files_created: u64,
    pub files_modified: u64,
    pub lines_added: u64,
    pub lines_removed: u64,
    pub tests_written: u64,
    pub issues_created: u64,
    pub issues_completed: u64,
    pub messages_sent: u64,
    pub reviews_completed: u64,

    // Derived rates
    pub success_rate: f64,
    pub avg_duration_seconds: f64,
    pub avg_tokens_per_call: f64,
    pub cost_per_success_usd: f64,

    // Gamification
    pub xp: u64,
    pub level: u32,
    pub current_streak: u32,
    pub best_streak: u32,
    /// Badge ids in the order they were earned
    pub achievements: Vec<String>,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,

    // Bookkeeping
    /// Most recent event ids, oldest first, bounded by the configured window
    pub recent_events: Vec<String>,
    pub last_error: String,
    pub last_active: Option<DateTime<Utc>>,
    /// Status of this agent's most recent event
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_status: Option<EventStatus>,
}

impl AgentProfile {
    /// Zero-valued profile for an agent that has never been invoked.
    pub fn new(agent_name: impl Into<String>) -> Self {
        Self {
            agent_name: agent_name.into(),
            total_invocations: 0,
            successful_invocations: 0,
            failed_invocations: 0,
            total_tokens: 0,
            total_cost_usd: 0.0,
            total_duration_seconds: 0.0,
            commits_made: 0,
            prs_created: 0,
            prs_merged: 0,
            files_created: 0,
            files_modified: 0,
            lines_added: 0,
            lines_removed: 0,
            tests_written: 0,
            issues_created: 0,
            issues_completed: 0,
            messages_sent: 0,
            reviews_completed: 0,
            success_rate: 0.0,
            avg_duration_seconds: 0.0,
            avg_tokens_per_call: 0.0,
            cost_per_success_usd: 0.0,
            xp: 0,
            level: 1,
            current_streak: 0,
            best_streak: 0,
            achievements: Vec::new(),
            strengths: Vec::new(),
            weaknesses: Vec::new(),
            recent_events: Vec::new(),
            last_error: String::new(),
            last_active: None,
            last_status: None,
        }
    }

    /// Title for the profile's current level ("Intern" .. "Fellow").
    pub fn level_title(&self) -> &'static str {
        // level is always recomputed from xp, so it is within 1..=8
        xp::level_title(i64::from(self.level)).unwrap_or("Intern")
    }

    /// XP still needed to reach the next level (0 at the top level).
    pub fn xp_to_next_level(&self) -> u64 {
        xp::calculate_xp_for_next_level(xp_as_i64(self.xp))
    }

    /// `(xp into current level, xp span of current level)`.
    pub fn level_progress(&self) -> (u64, u64) {
        xp::calculate_xp_progress_in_level(xp_as_i64(self.xp))
    }

    pub fn has_achievement(&self, id: &str) -> bool {
        self.achievements.iter().any(|a| a == id)
    }
}

fn xp_as_i64(xp: u64) -> i64 {
    i64::try_from(xp).unwrap_or(i64::MAX)
}

// ============================================
// Sessions
// ============================================

/// Closure record for one session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub session_number: u32,
    pub session_type: SessionType,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub status: SessionStatus,
    /// Distinct agent names, in order of first appearance
    pub agents_invoked: Vec<String>,
    pub total_tokens: u64,
    pub total_cost_usd: f64,
    /// Distinct non-empty ticket keys, in order of first appearance
    pub tickets_worked: Vec<String>,
}

// ============================================
// Dashboard state
// ============================================

/// The single persisted root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardState {
    pub version: u32,
    pub project_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub total_sessions: u64,
    pub total_tokens: u64,
    pub total_cost_usd: f64,
    pub total_duration_seconds: f64,
    pub agents: BTreeMap<String, AgentProfile>,
    /// Every event ever recorded, in finalization order
    pub events: Vec<AgentEvent>,
    /// Every closed session, in closing order
    pub sessions: Vec<SessionSummary>,
}

impl DashboardState {
    /// Fresh state with all totals at zero.
    pub fn new(project_name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            version: STATE_VERSION,
            project_name: project_name.into(),
            created_at: now,
            updated_at: now,
            total_sessions: 0,
            total_tokens: 0,
            total_cost_usd: 0.0,
            total_duration_seconds: 0.0,
            agents: BTreeMap::new(),
            events: Vec::new(),
            sessions: Vec::new(),
        }
    }

    pub fn event(&self, event_id: &str) -> Option<&AgentEvent> {
        self.events.iter().rev().find(|e| e.event_id == event_id)
    }

    /// Events that belong to `session_id`, in recording order.
    pub fn session_events<'a>(
        &'a self,
        session_id: &'a str,
    ) -> impl Iterator<Item = &'a AgentEvent> + 'a {
        self.events.iter().filter(move |e| e.session_id == session_id)
    }

    /// Describe every violated structural invariant; empty when consistent.
    pub fn invariant_violations(&self) -> Vec<String> {
        let mut violations = Vec::new();

        if self.total_sessions != self.sessions.len() as u64 {
            violations.push(format!(
                "total_sessions {} != {} recorded sessions",
                self.total_sessions,
                self.sessions.len()
            ));
        }

        let event_tokens = self
            .events
            .iter()
            .fold(0u64, |acc, e| acc.saturating_add(e.total_tokens));
        if self.total_tokens != event_tokens {
            violations.push(format!(
                "total_tokens {} != {} summed over events",
                self.total_tokens, event_tokens
            ));
        }

        for event in &self.events {
            if event.input_tokens.checked_add(event.output_tokens) != Some(event.total_tokens) {
                violations.push(format!(
                    "event {} total_tokens does not equal input + output",
                    event.event_id
                ));
            }
        }

        for (name, profile) in &self.agents {
            if profile.successful_invocations + profile.failed_invocations
                != profile.total_invocations
            {
                violations.push(format!("profile {} counters do not add up", name));
            }
            if profile.best_streak < profile.current_streak {
                violations.push(format!("profile {} best_streak < current_streak", name));
            }
            if profile.level != xp::calculate_level_from_xp(xp_as_i64(profile.xp)) {
                violations.push(format!("profile {} level does not match xp", name));
            }
        }

        violations
    }
}
