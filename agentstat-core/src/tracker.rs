//! Scoped tracking of a single agent invocation
//!
//! [`AgentTracker`] is an RAII guard handed out by
//! [`MetricsCollector::track_agent`]. Whatever happens inside the scope, the
//! invocation is finalized and committed exactly once: by [`AgentTracker::finish`]
//! or, failing that, when the guard is dropped (including during a panic).

use std::time::Instant;

use chrono::{DateTime, Utc};

use crate::collector::MetricsCollector;
use crate::error::Result;
use crate::gamification::TokenPricing;
use crate::types::{AgentEvent, ContributionType, EventStatus, FailureKind};

/// Error message recorded when the guard is dropped by an unwinding panic.
pub const PANIC_MESSAGE: &str = "agent scope exited by panic";

/// Open invocation of one agent. Finalizes on drop.
#[must_use = "dropping the tracker immediately records an empty invocation"]
pub struct AgentTracker<'a> {
    collector: &'a MetricsCollector,
    event_id: String,
    agent_name: String,
    session_id: String,
    ticket_key: String,
    started_at: DateTime<Utc>,
    clock: Instant,
    input_tokens: u64,
    output_tokens: u64,
    artifacts: Vec<String>,
    failure: Option<(String, FailureKind)>,
    model: Option<String>,
    contributions: Vec<ContributionType>,
    lines_added: u64,
    lines_removed: u64,
    finalized: bool,
}

impl<'a> AgentTracker<'a> {
    pub(crate) fn open(
        collector: &'a MetricsCollector,
        agent_name: &str,
        ticket_key: &str,
        session_id: String,
    ) -> Self {
        let event_id = uuid::Uuid::new_v4().to_string();
        tracing::debug!(
            agent = agent_name,
            session_id = %session_id,
            event_id = %event_id,
            "Agent invocation started"
        );

        Self {
            collector,
            event_id,
            agent_name: agent_name.to_string(),
            session_id,
            ticket_key: ticket_key.to_string(),
            started_at: Utc::now(),
            clock: Instant::now(),
            input_tokens: 0,
            output_tokens: 0,
            artifacts: Vec::new(),
            failure: None,
            model: None,
            contributions: Vec::new(),
            lines_added: 0,
            lines_removed: 0,
            finalized: false,
        }
    }

    /// Identifier the finalized event will carry.
    pub fn event_id(&self) -> &str {
        &self.event_id
    }

    pub fn agent_name(&self) -> &str {
        &self.agent_name
    }

    /// Record token usage; replaces any previously set counts.
    ///
    /// Output tokens are clamped so that the total still fits in a `u64`.
    pub fn set_tokens(&mut self, input_tokens: u64, output_tokens: u64) {
        let max_output = u64::MAX - input_tokens;
        if output_tokens > max_output {
            tracing::warn!(
                agent = %self.agent_name,
                input_tokens,
                output_tokens,
                "Token counts overflow, clamping output tokens"
            );
        }
        self.input_tokens = input_tokens;
        self.output_tokens = output_tokens.min(max_output);
    }

    /// Append an opaque side-effect identifier such as `file:src/main.rs`.
    pub fn add_artifact(&mut self, identifier: impl Into<String>) {
        self.artifacts.push(identifier.into());
    }

    /// Mark the invocation as failed with status `error`.
    pub fn set_error(&mut self, message: impl Into<String>) {
        self.set_failure(message, FailureKind::Error);
    }

    /// Mark the invocation as failed with an explicit failure kind.
    pub fn set_failure(&mut self, message: impl Into<String>, kind: FailureKind) {
        self.failure = Some((message.into(), kind));
    }

    pub fn has_error(&self) -> bool {
        self.failure.is_some()
    }

    /// Override the model recorded for this invocation.
    pub fn set_model(&mut self, model: impl Into<String>) {
        self.model = Some(model.into());
    }

    /// Attribute a contribution; scored and counted only if the invocation succeeds.
    pub fn add_contribution(&mut self, kind: ContributionType) {
        self.contributions.push(kind);
    }

    pub fn add_lines(&mut self, added: u64, removed: u64) {
        self.lines_added = self.lines_added.saturating_add(added);
        self.lines_removed = self.lines_removed.saturating_add(removed);
    }

    /// Finalize now and return the committed event.
    ///
    /// The event is recorded in memory even when committing it to disk fails;
    /// the error is still returned.
    pub fn finish(mut self) -> Result<AgentEvent> {
        self.finalize()
    }

    fn finalize(&mut self) -> Result<AgentEvent> {
        self.finalized = true;

        let config = self.collector.config();
        let (status, error_message) = match self.failure.take() {
            Some((message, kind)) => (EventStatus::from(kind), message),
            None => (EventStatus::Success, String::new()),
        };
        let model_used = self
            .model
            .take()
            .unwrap_or_else(|| config.model_for(&self.agent_name).to_string());

        let event = AgentEvent {
            event_id: self.event_id.clone(),
            agent_name: self.agent_name.clone(),
            session_id: self.session_id.clone(),
            ticket_key: std::mem::take(&mut self.ticket_key),
            started_at: self.started_at,
            ended_at: Utc::now(),
            duration_seconds: self.clock.elapsed().as_secs_f64(),
            status,
            input_tokens: self.input_tokens,
            output_tokens: self.output_tokens,
            total_tokens: self.input_tokens.saturating_add(self.output_tokens),
            estimated_cost_usd: TokenPricing::from(config)
                .estimate(self.input_tokens, self.output_tokens),
            artifacts: std::mem::take(&mut self.artifacts),
            error_message,
            model_used,
            contributions: std::mem::take(&mut self.contributions),
            lines_added: self.lines_added,
            lines_removed: self.lines_removed,
        };

        self.collector.record_event(event.clone())?;
        Ok(event)
    }
}

impl Drop for AgentTracker<'_> {
    fn drop(&mut self) {
        if self.finalized {
            return;
        }

        if std::thread::panicking() && self.failure.is_none() {
            tracing::warn!(
                agent = %self.agent_name,
                event_id = %self.event_id,
                "Agent scope unwinding, recording failure"
            );
            self.failure = Some((PANIC_MESSAGE.to_string(), FailureKind::Error));
        }

        if let Err(e) = self.finalize() {
            tracing::error!(
                agent = %self.agent_name,
                event_id = %self.event_id,
                error = %e,
                "Failed to commit agent event on scope exit"
            );
        }
    }
}

impl std::fmt::Debug for AgentTracker<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentTracker")
            .field("event_id", &self.event_id)
            .field("agent_name", &self.agent_name)
            .field("session_id", &self.session_id)
            .field("finalized", &self.finalized)
            .finish()
    }
}
