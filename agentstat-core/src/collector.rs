//! Session lifecycle and the public metrics entry point
//!
//! A [`MetricsCollector`] owns one project's [`DashboardState`], the store it
//! was loaded from, and at most one open session.
//!
//! ```text
//! idle --start_session--> active --end_session--> closed (== idle)
//! ```
//!
//! Trackers borrow the collector immutably while `start_session` and
//! `end_session` need `&mut self`, so a session can never be closed while
//! one of its invocations is still open.

use std::cell::RefCell;
use std::path::Path;

use chrono::{DateTime, Utc};

use crate::aggregate::{rebuild_profiles, ProfileAggregator};
use crate::config::MetricsConfig;
use crate::error::{Error, Result};
use crate::store::MetricsStore;
use crate::tracker::AgentTracker;
use crate::types::{
    AgentEvent, AgentProfile, DashboardState, SessionStatus, SessionSummary, SessionType,
};

#[derive(Debug, Clone)]
struct ActiveSession {
    session_id: String,
    session_number: u32,
    session_type: SessionType,
    started_at: DateTime<Utc>,
}

#[derive(Debug)]
struct CollectorState {
    dashboard: DashboardState,
    session: Option<ActiveSession>,
}

/// Records sessions and agent invocations for one project directory.
#[derive(Debug)]
pub struct MetricsCollector {
    config: MetricsConfig,
    store: MetricsStore,
    inner: RefCell<CollectorState>,
}

impl MetricsCollector {
    /// Open the collector for `project_dir` with default settings.
    pub fn new(project_dir: impl AsRef<Path>) -> Result<Self> {
        Self::with_config(project_dir, MetricsConfig::default())
    }

    /// Open the collector for `project_dir`.
    ///
    /// Loads the stored state if present. A corrupt or unsupported document
    /// is an error; the caller decides whether to start fresh.
    pub fn with_config(project_dir: impl AsRef<Path>, config: MetricsConfig) -> Result<Self> {
        config.validate()?;
        let store = MetricsStore::new(project_dir, &config);
        let dashboard = store.load_or_init()?;

        tracing::info!(
            path = %store.path().display(),
            project = %dashboard.project_name,
            sessions = dashboard.total_sessions,
            events = dashboard.events.len(),
            "Metrics collector ready"
        );

        Ok(Self {
            config,
            store,
            inner: RefCell::new(CollectorState {
                dashboard,
                session: None,
            }),
        })
    }

    pub fn config(&self) -> &MetricsConfig {
        &self.config
    }

    pub fn store(&self) -> &MetricsStore {
        &self.store
    }

    /// Open a new session and return its identifier.
    pub fn start_session(&mut self, session_number: u32, is_initializer: bool) -> Result<String> {
        let inner = self.inner.get_mut();
        if let Some(active) = &inner.session {
            return Err(Error::InvalidState(format!(
                "session {} is already active",
                active.session_id
            )));
        }

        if let Some(last) = inner.dashboard.sessions.last() {
            if session_number <= last.session_number {
                tracing::warn!(
                    session_number,
                    previous = last.session_number,
                    "Session number does not increase"
                );
            }
        }

        let session = ActiveSession {
            session_id: uuid::Uuid::new_v4().to_string(),
            session_number,
            session_type: SessionType::from_initializer(is_initializer),
            started_at: Utc::now(),
        };
        tracing::info!(
            session_id = %session.session_id,
            session_number,
            session_type = session.session_type.as_str(),
            "Session started"
        );

        let session_id = session.session_id.clone();
        inner.session = Some(session);
        Ok(session_id)
    }

    /// Open a tracked invocation of `agent_name` in the active session.
    ///
    /// `ticket_key` may be empty.
    pub fn track_agent(&self, agent_name: &str, ticket_key: &str) -> Result<AgentTracker<'_>> {
        let session_id = self.current_session_id().ok_or_else(|| {
            Error::InvalidState("no active session to track agents in".to_string())
        })?;
        Ok(AgentTracker::open(self, agent_name, ticket_key, session_id))
    }

    /// Run `f` inside a tracked invocation.
    ///
    /// An `Err` from `f` is recorded as the invocation's error message, unless
    /// `f` already called `set_error`, and is returned unchanged.
    pub fn track_agent_with<T, E, F>(
        &self,
        agent_name: &str,
        ticket_key: &str,
        f: F,
    ) -> std::result::Result<T, E>
    where
        F: FnOnce(&mut AgentTracker<'_>) -> std::result::Result<T, E>,
        E: From<Error> + std::fmt::Display,
    {
        let mut tracker = self.track_agent(agent_name, ticket_key)?;
        let outcome = f(&mut tracker);

        if let Err(err) = &outcome {
            if !tracker.has_error() {
                tracker.set_error(err.to_string());
            }
        }

        let committed = tracker.finish();
        let value = outcome?;
        committed?;
        Ok(value)
    }

    /// Close the active session, record its summary and commit the state.
    ///
    /// If the commit fails the session is still closed in memory and the
    /// error is returned; [`MetricsCollector::save`] retries the commit.
    pub fn end_session(&mut self, status: SessionStatus) -> Result<SessionSummary> {
        let inner = self.inner.get_mut();
        let session = inner
            .session
            .take()
            .ok_or_else(|| Error::InvalidState("no active session to end".to_string()))?;

        let summary = summarize(&session, status, &inner.dashboard);
        inner.dashboard.sessions.push(summary.clone());
        inner.dashboard.total_sessions += 1;
        inner.dashboard.updated_at = Utc::now();

        tracing::info!(
            session_id = %summary.session_id,
            status = summary.status.as_str(),
            agents = summary.agents_invoked.len(),
            total_tokens = summary.total_tokens,
            "Session ended"
        );

        self.store.save(&inner.dashboard)?;
        Ok(summary)
    }

    /// Commit the current in-memory state.
    pub fn save(&self) -> Result<()> {
        let inner = self
            .inner
            .try_borrow()
            .map_err(|_| Error::InvalidState("metrics state is being updated".to_string()))?;
        self.store.save(&inner.dashboard)
    }

    /// Profile of `agent_name`; a zero-valued profile if it was never invoked.
    pub fn get_agent_profile(&self, agent_name: &str) -> AgentProfile {
        self.inner
            .borrow()
            .dashboard
            .agents
            .get(agent_name)
            .cloned()
            .unwrap_or_else(|| AgentProfile::new(agent_name))
    }

    /// Snapshot of the full state.
    pub fn get_dashboard_state(&self) -> DashboardState {
        self.inner.borrow().dashboard.clone()
    }

    pub fn current_session_id(&self) -> Option<String> {
        self.inner
            .borrow()
            .session
            .as_ref()
            .map(|s| s.session_id.clone())
    }

    pub fn is_active(&self) -> bool {
        self.inner.borrow().session.is_some()
    }

    /// Structural problems in the state, including profiles that differ
    /// from a replay of the event history. Empty when consistent.
    pub fn verify_consistency(&self) -> Vec<String> {
        let inner = self.inner.borrow();
        let dashboard = &inner.dashboard;
        let mut problems = dashboard.invariant_violations();

        let rebuilt = rebuild_profiles(&dashboard.events, &self.config);
        for (name, profile) in &dashboard.agents {
            if rebuilt.get(name) != Some(profile) {
                problems.push(format!("profile {} does not match its event history", name));
            }
        }
        for name in rebuilt.keys() {
            if !dashboard.agents.contains_key(name) {
                problems.push(format!("events reference agent {} with no profile", name));
            }
        }

        problems
    }

    /// Fold a finalized event into the state. Called once per tracker.
    pub(crate) fn record_event(&self, event: AgentEvent) -> Result<()> {
        let mut inner = self
            .inner
            .try_borrow_mut()
            .map_err(|_| Error::InvalidState("metrics state is already borrowed".to_string()))?;

        ProfileAggregator::new(&self.config).apply(&mut inner.dashboard, event);

        if self.config.persist_every_event {
            self.store.save(&inner.dashboard)?;
        }
        Ok(())
    }
}

fn summarize(
    session: &ActiveSession,
    status: SessionStatus,
    dashboard: &DashboardState,
) -> SessionSummary {
    let mut agents_invoked: Vec<String> = Vec::new();
    let mut tickets_worked: Vec<String> = Vec::new();
    let mut total_tokens: u64 = 0;
    let mut total_cost_usd = 0.0;

    for event in dashboard.session_events(&session.session_id) {
        if !agents_invoked.contains(&event.agent_name) {
            agents_invoked.push(event.agent_name.clone());
        }
        if !event.ticket_key.is_empty() && !tickets_worked.contains(&event.ticket_key) {
            tickets_worked.push(event.ticket_key.clone());
        }
        total_tokens = total_tokens.saturating_add(event.total_tokens);
        total_cost_usd += event.estimated_cost_usd;
    }

    SessionSummary {
        session_id: session.session_id.clone(),
        session_number: session.session_number,
        session_type: session.session_type,
        started_at: session.started_at,
        ended_at: Utc::now(),
        status,
        agents_invoked,
        total_tokens,
        total_cost_usd,
        tickets_worked,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_lifecycle_misuse_is_invalid_state() {
        let dir = TempDir::new().unwrap();
        let mut collector = MetricsCollector::new(dir.path()).unwrap();

        assert!(matches!(
            collector.end_session(SessionStatus::Continue),
            Err(Error::InvalidState(_))
        ));
        assert!(matches!(
            collector.track_agent("coding", ""),
            Err(Error::InvalidState(_))
        ));

        collector.start_session(1, true).unwrap();
        assert!(matches!(
            collector.start_session(2, false),
            Err(Error::InvalidState(_))
        ));
        assert!(collector.is_active());
    }

    #[test]
    fn test_session_summary_distinct_agents_and_tickets() {
        let dir = TempDir::new().unwrap();
        let mut collector = MetricsCollector::new(dir.path()).unwrap();
        let session_id = collector.start_session(1, true).unwrap();

        for (agent, ticket) in [
            ("linear", "AI-1"),
            ("coding", "AI-1"),
            ("linear", ""),
            ("github", "AI-2"),
        ] {
            let mut tracker = collector.track_agent(agent, ticket).unwrap();
            tracker.set_tokens(100, 50);
        }

        let summary = collector.end_session(SessionStatus::Complete).unwrap();
        assert_eq!(summary.session_id, session_id);
        assert_eq!(summary.session_type, SessionType::Initializer);
        assert_eq!(summary.agents_invoked, vec!["linear", "coding", "github"]);
        assert_eq!(summary.tickets_worked, vec!["AI-1", "AI-2"]);
        assert_eq!(summary.total_tokens, 600);
        assert!(!collector.is_active());
        assert!(collector.current_session_id().is_none());
    }

    #[test]
    fn test_empty_session() {
        let dir = TempDir::new().unwrap();
        let mut collector = MetricsCollector::new(dir.path()).unwrap();
        collector.start_session(3, false).unwrap();
        let summary = collector.end_session(SessionStatus::Error).unwrap();

        assert_eq!(summary.session_type, SessionType::Continuation);
        assert!(summary.agents_invoked.is_empty());
        assert_eq!(summary.total_tokens, 0);
        assert_eq!(collector.get_dashboard_state().total_sessions, 1);
        assert!(collector.store().path().exists());
    }

    #[test]
    fn test_unknown_agent_profile_is_zero_valued() {
        let dir = TempDir::new().unwrap();
        let collector = MetricsCollector::new(dir.path()).unwrap();
        let profile = collector.get_agent_profile("ghost");
        assert_eq!(profile.agent_name, "ghost");
        assert_eq!(profile.total_invocations, 0);
        assert_eq!(profile.level, 1);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let dir = TempDir::new().unwrap();
        let config = MetricsConfig {
            recent_events_window: 0,
            ..Default::default()
        };
        assert!(matches!(
            MetricsCollector::with_config(dir.path(), config),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_persist_every_event() {
        let dir = TempDir::new().unwrap();
        let config = MetricsConfig {
            persist_every_event: true,
            ..Default::default()
        };
        let mut collector = MetricsCollector::with_config(dir.path(), config).unwrap();
        collector.start_session(1, true).unwrap();
        collector.track_agent("coding", "").unwrap().finish().unwrap();

        let stored = collector.store().load().unwrap().unwrap();
        assert_eq!(stored.events.len(), 1);
        assert_eq!(stored.total_sessions, 0);
    }
}
