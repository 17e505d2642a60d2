//! # agentstat-core
//!
//! Core library for agentstat - metrics and gamification for orchestrated
//! AI agents.
//!
//! This library provides:
//! - Session lifecycle and scoped per-invocation tracking
//! - Per-agent profiles with XP, levels, streaks and achievements
//! - Durable JSON state per project directory
//! - Configuration management
//! - Logging infrastructure
//!
//! ## Architecture
//!
//! Data flows one way:
//! - **Events:** each [`AgentTracker`] scope produces one immutable [`AgentEvent`]
//! - **Profiles:** the aggregator folds every event into its agent's [`AgentProfile`]
//! - **State:** the [`MetricsStore`] commits the whole [`DashboardState`] when a session closes
//!
//! Profiles are derived data: replaying the event list reproduces them.
//!
//! ## Example
//!
//! ```rust,no_run
//! use agentstat_core::{MetricsCollector, SessionStatus};
//!
//! # fn main() -> agentstat_core::Result<()> {
//! let mut collector = MetricsCollector::new(".")?;
//! collector.start_session(1, true)?;
//! {
//!     let mut tracker = collector.track_agent("coding", "AI-42")?;
//!     tracker.set_tokens(1000, 500);
//!     tracker.add_artifact("file:src/main.rs");
//! }
//! let summary = collector.end_session(SessionStatus::Continue)?;
//! println!("{} tokens", summary.total_tokens);
//! # Ok(())
//! # }
//! ```

// Re-export commonly used items at the crate root
pub use aggregate::{rebuild_profiles, ProfileAggregator};
pub use collector::MetricsCollector;
pub use config::{Config, MetricsConfig};
pub use error::{Error, Result};
pub use store::MetricsStore;
pub use tracker::AgentTracker;
pub use types::*;

// Public modules
pub mod aggregate;
pub mod collector;
pub mod config;
pub mod error;
pub mod format;
pub mod gamification;
pub mod logging;
pub mod store;
pub mod tracker;
pub mod types;
