//! agentstat - agent metrics viewer
//!
//! Read-only views over the metrics state of one project directory: project
//! totals, per-agent levels and streaks, and session history.

use std::path::PathBuf;

use agentstat_core::format::{
    format_duration, format_percent, format_relative_time, format_relative_time_opt,
    format_tokens, format_usd, progress_bar,
};
use agentstat_core::{AgentProfile, Config, DashboardState, MetricsStore};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "agentstat")]
#[command(about = "Levels, streaks and session history of your AI agents")]
#[command(version)]
struct Args {
    /// Project directory holding the metrics state
    #[arg(long, global = true, default_value = ".")]
    project_dir: PathBuf,

    /// Output format: text (default) or json
    #[arg(long, global = true, default_value = "text")]
    format: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Project-wide totals
    Summary,
    /// One row per agent
    Agents,
    /// Full profile of one agent
    Profile {
        /// Agent name
        agent: String,
    },
    /// Most recent closed sessions
    Sessions {
        /// Number of sessions to show
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

/// Number of recent events listed in the profile view.
const RECENT_EVENTS_SHOWN: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let format = match args.format.as_str() {
        "text" => OutputFormat::Text,
        "json" => OutputFormat::Json,
        other => anyhow::bail!("Unknown output format: {}. Use 'text' or 'json'", other),
    };

    let config = Config::load().context("failed to load configuration")?;
    let _log_guard = agentstat_core::logging::init(&config.logging).ok();

    let store = MetricsStore::new(&args.project_dir, &config.metrics);
    let state = store
        .load_or_init()
        .with_context(|| format!("failed to read metrics state at {}", store.path().display()))?;
    tracing::debug!(path = %store.path().display(), "Viewing metrics state");

    match args.command {
        Command::Summary => match format {
            OutputFormat::Text => print_summary(&state),
            OutputFormat::Json => print_summary_json(&state)?,
        },
        Command::Agents => match format {
            OutputFormat::Text => print_agents(&state),
            OutputFormat::Json => print_json(&state.agents.values().collect::<Vec<_>>())?,
        },
        Command::Profile { agent } => {
            let profile = state
                .agents
                .get(&agent)
                .cloned()
                .unwrap_or_else(|| AgentProfile::new(agent.as_str()));
            match format {
                OutputFormat::Text => print_profile(&profile, &state),
                OutputFormat::Json => print_profile_json(&profile)?,
            }
        }
        Command::Sessions { limit } => {
            let skip = state.sessions.len().saturating_sub(limit);
            let sessions = &state.sessions[skip..];
            match format {
                OutputFormat::Text => print_sessions(sessions),
                OutputFormat::Json => print_json(&sessions)?,
            }
        }
    }

    Ok(())
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_summary(state: &DashboardState) {
    println!();
    println!("Project: {}", state.project_name);
    println!("  Sessions:  {}", state.total_sessions);
    println!("  Events:    {}", state.events.len());
    println!("  Agents:    {}", state.agents.len());
    println!("  Tokens:    {}", format_tokens(state.total_tokens));
    println!("  Cost:      {}", format_usd(state.total_cost_usd));
    println!("  Duration:  {}", format_duration(state.total_duration_seconds));
    println!();
}

fn print_summary_json(state: &DashboardState) -> Result<()> {
    let json = serde_json::json!({
        "project_name": state.project_name,
        "total_sessions": state.total_sessions,
        "total_events": state.events.len(),
        "total_agents": state.agents.len(),
        "total_tokens": state.total_tokens,
        "total_cost_usd": state.total_cost_usd,
        "total_duration_seconds": state.total_duration_seconds,
        "created_at": state.created_at,
        "updated_at": state.updated_at,
    });
    print_json(&json)
}

fn print_agents(state: &DashboardState) {
    if state.agents.is_empty() {
        println!("No agents recorded yet.");
        return;
    }

    println!(
        "{:<16} {:>3} {:<14} {:>7} {:>7} {:>8} {:>9}",
        "AGENT", "LVL", "TITLE", "XP", "CALLS", "SUCCESS", "STREAK"
    );
    for profile in state.agents.values() {
        println!(
            "{:<16} {:>3} {:<14} {:>7} {:>7} {:>8} {:>9}",
            profile.agent_name,
            profile.level,
            profile.level_title(),
            profile.xp,
            profile.total_invocations,
            format_percent(profile.success_rate),
            format!("{}/{}", profile.current_streak, profile.best_streak),
        );
    }
}

fn print_profile(profile: &AgentProfile, state: &DashboardState) {
    let (into_level, level_span) = profile.level_progress();

    println!();
    println!(
        "{}  Level {} {}",
        profile.agent_name,
        profile.level,
        profile.level_title()
    );
    println!(
        "  XP {} {} ({} to next level)",
        profile.xp,
        progress_bar(into_level, level_span, 20),
        profile.xp_to_next_level()
    );
    println!();
    println!(
        "  Invocations: {} ({} ok, {} failed, {})",
        profile.total_invocations,
        profile.successful_invocations,
        profile.failed_invocations,
        format_percent(profile.success_rate)
    );
    println!(
        "  Streak:      {} (best {})",
        profile.current_streak, profile.best_streak
    );
    println!(
        "  Tokens:      {} ({:.0} per call)",
        format_tokens(profile.total_tokens),
        profile.avg_tokens_per_call
    );
    println!(
        "  Cost:        {} ({} per success)",
        format_usd(profile.total_cost_usd),
        format_usd(profile.cost_per_success_usd)
    );
    println!(
        "  Avg time:    {}",
        format_duration(profile.avg_duration_seconds)
    );
    println!(
        "  Last active: {}",
        format_relative_time_opt(profile.last_active)
    );
    if !profile.last_error.is_empty() {
        println!("  Last error:  {}", profile.last_error);
    }

    print_tags("Achievements", &profile.achievements);
    print_tags("Strengths", &profile.strengths);
    print_tags("Weaknesses", &profile.weaknesses);
    print_recent_events(profile, state);
    println!();
}

/// Last few events of the profile's recent window, newest first.
fn print_recent_events(profile: &AgentProfile, state: &DashboardState) {
    if profile.recent_events.is_empty() {
        return;
    }

    println!("  Recent events:");
    for event_id in profile.recent_events.iter().rev().take(RECENT_EVENTS_SHOWN) {
        match state.event(event_id) {
            Some(event) => {
                let ticket = if event.ticket_key.is_empty() {
                    "-"
                } else {
                    event.ticket_key.as_str()
                };
                println!(
                    "    {} {:<8} {:>8} {:>8} {:<10} {}",
                    short_id(event_id),
                    event.status.as_str(),
                    format_duration(event.duration_seconds),
                    format_tokens(event.total_tokens),
                    ticket,
                    format_relative_time(event.ended_at),
                );
            }
            None => println!("    {}", short_id(event_id)),
        }
    }
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

fn print_tags(label: &str, tags: &[String]) {
    if tags.is_empty() {
        return;
    }
    println!("  {}: {}", label, tags.join(", "));
}

fn print_profile_json(profile: &AgentProfile) -> Result<()> {
    let (into_level, level_span) = profile.level_progress();
    let mut json = serde_json::to_value(profile)?;
    if let Some(obj) = json.as_object_mut() {
        obj.insert("level_title".into(), profile.level_title().into());
        obj.insert("xp_to_next_level".into(), profile.xp_to_next_level().into());
        obj.insert(
            "level_progress".into(),
            serde_json::json!([into_level, level_span]),
        );
    }
    print_json(&json)
}

fn print_sessions(sessions: &[agentstat_core::SessionSummary]) {
    if sessions.is_empty() {
        println!("No sessions recorded yet.");
        return;
    }

    for session in sessions.iter().rev() {
        println!(
            "#{:<4} {:<12} {:<8} {:>8} {:>9}  {}",
            session.session_number,
            session.session_type.as_str(),
            session.status.as_str(),
            format_tokens(session.total_tokens),
            format_usd(session.total_cost_usd),
            session.agents_invoked.join(", "),
        );
        if !session.tickets_worked.is_empty() {
            println!("      tickets: {}", session.tickets_worked.join(", "));
        }
    }
}
