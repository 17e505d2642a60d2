//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/agentstat/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/agentstat/` (~/.config/agentstat/)
//! - State/Logs: `$XDG_STATE_HOME/agentstat/` (~/.local/state/agentstat/)
//!
//! The metrics state document itself lives inside each project directory
//! (see [`MetricsConfig::state_file`]), not under XDG paths.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    /// Scoring, pricing and persistence knobs
    #[serde(default)]
    pub metrics: MetricsConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Metrics collection configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct MetricsConfig {
    /// XP awarded for any successful invocation
    #[serde(default = "default_base_xp")]
    pub base_xp: u32,

    /// USD per 1000 input tokens
    #[serde(default = "default_input_cost")]
    pub input_cost_per_1k: f64,

    /// USD per 1000 output tokens
    #[serde(default = "default_output_cost")]
    pub output_cost_per_1k: f64,

    /// Number of event ids kept in each profile's `recent_events`
    #[serde(default = "default_recent_events_window")]
    pub recent_events_window: usize,

    /// Commit the state after every finalized event, not only on session close
    #[serde(default)]
    pub persist_every_event: bool,

    /// Feed measured invocation duration into the speed bonus
    #[serde(default)]
    pub award_speed_bonus: bool,

    /// Model recorded when neither the tracker nor `agent_models` names one
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Per-agent default model overrides
    #[serde(default)]
    pub agent_models: HashMap<String, String>,

    /// File name of the state document inside the project directory
    #[serde(default = "default_state_file")]
    pub state_file: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            base_xp: default_base_xp(),
            input_cost_per_1k: default_input_cost(),
            output_cost_per_1k: default_output_cost(),
            recent_events_window: default_recent_events_window(),
            persist_every_event: false,
            award_speed_bonus: false,
            default_model: default_model(),
            agent_models: HashMap::new(),
            state_file: default_state_file(),
        }
    }
}

fn default_base_xp() -> u32 {
    10
}

fn default_input_cost() -> f64 {
    0.003
}

fn default_output_cost() -> f64 {
    0.015
}

fn default_recent_events_window() -> usize {
    10
}

fn default_model() -> String {
    "sonnet".to_string()
}

fn default_state_file() -> String {
    ".agent_metrics.json".to_string()
}

impl MetricsConfig {
    /// Model to record for `agent_name` when the tracker was not given one.
    pub fn model_for(&self, agent_name: &str) -> &str {
        self.agent_models
            .get(agent_name)
            .map(String::as_str)
            .unwrap_or(self.default_model.as_str())
    }

    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        for (name, rate) in [
            ("input_cost_per_1k", self.input_cost_per_1k),
            ("output_cost_per_1k", self.output_cost_per_1k),
        ] {
            if !rate.is_finite() || rate < 0.0 {
                return Err(Error::Config(format!(
                    "metrics.{} must be a non-negative number",
                    name
                )));
            }
        }
        if self.recent_events_window == 0 {
            return Err(Error::Config(
                "metrics.recent_events_window must be at least 1".to_string(),
            ));
        }
        if self.state_file.trim().is_empty() {
            return Err(Error::Config(
                "metrics.state_file must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        config.metrics.validate()?;
        Ok(config)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/agentstat/config.toml` (~/.config/agentstat/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("agentstat").join("config.toml")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/agentstat/` (~/.local/state/agentstat/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("agentstat")
    }

    /// Returns the log file path
    ///
    /// `$XDG_STATE_HOME/agentstat/agentstat.log` (~/.local/state/agentstat/agentstat.log)
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("agentstat.log")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.metrics.base_xp, 10);
        assert_eq!(config.metrics.input_cost_per_1k, 0.003);
        assert_eq!(config.metrics.output_cost_per_1k, 0.015);
        assert_eq!(config.metrics.recent_events_window, 10);
        assert!(!config.metrics.persist_every_event);
        assert!(!config.metrics.award_speed_bonus);
        assert_eq!(config.metrics.state_file, ".agent_metrics.json");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[metrics]
base_xp = 15
persist_every_event = true
default_model = "haiku"

[metrics.agent_models]
coding = "opus"

[logging]
level = "debug"
"#;
        let config: Config = toml::from_str(toml).unwrap();

        assert_eq!(config.metrics.base_xp, 15);
        assert!(config.metrics.persist_every_event);
        assert_eq!(config.metrics.input_cost_per_1k, 0.003);
        assert_eq!(config.metrics.model_for("coding"), "opus");
        assert_eq!(config.metrics.model_for("slack"), "haiku");
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_metrics_config_validation() {
        assert!(MetricsConfig::default().validate().is_ok());

        let config = MetricsConfig {
            input_cost_per_1k: -1.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = MetricsConfig {
            output_cost_per_1k: f64::NAN,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = MetricsConfig {
            recent_events_window: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[metrics]\nrecent_events_window = 0\n").unwrap();
        assert!(matches!(Config::load_from(&path), Err(Error::Config(_))));

        std::fs::write(&path, "not = [valid").unwrap();
        assert!(matches!(Config::load_from(&path), Err(Error::Config(_))));
    }
}
