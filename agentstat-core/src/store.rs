//! Durable storage for the dashboard state
//!
//! The whole [`DashboardState`] is one JSON document at
//! `<project_dir>/<state_file>`. Saves write a sibling `.tmp` file, sync it
//! and rename it over the target, so a reader never observes a partially
//! written document.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::MetricsConfig;
use crate::error::{Error, Result};
use crate::types::{DashboardState, STATE_VERSION};

/// Handle to the state document of one project directory.
#[derive(Debug, Clone)]
pub struct MetricsStore {
    project_dir: PathBuf,
    path: PathBuf,
}

impl MetricsStore {
    pub fn new(project_dir: impl AsRef<Path>, config: &MetricsConfig) -> Self {
        let project_dir = project_dir.as_ref().to_path_buf();
        let path = project_dir.join(&config.state_file);
        Self { project_dir, path }
    }

    /// Location of the state document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    /// Project name recorded in fresh states: the project directory's name.
    pub fn project_name(&self) -> String {
        let dir = fs::canonicalize(&self.project_dir).unwrap_or_else(|_| self.project_dir.clone());
        dir.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "project".to_string())
    }

    /// Read the stored state. `Ok(None)` when no document exists yet.
    pub fn load(&self) -> Result<Option<DashboardState>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::persistence(&self.path, e)),
        };

        let raw: serde_json::Value =
            serde_json::from_str(&content).map_err(|e| Error::persistence(&self.path, e))?;

        match raw.get("version").and_then(serde_json::Value::as_u64) {
            Some(v) if v == u64::from(STATE_VERSION) => {}
            Some(found) => {
                return Err(Error::SchemaVersion {
                    found,
                    supported: STATE_VERSION,
                })
            }
            None => {
                return Err(Error::persistence(
                    &self.path,
                    "state document has no numeric version field",
                ))
            }
        }

        let state: DashboardState =
            serde_json::from_value(raw).map_err(|e| Error::persistence(&self.path, e))?;

        tracing::debug!(
            path = %self.path.display(),
            events = state.events.len(),
            sessions = state.sessions.len(),
            "Loaded metrics state"
        );
        Ok(Some(state))
    }

    /// Stored state, or a fresh one named after the project directory.
    pub fn load_or_init(&self) -> Result<DashboardState> {
        match self.load()? {
            Some(state) => Ok(state),
            None => {
                tracing::info!(
                    path = %self.path.display(),
                    "No metrics state found, starting fresh"
                );
                Ok(DashboardState::new(self.project_name()))
            }
        }
    }

    /// Atomically replace the stored document with `state`.
    pub fn save(&self, state: &DashboardState) -> Result<()> {
        let json =
            serde_json::to_vec_pretty(state).map_err(|e| Error::persistence(&self.path, e))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| Error::persistence(parent, e))?;
            }
        }

        let tmp_path = self.tmp_path();
        let written = write_synced(&tmp_path, &json)
            .and_then(|()| replace_file_atomic(&tmp_path, &self.path));
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp_path);
            return Err(Error::persistence(&self.path, e));
        }

        tracing::debug!(
            path = %self.path.display(),
            bytes = json.len(),
            "Saved metrics state"
        );
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }
}

fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

#[cfg(windows)]
fn replace_file_atomic(from: &Path, to: &Path) -> std::io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(err)
            if matches!(
                err.kind(),
                std::io::ErrorKind::AlreadyExists | std::io::ErrorKind::PermissionDenied
            ) && to.exists() =>
        {
            let _ = fs::remove_file(to);
            fs::rename(from, to)
        }
        Err(err) => Err(err),
    }
}

#[cfg(not(windows))]
fn replace_file_atomic(from: &Path, to: &Path) -> std::io::Result<()> {
    fs::rename(from, to)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, MetricsStore) {
        let dir = TempDir::new().unwrap();
        let store = MetricsStore::new(dir.path(), &MetricsConfig::default());
        (dir, store)
    }

    #[test]
    fn test_missing_file_loads_none() {
        let (_dir, store) = store();
        assert!(store.load().unwrap().is_none());

        let state = store.load_or_init().unwrap();
        assert_eq!(state.total_sessions, 0);
        assert!(state.agents.is_empty());
        assert!(!store.path().exists());
    }

    #[test]
    fn test_project_name_from_directory() {
        let dir = TempDir::new().unwrap();
        let project = dir.path().join("my-project");
        fs::create_dir(&project).unwrap();
        let store = MetricsStore::new(&project, &MetricsConfig::default());

        assert_eq!(store.load_or_init().unwrap().project_name, "my-project");
    }

    #[test]
    fn test_save_then_load() {
        let (_dir, store) = store();
        let mut state = DashboardState::new("demo");
        state.total_tokens = 1500;
        state.total_cost_usd = 0.0105;

        store.save(&state).unwrap();
        assert!(store.path().ends_with(".agent_metrics.json"));
        assert!(!store.tmp_path().exists());

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded, state);
    }

    #[test]
    fn test_floats_survive_reload_exactly() {
        let (_dir, store) = store();
        let mut state = DashboardState::new("demo");

        for i in 0..500u64 {
            let cost = ((137 * i + 11) as f64 / 1000.0) * 0.003
                + ((59 * i + 3) as f64 / 1000.0) * 0.015;
            state.total_cost_usd += cost;
            state.total_duration_seconds += 1.0 / (i as f64 + 3.0);

            store.save(&state).unwrap();
            let loaded = store.load().unwrap().unwrap();
            assert_eq!(loaded.total_cost_usd, state.total_cost_usd, "iteration {i}");
            assert_eq!(
                loaded.total_duration_seconds, state.total_duration_seconds,
                "iteration {i}"
            );
        }
    }

    #[test]
    fn test_save_overwrites_previous_document() {
        let (_dir, store) = store();
        let mut state = DashboardState::new("demo");
        store.save(&state).unwrap();

        state.total_sessions = 0;
        state.project_name = "renamed".into();
        store.save(&state).unwrap();

        assert_eq!(store.load().unwrap().unwrap().project_name, "renamed");
    }

    #[test]
    fn test_unknown_version_rejected() {
        let (_dir, store) = store();
        let mut state = DashboardState::new("demo");
        state.version = 99;
        store.save(&state).unwrap();

        let err = store.load().unwrap_err();
        assert!(matches!(
            err,
            Error::SchemaVersion {
                found: 99,
                supported: 1
            }
        ));
        assert!(err.is_persistence());
    }

    #[test]
    fn test_corrupt_document_is_persistence_error() {
        let (_dir, store) = store();
        fs::write(store.path(), "{ not json").unwrap();
        assert!(matches!(store.load(), Err(Error::Persistence { .. })));

        fs::write(store.path(), r#"{"project_name": "x"}"#).unwrap();
        assert!(matches!(store.load(), Err(Error::Persistence { .. })));

        fs::write(store.path(), r#"{"version": 1, "project_name": 3}"#).unwrap();
        assert!(matches!(store.load(), Err(Error::Persistence { .. })));
    }

    #[test]
    fn test_custom_state_file_name() {
        let dir = TempDir::new().unwrap();
        let config = MetricsConfig {
            state_file: "metrics/state.json".into(),
            ..Default::default()
        };
        let store = MetricsStore::new(dir.path(), &config);
        store.save(&DashboardState::new("demo")).unwrap();

        assert!(dir.path().join("metrics/state.json").exists());
    }
}
