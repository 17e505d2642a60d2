//! Error types for agentstat-core

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the agentstat-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Lifecycle misuse: ending without starting, starting twice,
    /// tracking without an open session
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Unknown contribution type or out-of-range level lookup
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Reading, writing or decoding the state document failed
    #[error("persistence error at {path:?}: {message}")]
    Persistence { path: PathBuf, message: String },

    /// State document written by an unknown schema version
    #[error("unsupported state schema version {found} (supported: {supported})")]
    SchemaVersion { found: u64, supported: u32 },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// True for any failure of the durable store (load, save, schema).
    pub fn is_persistence(&self) -> bool {
        matches!(
            self,
            Error::Persistence { .. } | Error::SchemaVersion { .. } | Error::Io(_) | Error::Json(_)
        )
    }

    pub(crate) fn persistence(path: impl Into<PathBuf>, message: impl std::fmt::Display) -> Self {
        Error::Persistence {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

/// Result type alias for agentstat-core
pub type Result<T> = std::result::Result<T, Error>;
