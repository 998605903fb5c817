// src/errors.rs

//! Crate-wide error type.
//!
//! Errors raised while resolving paths or touching the filesystem carry the
//! name of the operation that failed (`"expand"`, `"listdir"`, `"move"`, ...).
//! Callers branch on [`ShellError::op`]; the tags are stable strings.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShellError {
    #[error("{op}: unknown variable ${name}")]
    UnknownVariable { op: &'static str, name: String },

    #[error("{op}: no such file or directory: {}", path.display())]
    PathNotFound { op: &'static str, path: PathBuf },

    #[error("{op}: no paths match {pattern}")]
    NoMatch { op: &'static str, pattern: String },

    #[error("{op}: invalid path pattern: {reason}")]
    InvalidPattern { op: &'static str, reason: String },

    #[error("{op}: {}: {source}", path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("task '{task}' failed: {source}")]
    TaskFailed {
        task: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("File watch error: {0}")]
    WatchError(#[from] notify::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ShellError {
    /// Build an [`ShellError::Io`] tagged with `op`.
    pub fn io(op: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ShellError::Io {
            op,
            path: path.into(),
            source,
        }
    }

    /// Name of the operation that failed, when the error is operation-tagged.
    pub fn op(&self) -> Option<&'static str> {
        match self {
            ShellError::UnknownVariable { op, .. }
            | ShellError::PathNotFound { op, .. }
            | ShellError::NoMatch { op, .. }
            | ShellError::InvalidPattern { op, .. }
            | ShellError::Io { op, .. } => Some(op),
            _ => None,
        }
    }

    /// The underlying `io::ErrorKind`, if this wraps an IO failure.
    pub fn io_kind(&self) -> Option<std::io::ErrorKind> {
        match self {
            ShellError::Io { source, .. } => Some(source.kind()),
            _ => None,
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, ShellError>;
