//! Error types for the writer and its components.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::destination::DestinationKind;

/// Errors that may occur while building a [`TandemLog`](crate::TandemLog).
#[derive(Debug, Error)]
pub enum BuildError {
    /// Invalid user supplied configuration.
    #[error("invalid writer configuration: {0}")]
    InvalidConfig(String),
    /// A background thread could not be started.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Failure of a non-suppressed write.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("gave up writing to {} after {attempts} attempts: {source}", path.display())]
    RetriesExhausted {
        path: PathBuf,
        attempts: u32,
        #[source]
        source: io::Error,
    },
    #[error("write cancelled because the writer is stopping")]
    Cancelled,
    #[error("{kind} log folder {} is unavailable: {source}", path.display())]
    FolderUnavailable {
        kind: DestinationKind,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Failure while merging an offline backlog file into the online folder.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("backlog path has no file name: {}", .0.display())]
    InvalidFileName(PathBuf),
    #[error(transparent)]
    Write(#[from] WriteError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Errors raised while loading a [`FileConfig`](crate::FileConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid INI: {0}")]
    Ini(#[from] ini::ParseError),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("missing section [{0}]")]
    MissingSection(&'static str),
    #[error("missing required key: {0}")]
    MissingKey(&'static str),
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}
