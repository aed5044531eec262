//! Error taxonomy for the migration core.
//!
//! Two tiers: `ShiftError` for run-level failures (configuration, memory
//! ceiling) and `FileFailure` for per-file problems, which are aggregated as
//! values and never propagated as `Err` across file boundaries.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Run-level errors. Anything here aborts the run (or refuses to start it).
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ShiftError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Memory ceiling exceeded with batch size already at floor ({floor} files)")]
    MemoryCeiling { floor: usize },

    #[error("Run cancelled")]
    Cancelled,

    #[error("Transformation requires an AST-bearing graph; got pooled (records-only) results")]
    RecordsOnlyGraph,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl ShiftError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

/// Result type alias for run-level operations.
pub type ShiftResult<T> = Result<T, ShiftError>;

/// The phase in which a per-file failure occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FailurePhase {
    Io,
    Parse,
    Graph,
    Transform,
}

/// A recorded per-file failure. The file is skipped and reported; the run
/// continues with the remaining files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileFailure {
    pub file: PathBuf,
    pub phase: FailurePhase,
    pub message: String,
}

impl FileFailure {
    pub fn new(file: impl Into<PathBuf>, phase: FailurePhase, message: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            phase,
            message: message.into(),
        }
    }

    pub fn parse(file: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::new(file, FailurePhase::Parse, message)
    }

    pub fn io(file: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::new(file, FailurePhase::Io, message)
    }
}
