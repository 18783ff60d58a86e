//! Engine-wide error handling
//!
//! Recoverable failures (bad scenario input, unreadable files, bad options)
//! surface as `EngineError`. Broken internal invariants are not represented
//! here: they abort through panics at the point of detection.

use std::path::PathBuf;

/// Result alias used throughout the crate
pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Malformed or missing scenario field
    #[error("scenario line {line}: {reason}")]
    Scenario { line: usize, reason: String },

    /// File could not be opened, read or written
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("unsupported numeric type: {0}")]
    UnsupportedNumericType(String),

    #[error("unsupported type combination p={p}, v={v}, v_flow={v_flow} (supported: {supported})")]
    UnsupportedCombination {
        p: String,
        v: String,
        v_flow: String,
        supported: String,
    },

    #[error("failed to spawn worker thread: {0}")]
    ThreadSpawn(#[source] std::io::Error),
}

impl EngineError {
    pub fn scenario(line: usize, reason: impl Into<String>) -> Self {
        EngineError::Scenario {
            line,
            reason: reason.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        EngineError::Io {
            path: path.into(),
            source,
        }
    }
}
