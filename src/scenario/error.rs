//! Scenario-specific error helpers
//!
//! Input-format problems carry the 1-based line they were found on; file
//! problems carry the path that failed to open, read or write.

use std::path::Path;

use crate::error::{EngineError, EngineResult};

pub type ScenarioResult<T> = EngineResult<T>;

/// Attaches the offending path to an I/O failure
pub trait IoPathContext<T> {
    fn with_path(self, path: &Path) -> ScenarioResult<T>;
}

impl<T> IoPathContext<T> for Result<T, std::io::Error> {
    fn with_path(self, path: &Path) -> ScenarioResult<T> {
        self.map_err(|source| EngineError::io(path, source))
    }
}

/// Create a format error at `line`
pub fn format_error(line: usize, reason: impl Into<String>) -> EngineError {
    EngineError::scenario(line, reason)
}

/// Create an error for input that ended before `expected` was read
pub fn unexpected_end(line: usize, expected: &str) -> EngineError {
    EngineError::scenario(line, format!("unexpected end of input, expected {expected}"))
}

/// Create an error for a medium that has no density entry
pub fn missing_density(line: usize, medium: u8) -> EngineError {
    EngineError::scenario(
        line,
        format!("medium '{}' has no density entry", medium as char),
    )
}
