//! Dependency-oracle error types.

use thiserror::Error;

/// A single oracle call failed. Never fatal for the resolution as a whole:
/// the object is recorded with no dependencies and the run continues.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OracleError {
    #[error("failed to run dependency query: {message}")]
    Spawn { message: String },

    #[error("dependency query exited with code {code:?}: {stderr}")]
    ExitStatus { code: Option<i32>, stderr: String },

    #[error("no dependency data recorded")]
    Empty,

    #[error("dependency query timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("resolution cancelled before the query ran")]
    Cancelled,
}

impl OracleError {
    /// Short category used to group failures in the summary report.
    pub fn kind(&self) -> &'static str {
        match self {
            OracleError::Spawn { .. } => "spawn",
            OracleError::ExitStatus { .. } => "exit status",
            OracleError::Empty => "no data",
            OracleError::Timeout { .. } => "timeout",
            OracleError::Cancelled => "cancelled",
        }
    }
}

/// The oracle tool itself can't be used; nothing can be resolved.
#[derive(Debug, Error)]
#[error("dependency tool `{tool}` not found\nhelp: install ninja or pass --ninja <path>")]
pub struct OracleUnavailable {
    pub tool: String,
}
