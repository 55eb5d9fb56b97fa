//! Error and warning types shared by the samplers and the sort engine.
//!
//! Failures are split by who recovers from them: `SampleError` is absorbed by
//! the refresh coordinator (keep the last snapshot), `ParseWarning` is attached
//! to a snapshot without failing it, and `SortError`/`DurationError` go back
//! to whoever asked for the sort.

use thiserror::Error;

/// Failure of a whole sampling pass
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SampleError {
    /// Provider missing, not executable, non-zero exit or timed out
    #[error("{command} unavailable: {reason}")]
    SourceUnavailable { command: String, reason: String },

    /// Provider ran but its output does not have the expected shape
    #[error("malformed {command} output: {reason}")]
    MalformedPayload { command: String, reason: String },
}

impl SampleError {
    pub fn unavailable(command: &str, reason: impl Into<String>) -> Self {
        SampleError::SourceUnavailable {
            command: command.to_string(),
            reason: reason.into(),
        }
    }

    pub fn malformed(command: &str, reason: impl Into<String>) -> Self {
        SampleError::MalformedPayload {
            command: command.to_string(),
            reason: reason.into(),
        }
    }

    /// True for transient provider failures (as opposed to schema mismatches)
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        matches!(self, SampleError::SourceUnavailable { .. })
    }
}

/// Per-record problem that skips one record but keeps the sample
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseWarning {
    #[error("partition '{partition}' reports zero total nodes, skipped")]
    DivisionByZero { partition: String },

    #[error("line {line}: {reason}")]
    MalformedLine { line: usize, reason: String },
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DurationError {
    #[error("invalid time format: '{0}'")]
    InvalidDurationFormat(String),
}

/// Failure of a single sort request. The snapshot is never affected.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SortError {
    #[error("unknown column '{0}'")]
    UnknownColumn(String),

    #[error("column {column}: {source}")]
    InvalidDuration {
        column: &'static str,
        #[source]
        source: DurationError,
    },

    #[error("column {column}: '{value}' is not an integer")]
    InvalidInteger { column: &'static str, value: String },
}
