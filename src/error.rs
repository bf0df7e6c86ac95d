//! Error types for goldpair
//!
//! This module defines the error types used throughout the library.

use thiserror::Error;

/// Result type alias for goldpair operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building a paired dataset
#[derive(Error, Debug)]
pub enum Error {
    /// Grammar could not be loaded into a parser
    #[error("grammar error: {0}")]
    Grammar(String),

    /// Malformed structural query pattern
    #[error("query error: {0}")]
    Query(String),

    /// Source text could not be parsed
    #[error("parse error: {0}")]
    Parse(String),

    /// A required capture group matched nothing
    #[error("missing capture @{capture}: no node matched")]
    MissingCapture {
        /// Capture label
        capture: String,
    },

    /// A capture group that must match once matched several times
    #[error("ambiguous capture @{capture}: {count} nodes matched, expected exactly one")]
    AmbiguousCapture {
        /// Capture label
        capture: String,
        /// Number of matches
        count: usize,
    },

    /// Task basename cannot be used as a function name
    #[error("invalid task name '{0}': lowercased basename is not an identifier")]
    InvalidTaskName(String),

    /// Oracle synthesis failed (harness crash, load failure, bad parameter list)
    #[error("oracle error: {0}")]
    Oracle(String),

    /// Execution timeout
    #[error("execution timeout after {0}ms")]
    Timeout(u64),

    /// I/O error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Dataset layout error
    #[error("data error: {0}")]
    Data(String),

    /// Error raised while processing one task
    #[error("task {task}: {source}")]
    Task {
        /// Task basename
        task: String,
        /// Underlying error
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Attach the task identifier to an error
    #[must_use]
    pub fn in_task(self, task: impl Into<String>) -> Self {
        Self::Task {
            task: task.into(),
            source: Box::new(self),
        }
    }

    /// Whether this error invalidates the whole run rather than a single task
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Grammar(_) | Self::Query(_) | Self::Configuration(_) => true,
            Self::Task { source, .. } => source.is_fatal(),
            _ => false,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_task_wraps_message() {
        let err = Error::MissingCapture {
            capture: "func".to_string(),
        }
        .in_task("ADD_TWO");
        assert_eq!(
            err.to_string(),
            "task ADD_TWO: missing capture @func: no node matched"
        );
    }

    #[test]
    fn test_fatal_classification() {
        assert!(Error::Query("bad".into()).is_fatal());
        assert!(Error::Query("bad".into()).in_task("T").is_fatal());
        assert!(!Error::Parse("x".into()).is_fatal());
        assert!(!Error::Oracle("x".into()).in_task("T").is_fatal());
    }

    #[test]
    fn test_ambiguous_capture_display() {
        let err = Error::AmbiguousCapture {
            capture: "var_value".into(),
            count: 2,
        };
        assert!(err.to_string().contains("2 nodes matched"));
    }
}
