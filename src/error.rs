// Error types for OCEAN Duet
//
// Transient service failures (network, provider, timeout, malformed output)
// are recovered per turn by the orchestrator. Untrusted numeric output is
// clamped at the boundary and never surfaces here.

use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DuetError>;

#[derive(Debug, Error)]
pub enum DuetError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Non-success response or unusable payload from an external service.
    #[error("{service} service error: {message}")]
    Provider { service: String, message: String },

    #[error("{service} call timed out after {after:?}")]
    Timeout { service: String, after: Duration },

    #[error("Turn cancelled")]
    Cancelled,

    #[error("Generation returned empty dialogue")]
    EmptyDialogue,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Document content is empty")]
    EmptyDocument,

    #[error("Illegal status transition: {event} while {from}")]
    InvalidTransition { from: String, event: String },

    #[error("No rules registered for strategy '{0}'")]
    UnknownStrategy(String),

    #[error("Unsupported export version: {0}")]
    UnsupportedExportVersion(String),

    #[error("Conversation halted after {failures} consecutive turn failures")]
    RunFailed { failures: usize },
}

impl DuetError {
    pub fn provider(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            service: service.into(),
            message: message.into(),
        }
    }

    /// Cancellation is not a failure and never consumes the failure budget.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, DuetError::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_message() {
        let err = DuetError::provider("generation", "HTTP 500");
        assert_eq!(err.to_string(), "generation service error: HTTP 500");
        assert!(!err.is_cancelled());
        assert!(DuetError::Cancelled.is_cancelled());
    }
}
