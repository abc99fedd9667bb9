//! Error types for classync.

use thiserror::Error;

use crate::transport::TransportError;

/// Errors surfaced by the queue, the sync engine and the write path.
#[derive(Debug, Error)]
pub enum ClassyncError {
    /// The durable queue store failed (open, quota, corruption, query).
    #[error("storage error: {0}")]
    Storage(String),

    /// Configuration could not be read, parsed or written.
    #[error("configuration error: {0}")]
    Config(String),

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The transport failed to deliver a request.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// No credential, or the server refused the credential.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The server answered with a non-success status.
    #[error("request rejected with status {status}: {message}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Response body or reason phrase.
        message: String,
    },

    /// A queue entry or resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Invalid user input.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl ClassyncError {
    /// Whether this error means the network was unreachable.
    #[must_use]
    pub const fn is_connectivity(&self) -> bool {
        matches!(self, Self::Transport(TransportError::Connectivity(_)))
    }

    /// Process exit code for the CLI.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Unauthorized(_) => 3,
            Self::NotFound(_) => 4,
            Self::InvalidInput(_) | Self::Config(_) => 2,
            _ => 1,
        }
    }
}

impl From<rusqlite::Error> for ClassyncError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connectivity_detection() {
        let offline = ClassyncError::Transport(TransportError::Connectivity("refused".into()));
        assert!(offline.is_connectivity());

        let other = ClassyncError::Transport(TransportError::Request("bad header".into()));
        assert!(!other.is_connectivity());
        assert!(!ClassyncError::Unauthorized("no token".into()).is_connectivity());
    }

    #[test]
    fn test_rejected_display() {
        let err = ClassyncError::Rejected {
            status: 422,
            message: "grade missing".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "request rejected with status 422: grade missing"
        );
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(ClassyncError::Unauthorized(String::new()).exit_code(), 3);
        assert_eq!(ClassyncError::NotFound(String::new()).exit_code(), 4);
        assert_eq!(ClassyncError::Storage(String::new()).exit_code(), 1);
    }
}
