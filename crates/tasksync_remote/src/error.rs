//! Error types for the remote store.

use thiserror::Error;

/// Result type for remote operations.
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Errors that can occur in remote store operations.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The remote store cannot be reached.
    #[error("remote store unavailable")]
    Unavailable,

    /// The server rejected a request.
    #[error("remote store rejected request: {message}")]
    Rejected {
        /// Server-supplied reason.
        message: String,
    },

    /// `unsubscribe` was called with a token the store does not know.
    #[error("unknown subscription token {token}")]
    UnknownSubscription {
        /// The offending token value.
        token: u64,
    },
}

impl RemoteError {
    /// Creates a rejection error.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }
}
