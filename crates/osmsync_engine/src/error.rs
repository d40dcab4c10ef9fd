//! Error types for the sync engine.

use osmsync_codec::CodecError;
use osmsync_core::CoreError;
use thiserror::Error;

/// Result type for engine operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur while talking to the API.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SyncError {
    /// Local logic error from the primitive model or reconciliation.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Request or response body could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// The server answered with a failure status.
    #[error("HTTP {status} {reason}")]
    Transport {
        /// HTTP status code.
        status: u16,
        /// Reason phrase.
        reason: String,
        /// Response body, usually the server's explanation.
        payload: String,
    },

    /// The request never got a response.
    #[error("connection error: {0}")]
    Connection(String),

    /// Redirect chain exceeded the configured limit.
    #[error("too many redirects (limit {limit})")]
    TooManyRedirects {
        /// Configured limit.
        limit: u32,
    },

    /// The response was successful but its body is not what the call
    /// returns.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),
}

impl SyncError {
    /// Creates a transport error from a failed response.
    pub fn transport(status: u16, reason: impl Into<String>, payload: impl Into<String>) -> Self {
        Self::Transport {
            status,
            reason: reason.into(),
            payload: payload.into(),
        }
    }

    /// Returns true if this error can be retried.
    ///
    /// Server-side failures (5xx) and connection errors can. Client errors
    /// and every local error cannot.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Transport { status, .. } => *status >= 500,
            SyncError::Connection(_) => true,
            _ => false,
        }
    }

    /// HTTP status, for transport errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            SyncError::Transport { status, .. } => Some(*status),
            _ => None,
        }
    }
}
