//! Error types for sandboxed execution.

use thiserror::Error;

/// Errors raised while talking to the isolation backend.
///
/// A command that times out or exits non-zero is *not* an error; it is
/// reported in [`SandboxResult`](crate::SandboxResult).
#[derive(Debug, Error)]
pub enum SandboxError {
    /// The container engine could not be reached.
    #[error("container engine connection failed: {0}")]
    Connection(String),

    /// The container engine rejected a request.
    #[error("container engine returned {status} during {operation}: {message}")]
    Api {
        /// Which lifecycle step failed (`create`, `start`, ...).
        operation: &'static str,
        /// HTTP status code.
        status: u16,
        /// Engine error message.
        message: String,
    },

    /// The engine answered with something unexpected.
    #[error("invalid container engine response: {0}")]
    InvalidResponse(String),

    /// A volume spec could not be parsed.
    #[error("invalid volume spec '{spec}': {reason}")]
    InvalidVolume {
        /// The rejected spec.
        spec: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Sandbox configuration is unusable.
    #[error("invalid sandbox configuration: {0}")]
    InvalidConfig(String),
}

impl From<reqwest::Error> for SandboxError {
    fn from(err: reqwest::Error) -> Self {
        Self::Connection(err.to_string())
    }
}

/// Result type for isolation backend operations.
pub type IsolationResult<T> = Result<T, SandboxError>;
