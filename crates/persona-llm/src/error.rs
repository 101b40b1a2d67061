//! Model-provider error types.

use thiserror::Error;

/// Errors that can occur talking to a model provider.
#[derive(Debug, Error)]
pub enum LlmError {
    /// API key not configured.
    #[error("API key not configured for {provider}")]
    ApiKeyNotConfigured {
        /// Provider name.
        provider: String,
    },

    /// API request failed.
    #[error("API request failed: {0}")]
    ApiRequestFailed(String),

    /// Invalid response from API.
    #[error("Invalid API response: {0}")]
    InvalidResponse(String),

    /// Streaming error.
    #[error("Streaming error: {0}")]
    StreamingError(String),

    /// A tool call carried arguments that are not a JSON object.
    #[error("Invalid arguments for tool '{name}': {reason}")]
    InvalidToolArguments {
        /// Tool name.
        name: String,
        /// Why the arguments were rejected.
        reason: String,
    },

    /// Serialization error.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// HTTP error.
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for model-provider operations.
pub type LlmResult<T> = Result<T, LlmError>;
