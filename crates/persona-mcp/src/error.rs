//! MCP bridge error types.

use thiserror::Error;

/// Errors that can occur while reaching a remote tool server.
#[derive(Debug, Error)]
pub enum McpError {
    /// No server with this name is configured.
    #[error("MCP server not found: {name}")]
    ServerNotFound {
        /// The server name that was not found.
        name: String,
    },

    /// The server process could not be spawned.
    #[error("Failed to start MCP server {name}: {reason}")]
    ServerStartFailed {
        /// The server name.
        name: String,
        /// Reason for failure.
        reason: String,
    },

    /// The MCP handshake failed.
    #[error("MCP initialization failed: {0}")]
    InitializationFailed(String),

    /// Tool call failed at the protocol level.
    #[error("Tool call failed: {server}:{tool} - {reason}")]
    ToolCallFailed {
        /// Server name.
        server: String,
        /// Tool name.
        tool: String,
        /// Reason for failure.
        reason: String,
    },

    /// MCP protocol error from rmcp.
    #[error("MCP protocol error: {0}")]
    ProtocolError(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<rmcp::ServiceError> for McpError {
    fn from(err: rmcp::ServiceError) -> Self {
        Self::ProtocolError(err.to_string())
    }
}

impl From<serde_json::Error> for McpError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

/// Result type for MCP operations.
pub type McpResult<T> = Result<T, McpError>;
