//! Tool dispatch errors.
//!
//! These never leave [`ToolRegistry::execute`](crate::ToolRegistry::execute):
//! dispatch turns every one of them into a failed
//! [`ToolResult`](persona_core::ToolResult).

use persona_mcp::McpError;
use persona_sandbox::SandboxError;
use thiserror::Error;

/// Tool execution errors.
#[derive(Debug, Error)]
pub enum ToolError {
    /// No sandbox, local executor or remote server can run this tool.
    #[error("no executor for tool '{name}'")]
    NotFound {
        /// Tool name.
        name: String,
    },

    /// The tool sits in the `deny` tier and is never dispatched.
    #[error("tool '{name}' is denied by policy")]
    Denied {
        /// Tool name.
        name: String,
    },

    /// Invalid arguments.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// Execution failed.
    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    /// The tool exceeded its time limit.
    #[error("timed out after {0} ms")]
    Timeout(u64),

    /// The sandboxed command was killed on timeout.
    #[error("sandboxed command timed out")]
    SandboxTimedOut,

    /// The sandboxed command exited non-zero.
    #[error("sandboxed command exited with code {code}: {stderr}")]
    SandboxExit {
        /// Exit code.
        code: i64,
        /// Captured standard error.
        stderr: String,
    },

    /// The isolation backend failed.
    #[error("sandbox error: {0}")]
    Sandbox(#[from] SandboxError),

    /// A remote tool server could not be reached.
    #[error("remote tool error: {0}")]
    Remote(#[from] McpError),

    /// The remote server flagged the call as failed.
    #[error("{0}")]
    RemoteFailed(String),
}

/// Result type for tool dispatch.
pub type ToolExecResult<T> = Result<T, ToolError>;
