//! Common imports for the remote tool bridge.
//!
//! ```
//! use persona_mcp::prelude::*;
//! ```

pub use crate::{
    McpBridge, McpError, McpResult, RemoteTool, ServerConfig, ToolBridge, ToolResponse,
    normalize_tool_response,
};
