//! Persona MCP - Bridge to tools hosted on external MCP servers.
//!
//! [`McpBridge`] keeps one client connection per configured stdio server and
//! connects lazily on first use. Tool servers answer in one of two shapes
//! (a flat `result` or a `content` array); [`normalize_tool_response`] reduces
//! both to a [`ToolResponse`].

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

mod bridge;
mod error;
mod types;

pub use bridge::{McpBridge, ToolBridge};
pub use error::{McpError, McpResult};
pub use types::{RemoteTool, ServerConfig, ToolResponse, normalize_tool_response};
