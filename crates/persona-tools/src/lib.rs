//! Persona Tools - Tool registry and dispatch.
//!
//! [`ToolRegistry`] is the single point of dispatch from a permitted
//! [`ToolCall`](persona_core::ToolCall) to the mechanism that runs it: the
//! sandbox, a local [`ToolExecutor`], or a remote tool server reached through a
//! [`ToolBridge`](persona_mcp::ToolBridge). Tool failures are data: dispatch
//! always returns a [`ToolResult`](persona_core::ToolResult).

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

mod definition;
mod error;
mod registry;

pub use definition::{FnExecutor, ToolDefinition, ToolExecutor, ToolOrigin};
pub use error::{ToolError, ToolExecResult};
pub use registry::{ToolRegistry, ToolRoute};
