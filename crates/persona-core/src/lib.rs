//! Persona Core - Foundation types for the persona agent runtime.
//!
//! This crate provides:
//! - Tool call and tool result types exchanged between the generator,
//!   the permission layer and the tool registry
//! - The three-tier [`PermissionLevel`]
//! - The [`AgentKind`] branches the workflow routes between
//! - Small utilities for timing and output truncation

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

pub mod types;
pub mod utils;

pub use types::{AgentKind, ParseLevelError, PermissionLevel, ToolCall, ToolResult};
pub use utils::{MAX_OUTPUT_CHARS, elapsed_ms, truncate_output};
