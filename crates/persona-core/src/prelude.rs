//! Prelude module - commonly used types for convenient import.
//!
//! Use `use persona_core::prelude::*;` to import all essential types.

pub use crate::{AgentKind, PermissionLevel, ToolCall, ToolResult};
pub use crate::{elapsed_ms, truncate_output};
