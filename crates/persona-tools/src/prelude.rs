//! Common imports for tool registration and dispatch.
//!
//! ```
//! use persona_tools::prelude::*;
//! ```

pub use crate::{
    FnExecutor, ToolDefinition, ToolError, ToolExecResult, ToolExecutor, ToolOrigin, ToolRegistry,
    ToolRoute,
};
