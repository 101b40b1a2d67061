//! Prelude module - commonly used types for convenient import.
//!
//! Use `use persona_llm::prelude::*;` to import all essential types.

// Errors
pub use crate::{LlmError, LlmResult};

// Provider
pub use crate::{ChunkStream, ModelProvider};

// Messages and tools
pub use crate::{ChatOptions, ChatResponse, Message, ModelToolCall, Role, StreamChunk, ToolSchema};
