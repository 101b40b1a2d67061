//! Persona LLM - Model provider abstraction for the persona agent runtime.
//!
//! This crate provides:
//! - The [`ModelProvider`] trait: `chat` for complete responses and `stream`
//!   for incremental text
//! - Conversation [`Message`]s and the function-calling [`ToolSchema`] shape
//! - [`ModelToolCall`], the raw tool request a model returns, and its parsing
//!   into a [`persona_core::ToolCall`]
//! - [`OpenAiCompatProvider`], a provider for any OpenAI-compatible endpoint
//!
//! # Example
//!
//! ```rust,no_run
//! use persona_llm::{ChatOptions, Message, ModelProvider, OpenAiCompatProvider};
//!
//! # async fn example() -> Result<(), persona_llm::LlmError> {
//! let provider = OpenAiCompatProvider::local("http://localhost:1234/v1/chat/completions", "qwen2.5");
//! let messages = vec![Message::system("You are Mira."), Message::user("Hello!")];
//! let response = provider.chat(&messages, &ChatOptions::default()).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

mod error;
mod openai_compat;
mod provider;
mod types;

pub use error::{LlmError, LlmResult};
pub use openai_compat::OpenAiCompatProvider;
pub use provider::{ChunkStream, ModelProvider};
pub use types::{
    ChatOptions, ChatResponse, FunctionCall, FunctionSchema, Message, ModelToolCall, Role,
    StreamChunk, ToolSchema,
};
