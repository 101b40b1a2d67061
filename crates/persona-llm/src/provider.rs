//! Model provider trait.
//!
//! Defines the interface that all model providers must implement.

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

use crate::error::LlmResult;
use crate::types::{ChatOptions, ChatResponse, Message, StreamChunk};

/// Type alias for boxed chunk streams.
pub type ChunkStream = Pin<Box<dyn Stream<Item = LlmResult<StreamChunk>> + Send>>;

/// Model provider trait.
///
/// Implementors give access to a chat model. The system prompt travels as the
/// first [`Message`] with [`Role::System`](crate::Role::System).
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Get the provider name.
    fn name(&self) -> &str;

    /// Get the model being used.
    fn model(&self) -> &str;

    /// Complete without streaming.
    ///
    /// The response carries either text, tool calls, or both.
    async fn chat(&self, messages: &[Message], options: &ChatOptions) -> LlmResult<ChatResponse>;

    /// Stream a completion as text deltas.
    ///
    /// The final chunk has `done == true`.
    async fn stream(&self, messages: &[Message], options: &ChatOptions) -> LlmResult<ChunkStream>;
}

/// Blanket implementation so `Box<dyn ModelProvider>` can stand in wherever a
/// concrete provider is expected.
#[async_trait]
impl ModelProvider for Box<dyn ModelProvider> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn model(&self) -> &str {
        (**self).model()
    }

    async fn chat(&self, messages: &[Message], options: &ChatOptions) -> LlmResult<ChatResponse> {
        (**self).chat(messages, options).await
    }

    async fn stream(&self, messages: &[Message], options: &ChatOptions) -> LlmResult<ChunkStream> {
        (**self).stream(messages, options).await
    }
}
