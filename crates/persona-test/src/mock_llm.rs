//! Mock model provider for testing.
//!
//! Provides [`MockModelProvider`], a deterministic, queue-based implementation
//! of [`ModelProvider`] that replays pre-configured turns. This enables
//! integration tests for the turn workflow, tool-call flows and streaming
//! consumers without hitting a real endpoint.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use futures::stream;
use serde_json::Value;
use uuid::Uuid;

use persona_llm::{
    ChatOptions, ChatResponse, ChunkStream, LlmError, LlmResult, Message, ModelProvider,
    ModelToolCall, StreamChunk,
};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A single scripted turn that the mock provider will replay.
#[derive(Debug, Clone)]
pub enum MockTurn {
    /// A text response.
    Text(
        /// The assistant text.
        String,
    ),
    /// One or more tool calls.
    ToolCalls(
        /// The tool calls to emit.
        Vec<MockToolCall>,
    ),
    /// Produce an error.
    Error(
        /// The error message.
        String,
    ),
}

impl MockTurn {
    /// Create a text turn.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Create a tool-calls turn.
    #[must_use]
    pub fn tool_calls(calls: Vec<MockToolCall>) -> Self {
        Self::ToolCalls(calls)
    }

    /// Create a turn with a single tool call.
    #[must_use]
    pub fn tool_call(id: impl Into<String>, name: impl Into<String>, args: Value) -> Self {
        Self::ToolCalls(vec![MockToolCall::with_id(id, name, args)])
    }

    /// Create an error turn.
    #[must_use]
    pub fn error(msg: impl Into<String>) -> Self {
        Self::Error(msg.into())
    }
}

/// A single scripted tool call for [`MockTurn::ToolCalls`].
#[derive(Debug, Clone)]
pub struct MockToolCall {
    /// Unique call ID.
    pub id: String,
    /// Tool name (e.g. `"web_search"`).
    pub name: String,
    /// Raw argument text as the model would send it.
    pub arguments: String,
}

impl MockToolCall {
    /// Create a new mock tool call with an auto-generated ID.
    #[must_use]
    pub fn new(name: impl Into<String>, args: Value) -> Self {
        Self::with_id(format!("mock-call-{}", Uuid::new_v4()), name, args)
    }

    /// Create a new mock tool call with an explicit ID.
    #[must_use]
    pub fn with_id(id: impl Into<String>, name: impl Into<String>, args: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: args.to_string(),
        }
    }

    /// Create a call whose argument text is passed through unparsed.
    #[must_use]
    pub fn raw(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }

    fn to_model(&self) -> ModelToolCall {
        ModelToolCall::new(&self.id, &self.name, &self.arguments)
    }
}

// ---------------------------------------------------------------------------
// MockModelProvider
// ---------------------------------------------------------------------------

/// A deterministic, queue-based [`ModelProvider`] for tests.
///
/// Turns are popped from the front of the queue on each call to
/// [`chat`](ModelProvider::chat) or [`stream`](ModelProvider::stream). If the
/// queue is exhausted, an error is returned. The messages and tool names
/// passed by the caller are captured for inspection.
pub struct MockModelProvider {
    turns: Mutex<VecDeque<MockTurn>>,
    call_count: Mutex<usize>,
    captured_messages: Mutex<Vec<Vec<Message>>>,
    offered_tools: Mutex<Vec<Vec<String>>>,
}

impl MockModelProvider {
    /// Create a new mock provider preloaded with the given turns.
    #[must_use]
    pub fn new(turns: Vec<MockTurn>) -> Self {
        Self {
            turns: Mutex::new(VecDeque::from(turns)),
            call_count: Mutex::new(0),
            captured_messages: Mutex::new(Vec::new()),
            offered_tools: Mutex::new(Vec::new()),
        }
    }

    /// Queue another turn.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn push(&self, turn: MockTurn) {
        self.turns.lock().expect("lock poisoned").push_back(turn);
    }

    /// Return the number of times `chat` or `stream` has been called.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn call_count(&self) -> usize {
        *self.call_count.lock().expect("lock poisoned")
    }

    /// Number of turns still queued.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.turns.lock().expect("lock poisoned").len()
    }

    /// Return a snapshot of all captured message slices, one per call.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn captured_messages(&self) -> Vec<Vec<Message>> {
        self.captured_messages
            .lock()
            .expect("lock poisoned")
            .clone()
    }

    /// Tool names offered on each call.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn offered_tools(&self) -> Vec<Vec<String>> {
        self.offered_tools.lock().expect("lock poisoned").clone()
    }

    /// Record a call: bump counter, capture the request, pop next turn.
    fn next_turn(&self, messages: &[Message], options: &ChatOptions) -> LlmResult<MockTurn> {
        {
            let mut count = self.call_count.lock().expect("lock poisoned");
            *count = count.saturating_add(1);
        }
        self.captured_messages
            .lock()
            .expect("lock poisoned")
            .push(messages.to_vec());
        self.offered_tools
            .lock()
            .expect("lock poisoned")
            .push(options.tools.iter().map(|t| t.name().to_string()).collect());

        let mut turns = self.turns.lock().expect("lock poisoned");
        turns.pop_front().ok_or_else(|| {
            LlmError::ApiRequestFailed("MockModelProvider: no more turns queued".to_string())
        })
    }
}

#[async_trait]
#[allow(clippy::unnecessary_literal_bound)]
impl ModelProvider for MockModelProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    async fn chat(&self, messages: &[Message], options: &ChatOptions) -> LlmResult<ChatResponse> {
        match self.next_turn(messages, options)? {
            MockTurn::Text(text) => Ok(ChatResponse::text(text)),
            MockTurn::ToolCalls(calls) => Ok(ChatResponse::with_tool_calls(
                calls.iter().map(MockToolCall::to_model).collect(),
            )),
            MockTurn::Error(msg) => Err(LlmError::ApiRequestFailed(msg)),
        }
    }

    async fn stream(&self, messages: &[Message], options: &ChatOptions) -> LlmResult<ChunkStream> {
        let chunks: Vec<LlmResult<StreamChunk>> = match self.next_turn(messages, options)? {
            MockTurn::Text(text) => text
                .split_inclusive(' ')
                .map(|word| Ok(StreamChunk::delta(word)))
                .chain(std::iter::once(Ok(StreamChunk::done())))
                .collect(),
            MockTurn::ToolCalls(_) => vec![Err(LlmError::StreamingError(
                "MockModelProvider: tool calls cannot be streamed".to_string(),
            ))],
            MockTurn::Error(msg) => vec![Err(LlmError::StreamingError(msg))],
        };
        Ok(Box::pin(stream::iter(chunks)))
    }
}
