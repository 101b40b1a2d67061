//! OpenAI-compatible model provider.
//!
//! Works with:
//! - `OpenAI` API
//! - LM Studio, vLLM, Ollama and other local servers exposing
//!   `/v1/chat/completions`

use async_stream::try_stream;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, error};

use crate::error::{LlmError, LlmResult};
use crate::provider::{ChunkStream, ModelProvider};
use crate::types::{ChatOptions, ChatResponse, Message, ModelToolCall, Role, StreamChunk};

const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_MAX_TOKENS: u32 = 2048;
const DEFAULT_TEMPERATURE: f32 = 0.7;

/// OpenAI-compatible model provider.
pub struct OpenAiCompatProvider {
    client: Client,
    model: String,
    base_url: String,
    api_key: Option<String>,
    max_tokens: u32,
    temperature: f32,
}

impl OpenAiCompatProvider {
    /// Create a provider for the hosted `OpenAI` API.
    #[must_use]
    pub fn openai(api_key: &str, model: &str) -> Self {
        Self::custom(DEFAULT_OPENAI_URL, Some(api_key), model)
    }

    /// Create a provider for a local endpoint that needs no API key.
    #[must_use]
    pub fn local(base_url: &str, model: &str) -> Self {
        Self::custom(base_url, None, model)
    }

    /// Create a custom provider with full configuration.
    #[must_use]
    pub fn custom(base_url: &str, api_key: Option<&str>, model: &str) -> Self {
        Self {
            client: Client::new(),
            model: model.to_string(),
            base_url: base_url.to_string(),
            api_key: api_key.map(ToString::to_string),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    /// Set max tokens.
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Build the request body.
    fn build_request(&self, messages: &[Message], options: &ChatOptions, stream: bool) -> Value {
        let openai_messages: Vec<Value> = messages.iter().map(convert_message).collect();

        let mut request = serde_json::json!({
            "model": self.model,
            "messages": openai_messages,
            "max_tokens": options.max_tokens.unwrap_or(self.max_tokens),
            "temperature": options.temperature.unwrap_or(self.temperature),
            "stream": stream
        });

        if !options.tools.is_empty() {
            let tools: Vec<Value> = options
                .tools
                .iter()
                .map(|t| {
                    // Strict endpoints reject a schema without `properties`.
                    let mut schema = serde_json::to_value(t).unwrap_or(Value::Null);
                    if let Some(params) = schema
                        .get_mut("function")
                        .and_then(|f| f.get_mut("parameters"))
                        .and_then(Value::as_object_mut)
                    {
                        params
                            .entry("properties")
                            .or_insert_with(|| serde_json::json!({}));
                    }
                    schema
                })
                .collect();
            request["tools"] = Value::Array(tools);
        }

        request
    }

    /// Send a request, mapping auth and HTTP failures.
    async fn send(&self, body: &Value) -> LlmResult<reqwest::Response> {
        if self.api_key.as_ref().is_none_or(String::is_empty) && !is_local_url(&self.base_url) {
            return Err(LlmError::ApiKeyNotConfigured {
                provider: "openai-compat".to_string(),
            });
        }

        let mut request = self
            .client
            .post(&self.base_url)
            .header("Content-Type", "application/json");

        if let Some(ref api_key) = self.api_key {
            let mut auth_value = reqwest::header::HeaderValue::try_from(format!(
                "Bearer {api_key}"
            ))
            .map_err(|e| LlmError::ApiRequestFailed(format!("Invalid API key characters: {e}")))?;
            auth_value.set_sensitive(true);
            request = request.header("Authorization", auth_value);
        }

        let response = request
            .json(body)
            .send()
            .await
            .map_err(|e| LlmError::ApiRequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %body, "model endpoint returned an error");
            return Err(LlmError::InvalidResponse(format!(
                "HTTP {}: {body}",
                status.as_u16()
            )));
        }

        Ok(response)
    }
}

fn convert_message(msg: &Message) -> Value {
    match msg.role {
        Role::Assistant if !msg.tool_calls.is_empty() => {
            let content = if msg.content.is_empty() {
                Value::Null
            } else {
                Value::String(msg.content.clone())
            };
            serde_json::json!({
                "role": "assistant",
                "content": content,
                "tool_calls": msg.tool_calls
            })
        },
        Role::Tool => serde_json::json!({
            "role": "tool",
            "tool_call_id": msg.tool_call_id,
            "content": msg.content
        }),
        role => serde_json::json!({
            "role": role.as_str(),
            "content": msg.content
        }),
    }
}

/// Parse one SSE `data:` payload into a chunk. `None` for keep-alives and
/// events that carry no text.
fn parse_stream_data(data: &str) -> Option<StreamChunk> {
    if data.trim() == "[DONE]" {
        return Some(StreamChunk::done());
    }
    let event: OpenAiStreamEvent = serde_json::from_str(data).ok()?;
    let choice = event.choices.into_iter().next()?;
    if choice.finish_reason.is_some() {
        return Some(StreamChunk::done());
    }
    choice
        .delta
        .content
        .filter(|c| !c.is_empty())
        .map(StreamChunk::delta)
}

#[async_trait]
impl ModelProvider for OpenAiCompatProvider {
    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "openai-compat"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn chat(&self, messages: &[Message], options: &ChatOptions) -> LlmResult<ChatResponse> {
        let body = self.build_request(messages, options, false);

        debug!(
            model = %self.model,
            base_url = %self.base_url,
            tools = options.tools.len(),
            "Making OpenAI-compatible chat request"
        );

        let response: OpenAiResponse = self
            .send(&body)
            .await?
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::InvalidResponse("No choices in response".to_string()))?;

        Ok(ChatResponse {
            content: choice.message.content.unwrap_or_default(),
            tool_calls: choice.message.tool_calls.unwrap_or_default(),
        })
    }

    async fn stream(&self, messages: &[Message], options: &ChatOptions) -> LlmResult<ChunkStream> {
        let body = self.build_request(messages, options, true);

        debug!(
            model = %self.model,
            base_url = %self.base_url,
            "Starting OpenAI-compatible stream"
        );

        let response = self.send(&body).await?;

        let stream = try_stream! {
            use futures::StreamExt;

            let mut bytes = response.bytes_stream();
            let mut buffer = String::new();

            while let Some(chunk) = bytes.next().await {
                let chunk = chunk.map_err(|e| LlmError::StreamingError(e.to_string()))?;
                buffer.push_str(&String::from_utf8_lossy(&chunk));

                while let Some(event_end) = buffer.find("\n\n") {
                    let event_data = buffer[..event_end].to_string();
                    buffer = buffer[event_end.saturating_add(2)..].to_string();

                    for line in event_data.lines() {
                        let Some(data) = line.strip_prefix("data: ") else {
                            continue;
                        };
                        if let Some(parsed) = parse_stream_data(data) {
                            let done = parsed.done;
                            yield parsed;
                            if done {
                                return;
                            }
                        }
                    }
                }
            }

            yield StreamChunk::done();
        };

        Ok(Box::pin(stream))
    }
}

impl std::fmt::Debug for OpenAiCompatProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatProvider")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("has_api_key", &self.api_key.is_some())
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .finish_non_exhaustive()
    }
}

// OpenAI API response types

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiMessage {
    content: Option<String>,
    tool_calls: Option<Vec<ModelToolCall>>,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamEvent {
    choices: Vec<OpenAiStreamChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamChoice {
    delta: OpenAiDelta,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiDelta {
    content: Option<String>,
}

fn is_local_url(url: &str) -> bool {
    let lower = url.to_lowercase();
    lower.contains("localhost") || lower.contains("127.0.0.1") || lower.contains("[::1]")
}
