//! Model types for messages, tools, and streaming.

use persona_core::ToolCall;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::error::{LlmError, LlmResult};

/// Message role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions.
    System,
    /// The human.
    User,
    /// The model.
    Assistant,
    /// A tool result.
    Tool,
}

impl Role {
    /// Lowercase name of the role.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A message in the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Message role.
    pub role: Role,
    /// Text content (may be empty for an assistant message that only calls tools).
    #[serde(default)]
    pub content: String,
    /// Tool calls requested by an assistant message.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ModelToolCall>,
    /// For tool messages: the call this result answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    fn with_role(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(Role::System, content)
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, content)
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(Role::Assistant, content)
    }

    /// Create an assistant message that requests tools.
    pub fn assistant_with_tools(content: impl Into<String>, tool_calls: &[ToolCall]) -> Self {
        Self {
            tool_calls: tool_calls.iter().map(ModelToolCall::from_tool_call).collect(),
            ..Self::with_role(Role::Assistant, content)
        }
    }

    /// Create a tool result message.
    pub fn tool(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(call_id.into()),
            ..Self::with_role(Role::Tool, content)
        }
    }
}

/// The function part of a model tool call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    /// Tool name.
    pub name: String,
    /// Arguments as a JSON-encoded string.
    #[serde(default)]
    pub arguments: String,
}

/// A tool call as a model returns it: `{id, type, function: {name, arguments}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelToolCall {
    /// Call identifier.
    pub id: String,
    /// Call type, always `"function"`.
    #[serde(rename = "type", default = "default_function_kind")]
    pub kind: String,
    /// Function name and arguments.
    pub function: FunctionCall,
}

fn default_function_kind() -> String {
    "function".to_string()
}

impl ModelToolCall {
    /// Create a model tool call from raw parts.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            kind: default_function_kind(),
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }

    /// Encode a parsed [`ToolCall`] back into model form.
    #[must_use]
    pub fn from_tool_call(call: &ToolCall) -> Self {
        Self::new(&call.id, &call.name, call.arguments.to_string())
    }

    /// Parse into a [`ToolCall`].
    ///
    /// Empty or `null` arguments become an empty object.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::InvalidToolArguments`] if the arguments are not
    /// valid JSON or not a JSON object.
    pub fn parse(&self) -> LlmResult<ToolCall> {
        let raw = self.function.arguments.trim();
        let arguments = if raw.is_empty() {
            Value::Object(serde_json::Map::new())
        } else {
            let value: Value =
                serde_json::from_str(raw).map_err(|e| LlmError::InvalidToolArguments {
                    name: self.function.name.clone(),
                    reason: e.to_string(),
                })?;
            match value {
                Value::Object(_) => value,
                Value::Null => Value::Object(serde_json::Map::new()),
                other => {
                    return Err(LlmError::InvalidToolArguments {
                        name: self.function.name.clone(),
                        reason: format!("expected a JSON object, got {other}"),
                    });
                },
            }
        };

        Ok(ToolCall::with_id(&self.id, &self.function.name).with_arguments(arguments))
    }
}

/// The function-calling tool schema offered to a model.
///
/// Serializes as `{"type": "function", "function": {name, description, parameters}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    /// Schema type, always `"function"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Function description.
    pub function: FunctionSchema,
}

/// Name, description and JSON Schema of a callable function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionSchema {
    /// Tool name.
    pub name: String,
    /// What the tool does.
    pub description: String,
    /// JSON Schema for the arguments.
    pub parameters: Value,
}

impl ToolSchema {
    /// Create a function schema.
    pub fn function(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Value,
    ) -> Self {
        Self {
            kind: default_function_kind(),
            function: FunctionSchema {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }

    /// Tool name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.function.name
    }
}

/// Per-call generation options.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatOptions {
    /// Tools the model may call. Empty means no tool calling.
    pub tools: Vec<ToolSchema>,
    /// Sampling temperature override.
    pub temperature: Option<f32>,
    /// Output token limit override.
    pub max_tokens: Option<u32>,
}

impl ChatOptions {
    /// Offer tools to the model.
    #[must_use]
    pub fn with_tools(mut self, tools: Vec<ToolSchema>) -> Self {
        self.tools = tools;
        self
    }

    /// Override the temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Override the output token limit.
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// A complete model response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Text content.
    #[serde(default)]
    pub content: String,
    /// Requested tool calls, if any.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ModelToolCall>,
}

impl ChatResponse {
    /// A text-only response.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    /// A response that requests tools.
    #[must_use]
    pub fn with_tool_calls(tool_calls: Vec<ModelToolCall>) -> Self {
        Self {
            content: String::new(),
            tool_calls,
        }
    }

    /// Whether the model asked for any tools.
    #[must_use]
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// One piece of a streamed response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamChunk {
    /// Newly generated text.
    pub delta: String,
    /// Whether the stream is complete.
    pub done: bool,
}

impl StreamChunk {
    /// A text delta.
    pub fn delta(text: impl Into<String>) -> Self {
        Self {
            delta: text.into(),
            done: false,
        }
    }

    /// The terminating chunk.
    #[must_use]
    pub fn done() -> Self {
        Self {
            delta: String::new(),
            done: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_model_tool_call_parse() {
        let raw = ModelToolCall::new("call_1", "shell", r#"{"command":"ls -la"}"#);
        let call = raw.parse().unwrap();
        assert_eq!(call.id, "call_1");
        assert_eq!(call.name, "shell");
        assert_eq!(call.arguments, json!({"command": "ls -la"}));
    }

    #[test]
    fn test_model_tool_call_parse_empty_arguments() {
        let call = ModelToolCall::new("c", "clock", "  ").parse().unwrap();
        assert_eq!(call.arguments, json!({}));

        let call = ModelToolCall::new("c", "clock", "null").parse().unwrap();
        assert_eq!(call.arguments, json!({}));
    }

    #[test]
    fn test_model_tool_call_parse_rejects_garbage() {
        let err = ModelToolCall::new("c", "shell", "{not json").parse().unwrap_err();
        assert!(matches!(err, LlmError::InvalidToolArguments { ref name, .. } if name == "shell"));

        let err = ModelToolCall::new("c", "shell", "[1,2]").parse().unwrap_err();
        assert!(err.to_string().contains("expected a JSON object"));
    }

    #[test]
    fn test_model_tool_call_wire_shape() {
        let value: ModelToolCall = serde_json::from_value(json!({
            "id": "call_9",
            "function": {"name": "web_search", "arguments": "{\"q\":\"rust\"}"}
        }))
        .unwrap();
        assert_eq!(value.kind, "function");
        assert_eq!(value.parse().unwrap().arguments, json!({"q": "rust"}));
    }

    #[test]
    fn test_tool_schema_serializes_function_shape() {
        let schema = ToolSchema::function(
            "web_search",
            "Search the web",
            json!({"type": "object", "properties": {"q": {"type": "string"}}}),
        );
        let value = serde_json::to_value(&schema).unwrap();
        assert_eq!(value["type"], "function");
        assert_eq!(value["function"]["name"], "web_search");
        assert_eq!(value["function"]["parameters"]["type"], "object");
        assert_eq!(schema.name(), "web_search");
    }

    #[test]
    fn test_message_constructors() {
        let call = ToolCall::with_id("c1", "shell").with_arguments(json!({"command": "pwd"}));
        let msg = Message::assistant_with_tools("", std::slice::from_ref(&call));
        assert_eq!(msg.role, Role::Assistant);
        assert_eq!(msg.tool_calls.len(), 1);
        assert_eq!(msg.tool_calls[0].parse().unwrap(), call);

        let tool = Message::tool("c1", "/home");
        assert_eq!(tool.role, Role::Tool);
        assert_eq!(tool.tool_call_id.as_deref(), Some("c1"));

        let json = serde_json::to_value(Message::user("hi")).unwrap();
        assert!(json.get("tool_calls").is_none());
        assert_eq!(json["role"], "user");
    }

    #[test]
    fn test_chat_response_helpers() {
        assert!(!ChatResponse::text("hello").has_tool_calls());
        let response =
            ChatResponse::with_tool_calls(vec![ModelToolCall::new("c", "web_search", "{}")]);
        assert!(response.has_tool_calls());
        assert!(response.content.is_empty());
    }
}
