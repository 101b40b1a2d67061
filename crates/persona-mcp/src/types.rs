//! Server configuration, remote tool descriptions and response normalization.

use rmcp::model as rmcp_model;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;

/// How to launch a stdio tool server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Executable to run.
    pub command: String,
    /// Command-line arguments.
    pub args: Vec<String>,
    /// Extra environment variables.
    pub env: HashMap<String, String>,
    /// Working directory.
    pub cwd: Option<PathBuf>,
}

impl ServerConfig {
    /// Create a config for `command`.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Self::default()
        }
    }

    /// Set the arguments.
    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Set an environment variable.
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }
}

/// A tool advertised by a remote server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteTool {
    /// Tool name.
    pub name: String,
    /// Server this tool belongs to.
    pub server: String,
    /// Human-readable description.
    pub description: Option<String>,
    /// JSON Schema for input parameters.
    pub input_schema: Value,
}

impl RemoteTool {
    /// Create from an rmcp `Tool` and server name.
    #[must_use]
    pub fn from_rmcp(tool: &rmcp_model::Tool, server: &str) -> Self {
        Self {
            name: tool.name.to_string(),
            server: server.to_string(),
            description: tool.description.as_deref().map(String::from),
            input_schema: serde_json::to_value(&*tool.input_schema)
                .unwrap_or_else(|_| serde_json::json!({"type": "object"})),
        }
    }
}

/// A tool server response reduced to one output value and an error flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResponse {
    /// The tool's output.
    pub output: Value,
    /// Whether the server flagged the call as failed.
    pub is_error: bool,
}

impl ToolResponse {
    /// Human-readable error text for a failed call.
    #[must_use]
    pub fn error_message(&self) -> String {
        match &self.output {
            Value::String(s) if !s.is_empty() => s.clone(),
            Value::Null => "remote tool reported an error".to_string(),
            other => other.to_string(),
        }
    }
}

/// Normalize either response shape a tool server may send.
///
/// - Content-array shape: `{"content": [{"type": "text", "text": ..}, ..],
///   "structuredContent"?: .., "isError"?: bool}`. Structured content wins;
///   otherwise text items are joined with newlines; a content array without
///   text is kept as-is.
/// - Flat shape: `{"toolResult": ..}` or `{"result": .., "isError"?: bool}`.
///
/// Anything else is passed through as the output.
#[must_use]
pub fn normalize_tool_response(raw: &Value) -> ToolResponse {
    let is_error = ["isError", "is_error"]
        .iter()
        .find_map(|key| raw.get(*key).and_then(Value::as_bool))
        .unwrap_or(false);

    let output = if let Some(content) = raw.get("content").and_then(Value::as_array) {
        match raw.get("structuredContent") {
            Some(structured) if !structured.is_null() => structured.clone(),
            _ => {
                let texts: Vec<&str> = content
                    .iter()
                    .filter(|item| item.get("type").and_then(Value::as_str).unwrap_or("text") == "text")
                    .filter_map(|item| item.get("text").and_then(Value::as_str))
                    .collect();
                if texts.is_empty() {
                    Value::Array(content.clone())
                } else {
                    Value::String(texts.join("\n"))
                }
            },
        }
    } else if let Some(result) = raw.get("toolResult") {
        result.clone()
    } else if let Some(result) = raw.get("result") {
        result.clone()
    } else {
        raw.clone()
    };

    ToolResponse { output, is_error }
}
