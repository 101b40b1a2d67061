//! Tool-call, tool-result and permission types.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::utils::truncate_output;

/// Permission tier of a tool.
///
/// `Deny` is the default for anything not explicitly listed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionLevel {
    /// Executed automatically.
    Safe,
    /// Executed only after a human confirms.
    Confirm,
    /// Never executed.
    #[default]
    Deny,
}

impl PermissionLevel {
    /// Lowercase name of the tier.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Safe => "safe",
            Self::Confirm => "confirm",
            Self::Deny => "deny",
        }
    }
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown permission tier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown permission level '{0}' (expected safe, confirm or deny)")]
pub struct ParseLevelError(pub String);

impl FromStr for PermissionLevel {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "safe" => Ok(Self::Safe),
            "confirm" => Ok(Self::Confirm),
            "deny" => Ok(Self::Deny),
            _ => Err(ParseLevelError(s.to_string())),
        }
    }
}

/// Which generation branch handles a turn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    /// Free-form, in-character chat.
    #[default]
    Conversation,
    /// Goal-directed work that is expected to use tools.
    Task,
}

impl AgentKind {
    /// Lowercase name of the branch.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Conversation => "conversation",
            Self::Task => "task",
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Call identifier, echoed back in the matching [`ToolResult`].
    pub id: String,
    /// Tool name.
    pub name: String,
    /// Argument map.
    #[serde(default)]
    pub arguments: Value,
}

impl ToolCall {
    /// Create a tool call with a generated ID and empty arguments.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: format!("call_{}", Uuid::new_v4().simple()),
            name: name.into(),
            arguments: Value::Object(serde_json::Map::new()),
        }
    }

    /// Create a tool call with an explicit ID.
    pub fn with_id(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::new(name)
        }
    }

    /// Set the arguments.
    #[must_use]
    pub fn with_arguments(mut self, arguments: Value) -> Self {
        self.arguments = arguments;
        self
    }

    /// Look up a string argument.
    #[must_use]
    pub fn arg_str(&self, key: &str) -> Option<&str> {
        self.arguments.get(key).and_then(Value::as_str)
    }
}

/// Outcome of a single tool call.
///
/// Failures are data: a denied, timed-out or crashed tool produces a
/// `ToolResult` with `success == false`, never an error value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// ID of the call this result answers.
    pub call_id: String,
    /// Tool name.
    pub tool_name: String,
    /// Whether the tool ran and reported success.
    pub success: bool,
    /// Output on success.
    pub output: Option<Value>,
    /// Error description on failure.
    pub error: Option<String>,
    /// Wall-clock time spent, in milliseconds.
    pub latency_ms: u64,
    /// Whether the tool ran inside the sandbox.
    #[serde(default)]
    pub sandboxed: bool,
    /// Set when the call is waiting for human approval.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_required: Option<bool>,
    /// Human-readable approval prompt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_message: Option<String>,
}

impl ToolResult {
    /// A successful result.
    #[must_use]
    pub fn success(call: &ToolCall, output: Value, latency_ms: u64) -> Self {
        Self {
            call_id: call.id.clone(),
            tool_name: call.name.clone(),
            success: true,
            output: Some(output),
            error: None,
            latency_ms,
            sandboxed: false,
            approval_required: None,
            approval_message: None,
        }
    }

    /// A failed result.
    #[must_use]
    pub fn failure(call: &ToolCall, error: impl Into<String>, latency_ms: u64) -> Self {
        Self {
            call_id: call.id.clone(),
            tool_name: call.name.clone(),
            success: false,
            output: None,
            error: Some(error.into()),
            latency_ms,
            sandboxed: false,
            approval_required: None,
            approval_message: None,
        }
    }

    /// Mark the result as produced inside the sandbox.
    #[must_use]
    pub fn sandboxed(mut self) -> Self {
        self.sandboxed = true;
        self
    }

    /// Attach an approval prompt.
    #[must_use]
    pub fn with_approval(mut self, message: impl Into<String>) -> Self {
        self.approval_required = Some(true);
        self.approval_message = Some(message.into());
        self
    }

    /// Render the result as tool-role text for the next generation round.
    #[must_use]
    pub fn to_model_content(&self) -> String {
        if self.success {
            let text = match &self.output {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Null) | None => String::new(),
                Some(other) => other.to_string(),
            };
            truncate_output(text)
        } else {
            format!(
                "Error: {}",
                self.error.as_deref().unwrap_or("tool execution failed")
            )
        }
    }
}
