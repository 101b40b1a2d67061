//! Tool definitions and executors.

use async_trait::async_trait;
use persona_core::PermissionLevel;
use persona_llm::ToolSchema;
use persona_mcp::RemoteTool;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::time::Duration;

use crate::error::ToolExecResult;

/// Where a tool comes from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ToolOrigin {
    /// Registered in-process.
    #[default]
    Local,
    /// Hosted on a remote tool server.
    Remote {
        /// Server name.
        server: String,
    },
}

/// A tool the model may call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name.
    pub name: String,
    /// What the tool does, shown to the model.
    pub description: String,
    /// JSON Schema for the arguments.
    pub parameters: Value,
    /// Declared permission tier. The permission checker may override it.
    pub tier: PermissionLevel,
    /// Where the tool runs.
    pub origin: ToolOrigin,
    /// Per-tool time limit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,
}

impl ToolDefinition {
    /// Create a local, `safe`-tier tool with an empty argument schema.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: serde_json::json!({"type": "object", "properties": {}}),
            tier: PermissionLevel::Safe,
            origin: ToolOrigin::Local,
            timeout: None,
        }
    }

    /// Set the argument schema.
    #[must_use]
    pub fn with_parameters(mut self, parameters: Value) -> Self {
        self.parameters = parameters;
        self
    }

    /// Set the declared tier.
    #[must_use]
    pub fn with_tier(mut self, tier: PermissionLevel) -> Self {
        self.tier = tier;
        self
    }

    /// Mark as hosted on `server`.
    #[must_use]
    pub fn remote(mut self, server: impl Into<String>) -> Self {
        self.origin = ToolOrigin::Remote {
            server: server.into(),
        };
        self
    }

    /// Set a time limit.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build from a remote server's advertisement.
    #[must_use]
    pub fn from_remote(tool: &RemoteTool, tier: PermissionLevel) -> Self {
        Self {
            name: tool.name.clone(),
            description: tool.description.clone().unwrap_or_default(),
            parameters: tool.input_schema.clone(),
            tier,
            origin: ToolOrigin::Remote {
                server: tool.server.clone(),
            },
            timeout: None,
        }
    }

    /// The function-calling schema offered to the model.
    #[must_use]
    pub fn schema(&self) -> ToolSchema {
        ToolSchema::function(&self.name, &self.description, self.parameters.clone())
    }
}

/// Runs a local tool.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Execute with the call's arguments.
    async fn execute(&self, args: Value) -> ToolExecResult<Value>;
}

/// Adapts an async closure into a [`ToolExecutor`].
pub struct FnExecutor<F>(F);

impl<F> FnExecutor<F> {
    /// Wrap `f`.
    pub fn new<Fut>(f: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync,
        Fut: Future<Output = ToolExecResult<Value>> + Send,
    {
        Self(f)
    }
}

#[async_trait]
impl<F, Fut> ToolExecutor for FnExecutor<F>
where
    F: Fn(Value) -> Fut + Send + Sync,
    Fut: Future<Output = ToolExecResult<Value>> + Send,
{
    async fn execute(&self, args: Value) -> ToolExecResult<Value> {
        (self.0)(args).await
    }
}
