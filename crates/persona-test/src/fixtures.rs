//! Test fixtures for common types.

use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use uuid::Uuid;

use persona_approval::{PermissionChecker, PermissionConfig};
use persona_core::{PermissionLevel, ToolCall};
use persona_runtime::Skill;
use persona_tools::{FnExecutor, ToolDefinition, ToolRegistry};

/// Create a unique session ID.
#[must_use]
pub fn test_session_id() -> String {
    format!("session-{}", Uuid::new_v4())
}

/// Permission tiers used across the scenario tests:
/// `web_search` safe, `shell` confirm, `system_modify` deny.
#[must_use]
pub fn test_permission_config() -> PermissionConfig {
    PermissionConfig {
        safe: vec!["web_search".into()],
        confirm: vec!["shell".into()],
        deny: vec!["system_modify".into()],
        role_allowed_tools: None,
    }
}

/// A checker over [`test_permission_config`].
#[must_use]
pub fn test_permissions() -> PermissionChecker {
    PermissionChecker::new(&test_permission_config())
}

/// Create a tool call with explicit ID and arguments.
#[must_use]
pub fn test_tool_call(id: &str, name: &str, args: Value) -> ToolCall {
    ToolCall::with_id(id, name).with_arguments(args)
}

/// A skill that narrows the offered tools to `tools`.
#[must_use]
pub fn test_skill(name: &str, tools: &[&str]) -> Skill {
    Skill {
        name: name.to_string(),
        instructions: format!("Use the {name} skill."),
        tools: tools.iter().map(ToString::to_string).collect(),
    }
}

/// Counts executions of the tools registered by [`register_test_tools`].
#[derive(Debug, Clone, Default)]
pub struct ToolRuns {
    /// `web_search` executions.
    pub web_search: Arc<AtomicU32>,
    /// `shell` executions run locally.
    pub shell: Arc<AtomicU32>,
    /// `system_modify` executions.
    pub system_modify: Arc<AtomicU32>,
}

impl ToolRuns {
    /// `web_search` executions so far.
    #[must_use]
    pub fn web_search_runs(&self) -> u32 {
        self.web_search.load(Ordering::SeqCst)
    }

    /// Local `shell` executions so far.
    #[must_use]
    pub fn shell_runs(&self) -> u32 {
        self.shell.load(Ordering::SeqCst)
    }

    /// `system_modify` executions so far.
    #[must_use]
    pub fn system_modify_runs(&self) -> u32 {
        self.system_modify.load(Ordering::SeqCst)
    }
}

/// Register `web_search`, `shell` and `system_modify` with in-process
/// executors that echo their arguments.
pub async fn register_test_tools(registry: &ToolRegistry) -> ToolRuns {
    let runs = ToolRuns::default();

    let counter = Arc::clone(&runs.web_search);
    registry
        .register(
            ToolDefinition::new("web_search", "Search the web")
                .with_tier(PermissionLevel::Safe)
                .with_parameters(json!({
                    "type": "object",
                    "properties": {"query": {"type": "string"}},
                    "required": ["query"]
                })),
            FnExecutor::new(move |args: Value| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(json!({"query": args["query"], "results": ["first hit", "second hit"]}))
                }
            }),
        )
        .await;

    let counter = Arc::clone(&runs.shell);
    registry
        .register(
            ToolDefinition::new("shell", "Run a shell command")
                .with_tier(PermissionLevel::Confirm)
                .with_parameters(json!({
                    "type": "object",
                    "properties": {"command": {"type": "string"}},
                    "required": ["command"]
                })),
            FnExecutor::new(move |args: Value| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(json!({"command": args["command"], "stdout": "total 0"}))
                }
            }),
        )
        .await;

    let counter = Arc::clone(&runs.system_modify);
    registry
        .register(
            ToolDefinition::new("system_modify", "Change system settings")
                .with_tier(PermissionLevel::Deny),
            FnExecutor::new(move |_args: Value| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(json!("modified"))
                }
            }),
        )
        .await;

    runs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permissions_fixture() {
        let permissions = test_permissions();
        assert_eq!(permissions.level("web_search"), PermissionLevel::Safe);
        assert_eq!(permissions.level("shell"), PermissionLevel::Confirm);
        assert!(!permissions.check("system_modify").allowed);
    }

    #[tokio::test]
    async fn test_registered_tools() {
        let registry = ToolRegistry::new();
        let runs = register_test_tools(&registry).await;
        let mut names = registry.names().await;
        names.sort();
        assert_eq!(names, ["shell", "system_modify", "web_search"]);

        let result = registry
            .execute(&test_tool_call("c1", "web_search", json!({"query": "x"})))
            .await;
        assert!(result.success);
        assert_eq!(runs.web_search_runs(), 1);
    }

    #[test]
    fn test_session_ids_are_unique() {
        assert_ne!(test_session_id(), test_session_id());
    }
}
