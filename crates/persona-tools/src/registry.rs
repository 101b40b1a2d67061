//! Tool registry and dispatch.
//!
//! Once a call has cleared permission, [`ToolRegistry::execute_with_level`]
//! refuses the `deny` tier outright and otherwise picks exactly one execution
//! path:
//!
//! 1. `confirm`-tier with sandboxing enabled and a sandbox configured: run in
//!    the sandbox, parse stdout as JSON (raw text otherwise).
//! 2. A local executor registered under the name: call it.
//! 3. A remote origin: call through the bridge.
//! 4. Otherwise: "no executor for tool".
//!
//! Every error on every path becomes a failed [`ToolResult`].

use persona_core::{PermissionLevel, ToolCall, ToolResult, elapsed_ms};
use persona_llm::ToolSchema;
use persona_mcp::ToolBridge;
use persona_sandbox::{ExecRequest, SandboxExecutor};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::definition::{ToolDefinition, ToolExecutor, ToolOrigin};
use crate::error::{ToolError, ToolExecResult};

/// The execution path a call would take.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolRoute {
    /// Inside the sandbox.
    Sandbox,
    /// A local executor.
    Local,
    /// A remote tool server.
    Remote {
        /// Server name.
        server: String,
    },
}

struct Entry {
    definition: ToolDefinition,
    executor: Option<Arc<dyn ToolExecutor>>,
}

/// Holds tool definitions and dispatches calls.
///
/// Safe to share across sessions: lookups take a read lock, registration a
/// write lock.
pub struct ToolRegistry {
    tools: RwLock<HashMap<String, Entry>>,
    sandbox: Option<Arc<SandboxExecutor>>,
    sandbox_enabled: AtomicBool,
    bridge: Option<Arc<dyn ToolBridge>>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    /// Create an empty registry with no sandbox and no bridge.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tools: RwLock::new(HashMap::new()),
            sandbox: None,
            sandbox_enabled: AtomicBool::new(false),
            bridge: None,
        }
    }

    /// Attach a sandbox and enable sandboxing.
    #[must_use]
    pub fn with_sandbox(mut self, sandbox: Arc<SandboxExecutor>) -> Self {
        self.sandbox = Some(sandbox);
        self.sandbox_enabled = AtomicBool::new(true);
        self
    }

    /// Attach a remote tool bridge.
    #[must_use]
    pub fn with_bridge(mut self, bridge: Arc<dyn ToolBridge>) -> Self {
        self.bridge = Some(bridge);
        self
    }

    /// Turn sandboxing on or off at runtime.
    pub fn set_sandbox_enabled(&self, enabled: bool) {
        self.sandbox_enabled.store(enabled, Ordering::Release);
    }

    /// Whether `confirm`-tier calls go to the sandbox.
    #[must_use]
    pub fn sandbox_enabled(&self) -> bool {
        self.sandbox.is_some() && self.sandbox_enabled.load(Ordering::Acquire)
    }

    /// Register a tool with a local executor, replacing any previous entry.
    pub async fn register(&self, definition: ToolDefinition, executor: impl ToolExecutor + 'static) {
        self.insert(definition, Some(Arc::new(executor))).await;
    }

    /// Register a tool without a local executor (sandbox or remote only).
    pub async fn register_definition(&self, definition: ToolDefinition) {
        self.insert(definition, None).await;
    }

    async fn insert(&self, definition: ToolDefinition, executor: Option<Arc<dyn ToolExecutor>>) {
        debug!(
            tool = %definition.name,
            tier = %definition.tier,
            has_executor = executor.is_some(),
            "tool registered"
        );
        self.tools.write().await.insert(
            definition.name.clone(),
            Entry {
                definition,
                executor,
            },
        );
    }

    /// Register tools hosted on `server`.
    ///
    /// Definitions are rewritten to point at `server`. Returns how many were
    /// registered.
    pub async fn register_remote(&self, server: &str, definitions: Vec<ToolDefinition>) -> usize {
        let mut tools = self.tools.write().await;
        let count = definitions.len();
        for definition in definitions {
            let definition = definition.remote(server);
            tools.insert(
                definition.name.clone(),
                Entry {
                    definition,
                    executor: None,
                },
            );
        }
        info!(server, count, "remote tools registered");
        count
    }

    /// Ask the bridge what `server` offers and register all of it at `tier`.
    ///
    /// # Errors
    ///
    /// Returns an error if no bridge is attached or the server cannot be
    /// listed.
    pub async fn discover_remote(&self, server: &str, tier: PermissionLevel) -> ToolExecResult<usize> {
        let bridge = self.bridge.as_ref().ok_or_else(|| {
            ToolError::ExecutionFailed("no remote tool bridge configured".to_string())
        })?;
        let remote = bridge.list_tools(server).await?;
        let definitions = remote
            .iter()
            .map(|t| ToolDefinition::from_remote(t, tier))
            .collect();
        Ok(self.register_remote(server, definitions).await)
    }

    /// Remove a tool. Returns its definition if it was registered.
    pub async fn unregister(&self, name: &str) -> Option<ToolDefinition> {
        self.tools.write().await.remove(name).map(|e| e.definition)
    }

    /// Get a tool definition.
    pub async fn get(&self, name: &str) -> Option<ToolDefinition> {
        self.tools.read().await.get(name).map(|e| e.definition.clone())
    }

    /// Whether a tool is registered.
    pub async fn contains(&self, name: &str) -> bool {
        self.tools.read().await.contains_key(name)
    }

    /// Registered names, sorted.
    pub async fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// All definitions, sorted by name.
    pub async fn definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> = self
            .tools
            .read()
            .await
            .values()
            .map(|e| e.definition.clone())
            .collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    /// Function-calling schemas for every tool, sorted by name.
    pub async fn schemas(&self) -> Vec<ToolSchema> {
        self.definitions()
            .await
            .iter()
            .map(ToolDefinition::schema)
            .collect()
    }

    /// Which path a call at `level` would take.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::Denied`] for the `deny` tier and
    /// [`ToolError::NotFound`] if no path exists.
    pub async fn resolve_route(&self, name: &str, level: PermissionLevel) -> ToolExecResult<ToolRoute> {
        if level == PermissionLevel::Deny {
            return Err(ToolError::Denied {
                name: name.to_string(),
            });
        }
        let tools = self.tools.read().await;
        let entry = tools.get(name);

        if level == PermissionLevel::Confirm && self.sandbox_enabled() {
            return Ok(ToolRoute::Sandbox);
        }
        if entry.is_some_and(|e| e.executor.is_some()) {
            return Ok(ToolRoute::Local);
        }
        if let Some(ToolOrigin::Remote { server }) = entry.map(|e| &e.definition.origin) {
            return Ok(ToolRoute::Remote {
                server: server.clone(),
            });
        }
        Err(ToolError::NotFound {
            name: name.to_string(),
        })
    }

    /// Execute at the tool's declared tier.
    ///
    /// Unregistered tools fail with [`ToolError::NotFound`].
    pub async fn execute(&self, call: &ToolCall) -> ToolResult {
        let Some(definition) = self.get(&call.name).await else {
            let e = ToolError::NotFound {
                name: call.name.clone(),
            };
            warn!(tool = %call.name, error = %e, "tool dispatch failed");
            return ToolResult::failure(call, e.to_string(), 0);
        };
        self.execute_with_level(call, definition.tier).await
    }

    /// Execute a call that has cleared permission at `level`.
    ///
    /// Never fails: errors become a failed [`ToolResult`] with latency. A
    /// `deny`-tier call is refused before any executor is looked up.
    pub async fn execute_with_level(&self, call: &ToolCall, level: PermissionLevel) -> ToolResult {
        let start = Instant::now();

        let route = match self.resolve_route(&call.name, level).await {
            Ok(route) => route,
            Err(e) => {
                warn!(tool = %call.name, error = %e, "tool dispatch failed");
                return ToolResult::failure(call, e.to_string(), elapsed_ms(start));
            },
        };
        let timeout = self.get(&call.name).await.and_then(|d| d.timeout);

        let outcome = match &route {
            ToolRoute::Sandbox => self.run_sandboxed(call, timeout).await,
            ToolRoute::Local => self.run_local(call, timeout).await,
            ToolRoute::Remote { server } => self.run_remote(server, call, timeout).await,
        };
        let latency_ms = elapsed_ms(start);
        let sandboxed = route == ToolRoute::Sandbox;

        let result = match outcome {
            Ok(output) => ToolResult::success(call, output, latency_ms),
            Err(e) if sandboxed => {
                ToolResult::failure(call, format!("{e} (after {latency_ms} ms)"), latency_ms)
            },
            Err(e) => ToolResult::failure(call, e.to_string(), latency_ms),
        };
        let result = if sandboxed { result.sandboxed() } else { result };

        if result.success {
            info!(tool = %call.name, route = ?route, latency_ms, "tool executed");
        } else {
            warn!(
                tool = %call.name,
                route = ?route,
                latency_ms,
                error = result.error.as_deref().unwrap_or_default(),
                "tool failed"
            );
        }
        result
    }

    async fn run_sandboxed(&self, call: &ToolCall, timeout: Option<Duration>) -> ToolExecResult<Value> {
        let sandbox = self.sandbox.as_ref().ok_or_else(|| ToolError::NotFound {
            name: call.name.clone(),
        })?;

        let mut request = ExecRequest::new(sandbox_command(call)).with_env("PERSONA_TOOL", &call.name);
        if let Some(timeout) = timeout {
            request = request.with_timeout(timeout);
        }

        let result = sandbox.execute(&request).await?;
        if result.timed_out {
            return Err(ToolError::SandboxTimedOut);
        }
        if result.exit_code != 0 {
            return Err(ToolError::SandboxExit {
                code: result.exit_code,
                stderr: result.stderr.trim().to_string(),
            });
        }

        let stdout = result.stdout.trim();
        Ok(serde_json::from_str(stdout).unwrap_or_else(|_| Value::String(stdout.to_string())))
    }

    async fn run_local(&self, call: &ToolCall, timeout: Option<Duration>) -> ToolExecResult<Value> {
        let executor = self
            .tools
            .read()
            .await
            .get(&call.name)
            .and_then(|e| e.executor.clone())
            .ok_or_else(|| ToolError::NotFound {
                name: call.name.clone(),
            })?;

        with_timeout(timeout, executor.execute(call.arguments.clone())).await
    }

    async fn run_remote(
        &self,
        server: &str,
        call: &ToolCall,
        timeout: Option<Duration>,
    ) -> ToolExecResult<Value> {
        let bridge = self.bridge.as_ref().ok_or_else(|| ToolError::NotFound {
            name: call.name.clone(),
        })?;

        let response = with_timeout(timeout, async {
            bridge
                .call_tool(server, &call.name, call.arguments.clone())
                .await
                .map_err(ToolError::from)
        })
        .await?;

        if response.is_error {
            return Err(ToolError::RemoteFailed(response.error_message()));
        }
        Ok(response.output)
    }
}

async fn with_timeout<T, F>(timeout: Option<Duration>, fut: F) -> ToolExecResult<T>
where
    F: std::future::Future<Output = ToolExecResult<T>>,
{
    match timeout {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| ToolError::Timeout(u64::try_from(limit.as_millis()).unwrap_or(u64::MAX)))?,
        None => fut.await,
    }
}

/// The shell command a sandboxed call runs.
///
/// An explicit `command` argument is used verbatim; otherwise the tool name is
/// invoked with its arguments as one single-quoted JSON word.
fn sandbox_command(call: &ToolCall) -> String {
    if let Some(command) = call.arg_str("command") {
        return command.to_string();
    }
    let json = call.arguments.to_string().replace('\'', r"'\''");
    format!("{} '{json}'", call.name)
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("sandbox_enabled", &self.sandbox_enabled())
            .field("has_bridge", &self.bridge.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::FnExecutor;
    use async_trait::async_trait;
    use persona_mcp::{McpResult, RemoteTool, ToolResponse, normalize_tool_response};
    use persona_sandbox::{
        ContainerSpec, IsolationBackend, IsolationResult, SandboxConfig, SandboxResult,
        TIMEOUT_EXIT_CODE,
    };
    use serde_json::json;
    use std::sync::Mutex;

    struct CannedBackend {
        result: SandboxResult,
        commands: Mutex<Vec<String>>,
    }

    impl CannedBackend {
        fn new(result: SandboxResult) -> Arc<Self> {
            Arc::new(Self {
                result,
                commands: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl IsolationBackend for CannedBackend {
        fn name(&self) -> &str {
            "canned"
        }

        async fn run(&self, spec: &ContainerSpec, _timeout: Duration) -> IsolationResult<SandboxResult> {
            self.commands.lock().unwrap().push(spec.command.clone());
            Ok(self.result.clone())
        }
    }

    struct CannedBridge {
        raw: Value,
    }

    #[async_trait]
    impl ToolBridge for CannedBridge {
        async fn call_tool(&self, _server: &str, _tool: &str, _args: Value) -> McpResult<ToolResponse> {
            Ok(normalize_tool_response(&self.raw))
        }

        async fn list_tools(&self, server: &str) -> McpResult<Vec<RemoteTool>> {
            Ok(vec![RemoteTool {
                name: "read_file".into(),
                server: server.into(),
                description: Some("Read a file".into()),
                input_schema: json!({"type": "object"}),
            }])
        }
    }

    fn sandboxed_registry(backend: Arc<CannedBackend>) -> ToolRegistry {
        let sandbox = SandboxExecutor::new(SandboxConfig::default(), backend);
        ToolRegistry::new().with_sandbox(Arc::new(sandbox))
    }

    async fn register_echo(registry: &ToolRegistry) {
        registry
            .register(
                ToolDefinition::new("web_search", "Search"),
                FnExecutor::new(|args: Value| async move { Ok(json!({"results": [args["q"]]})) }),
            )
            .await;
    }

    // -----------------------------------------------------------------------
    // Registration
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_register_and_lookup() {
        let registry = ToolRegistry::new();
        register_echo(&registry).await;
        registry
            .register_definition(ToolDefinition::new("shell", "Run").with_tier(PermissionLevel::Confirm))
            .await;

        assert!(registry.contains("web_search").await);
        assert_eq!(registry.names().await, ["shell", "web_search"]);
        assert_eq!(registry.schemas().await[1].name(), "web_search");
        assert_eq!(
            registry.get("shell").await.unwrap().tier,
            PermissionLevel::Confirm
        );

        assert!(registry.unregister("shell").await.is_some());
        assert!(registry.unregister("shell").await.is_none());
    }

    #[tokio::test]
    async fn test_discover_remote() {
        let registry = ToolRegistry::new().with_bridge(Arc::new(CannedBridge { raw: json!({}) }));
        let count = registry
            .discover_remote("fs", PermissionLevel::Safe)
            .await
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(
            registry.resolve_route("read_file", PermissionLevel::Safe).await.unwrap(),
            ToolRoute::Remote { server: "fs".into() }
        );
    }

    #[tokio::test]
    async fn test_discover_remote_without_bridge() {
        assert!(
            ToolRegistry::new()
                .discover_remote("fs", PermissionLevel::Safe)
                .await
                .is_err()
        );
    }

    // -----------------------------------------------------------------------
    // Routing
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_resolve_route_order() {
        let registry = sandboxed_registry(CannedBackend::new(SandboxResult::default()));
        register_echo(&registry).await;

        assert_eq!(
            registry.resolve_route("web_search", PermissionLevel::Confirm).await.unwrap(),
            ToolRoute::Sandbox
        );
        assert_eq!(
            registry.resolve_route("web_search", PermissionLevel::Safe).await.unwrap(),
            ToolRoute::Local
        );

        registry.set_sandbox_enabled(false);
        assert_eq!(
            registry.resolve_route("web_search", PermissionLevel::Confirm).await.unwrap(),
            ToolRoute::Local
        );
        assert!(matches!(
            registry.resolve_route("ghost", PermissionLevel::Safe).await,
            Err(ToolError::NotFound { .. })
        ));
    }

    // -----------------------------------------------------------------------
    // Dispatch
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_local_dispatch() {
        let registry = ToolRegistry::new();
        register_echo(&registry).await;

        let call = ToolCall::new("web_search").with_arguments(json!({"q": "rust"}));
        let result = registry.execute(&call).await;
        assert!(result.success);
        assert!(!result.sandboxed);
        assert_eq!(result.call_id, call.id);
        assert_eq!(result.output, Some(json!({"results": ["rust"]})));
    }

    #[tokio::test]
    async fn test_local_executor_error_becomes_failure() {
        let registry = ToolRegistry::new();
        registry
            .register(
                ToolDefinition::new("flaky", "Always fails"),
                FnExecutor::new(|_args: Value| async move {
                    Err(ToolError::ExecutionFailed("disk full".into()))
                }),
            )
            .await;

        let result = registry.execute(&ToolCall::new("flaky")).await;
        assert!(!result.success);
        assert!(result.output.is_none());
        assert!(result.error.unwrap().contains("disk full"));
    }

    #[tokio::test]
    async fn test_local_timeout() {
        let registry = ToolRegistry::new();
        registry
            .register(
                ToolDefinition::new("slow", "Sleeps").with_timeout(Duration::from_millis(10)),
                FnExecutor::new(|_args: Value| async move {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok(Value::Null)
                }),
            )
            .await;

        let result = registry.execute(&ToolCall::new("slow")).await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn test_deny_tier_is_never_dispatched() {
        let runs = Arc::new(std::sync::atomic::AtomicU32::new(0));
        let counter = Arc::clone(&runs);
        let registry = sandboxed_registry(CannedBackend::new(SandboxResult::default()));
        registry
            .register(
                ToolDefinition::new("system_modify", "Change settings")
                    .with_tier(PermissionLevel::Deny),
                FnExecutor::new(move |_args: Value| {
                    let counter = Arc::clone(&counter);
                    async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                        Ok(json!("changed"))
                    }
                }),
            )
            .await;

        let call = ToolCall::new("system_modify");
        for result in [
            registry.execute(&call).await,
            registry.execute_with_level(&call, PermissionLevel::Deny).await,
        ] {
            assert!(!result.success);
            assert!(result.output.is_none());
            assert!(!result.sandboxed);
            assert_eq!(
                result.error.as_deref(),
                Some("tool 'system_modify' is denied by policy")
            );
        }
        assert_eq!(runs.load(Ordering::SeqCst), 0);
        assert!(matches!(
            registry.resolve_route("system_modify", PermissionLevel::Deny).await,
            Err(ToolError::Denied { .. })
        ));
    }

    #[tokio::test]
    async fn test_unknown_tool_fails_with_no_executor() {
        let result = ToolRegistry::new().execute(&ToolCall::new("ghost")).await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("no executor for tool 'ghost'"));
    }

    #[tokio::test]
    async fn test_sandbox_dispatch_parses_json_stdout() {
        let backend = CannedBackend::new(SandboxResult {
            stdout: "{\"files\": 3}\n".into(),
            ..SandboxResult::default()
        });
        let registry = sandboxed_registry(backend.clone());

        let call = ToolCall::new("shell").with_arguments(json!({"command": "ls | wc -l"}));
        let result = registry.execute_with_level(&call, PermissionLevel::Confirm).await;
        assert!(result.success);
        assert!(result.sandboxed);
        assert_eq!(result.output, Some(json!({"files": 3})));
        assert_eq!(backend.commands.lock().unwrap()[0], "ls | wc -l");
    }

    #[tokio::test]
    async fn test_sandbox_dispatch_raw_text_fallback() {
        let backend = CannedBackend::new(SandboxResult {
            stdout: "total 0\n".into(),
            ..SandboxResult::default()
        });
        let registry = sandboxed_registry(backend.clone());

        let call = ToolCall::new("convert").with_arguments(json!({"text": "it's"}));
        let result = registry.execute_with_level(&call, PermissionLevel::Confirm).await;
        assert_eq!(result.output, Some(json!("total 0")));
        assert_eq!(
            backend.commands.lock().unwrap()[0],
            r#"convert '{"text":"it'\''s"}'"#
        );
    }

    #[tokio::test]
    async fn test_sandbox_timeout_reports_latency() {
        let registry = sandboxed_registry(CannedBackend::new(SandboxResult {
            exit_code: TIMEOUT_EXIT_CODE,
            timed_out: true,
            ..SandboxResult::default()
        }));

        let call = ToolCall::new("shell").with_arguments(json!({"command": "sleep 100"}));
        let result = registry.execute_with_level(&call, PermissionLevel::Confirm).await;
        assert!(!result.success);
        assert!(result.sandboxed);
        let error = result.error.unwrap();
        assert!(error.contains("timed out"));
        assert!(error.contains(&format!("{} ms", result.latency_ms)));
    }

    #[tokio::test]
    async fn test_sandbox_nonzero_exit() {
        let registry = sandboxed_registry(CannedBackend::new(SandboxResult {
            exit_code: 2,
            stderr: "ls: cannot access\n".into(),
            ..SandboxResult::default()
        }));

        let call = ToolCall::new("shell").with_arguments(json!({"command": "ls /nope"}));
        let result = registry.execute_with_level(&call, PermissionLevel::Confirm).await;
        assert!(!result.success);
        let error = result.error.unwrap();
        assert!(error.contains("code 2"));
        assert!(error.contains("cannot access"));
    }

    #[tokio::test]
    async fn test_remote_dispatch_both_shapes() {
        for raw in [
            json!({"content": [{"type": "text", "text": "hello"}]}),
            json!({"result": "hello"}),
        ] {
            let registry = ToolRegistry::new().with_bridge(Arc::new(CannedBridge { raw }));
            registry
                .register_remote("fs", vec![ToolDefinition::new("read_file", "Read")])
                .await;

            let result = registry.execute(&ToolCall::new("read_file")).await;
            assert!(result.success);
            assert_eq!(result.output, Some(json!("hello")));
        }
    }

    struct StalledBridge;

    #[async_trait]
    impl ToolBridge for StalledBridge {
        async fn call_tool(&self, _server: &str, _tool: &str, _args: Value) -> McpResult<ToolResponse> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(normalize_tool_response(&json!({"result": "late"})))
        }

        async fn list_tools(&self, _server: &str) -> McpResult<Vec<RemoteTool>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_remote_timeout() {
        let registry = ToolRegistry::new().with_bridge(Arc::new(StalledBridge));
        registry
            .register_remote(
                "fs",
                vec![ToolDefinition::new("read_file", "Read").with_timeout(Duration::from_millis(10))],
            )
            .await;

        let result = registry.execute(&ToolCall::new("read_file")).await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("timed out after 10 ms"));
    }

    #[tokio::test]
    async fn test_remote_error_flag_becomes_failure() {
        let registry = ToolRegistry::new().with_bridge(Arc::new(CannedBridge {
            raw: json!({"content": [{"type": "text", "text": "no such file"}], "isError": true}),
        }));
        registry
            .register_remote("fs", vec![ToolDefinition::new("read_file", "Read")])
            .await;

        let result = registry.execute(&ToolCall::new("read_file")).await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("no such file"));
    }
}
