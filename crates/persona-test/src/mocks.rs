//! Mock collaborators for testing.
//!
//! Every mock uses `std::sync::Mutex` internally so builder methods work
//! without a tokio runtime.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use persona_core::AgentKind;
use persona_llm::Role;
use persona_mcp::{McpError, McpResult, RemoteTool, ToolBridge, ToolResponse};
use persona_runtime::{
    MemoryEngine, MemoryMessage, PersonaEngine, RuntimeError, RuntimeResult, Skill,
    SkillProvider, Validation,
};
use persona_sandbox::{ContainerApi, ContainerSpec, IsolationResult, SandboxError};

// ---------------------------------------------------------------------------
// MockPersona
// ---------------------------------------------------------------------------

/// Mock persona engine.
///
/// Validation results are popped from a queue and default to valid.
/// Enforcement prefixes the response with a marker so tests can tell
/// enforced text apart.
#[derive(Debug, Default)]
pub struct MockPersona {
    validations: Mutex<VecDeque<Validation>>,
    validated: Mutex<Vec<String>>,
    enforce_calls: AtomicU32,
    prefix: Option<String>,
}

impl MockPersona {
    /// Marker prepended by [`enforce_persona`](PersonaEngine::enforce_persona).
    pub const DEFAULT_PREFIX: &'static str = "[persona] ";

    /// Create a persona that accepts everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a validation result.
    #[must_use]
    pub fn with_validation(self, validation: Validation) -> Self {
        if let Ok(mut guard) = self.validations.lock() {
            guard.push_back(validation);
        }
        self
    }

    /// Reject the next `n` responses with a regeneration request.
    #[must_use]
    pub fn rejecting(mut self, n: usize) -> Self {
        if let Ok(guard) = self.validations.get_mut() {
            guard.extend(std::iter::repeat_n(Validation::regenerate(["off persona"]), n));
        }
        self
    }

    /// Use a custom enforcement marker.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// How many times enforcement ran.
    #[must_use]
    pub fn enforce_calls(&self) -> u32 {
        self.enforce_calls.load(Ordering::SeqCst)
    }

    /// Every response passed to validation, in order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn validated(&self) -> Vec<String> {
        self.validated.lock().expect("lock poisoned").clone()
    }
}

#[async_trait]
impl PersonaEngine for MockPersona {
    fn system_prompt(&self, agent: AgentKind) -> String {
        format!("You are a test persona on the {} branch.", agent.as_str())
    }

    async fn validate(&self, response: &str) -> RuntimeResult<Validation> {
        self.validated
            .lock()
            .map_err(|_| RuntimeError::Persona("lock poisoned".into()))?
            .push(response.to_string());
        let queued = self
            .validations
            .lock()
            .map_err(|_| RuntimeError::Persona("lock poisoned".into()))?
            .pop_front();
        Ok(queued.unwrap_or_else(Validation::valid))
    }

    async fn enforce_persona(&self, response: &str) -> RuntimeResult<String> {
        self.enforce_calls.fetch_add(1, Ordering::SeqCst);
        let prefix = self.prefix.as_deref().unwrap_or(Self::DEFAULT_PREFIX);
        Ok(format!("{prefix}{response}"))
    }
}

// ---------------------------------------------------------------------------
// MockMemory
// ---------------------------------------------------------------------------

/// In-memory session store.
#[derive(Debug, Default)]
pub struct MockMemory {
    sessions: Mutex<HashMap<String, Vec<MemoryMessage>>>,
    context: Option<String>,
    fail_writes: bool,
}

impl MockMemory {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return `context` from every context build.
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Pre-populate a session.
    #[must_use]
    pub fn with_history(self, session_id: &str, messages: Vec<MemoryMessage>) -> Self {
        if let Ok(mut guard) = self.sessions.lock() {
            guard.insert(session_id.to_string(), messages);
        }
        self
    }

    /// Make every message write fail.
    #[must_use]
    pub fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    /// Stored messages for a session.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn messages(&self, session_id: &str) -> Vec<MemoryMessage> {
        self.sessions
            .lock()
            .expect("lock poisoned")
            .get(session_id)
            .cloned()
            .unwrap_or_default()
    }

    fn lock(&self) -> RuntimeResult<std::sync::MutexGuard<'_, HashMap<String, Vec<MemoryMessage>>>> {
        self.sessions
            .lock()
            .map_err(|_| RuntimeError::Memory("lock poisoned".into()))
    }
}

#[async_trait]
impl MemoryEngine for MockMemory {
    async fn has_session(&self, session_id: &str) -> RuntimeResult<bool> {
        Ok(self.lock()?.contains_key(session_id))
    }

    async fn create_session(&self, session_id: &str, _user_id: &str) -> RuntimeResult<()> {
        self.lock()?.entry(session_id.to_string()).or_default();
        Ok(())
    }

    async fn build_context(&self, _session_id: &str, input: &str) -> RuntimeResult<String> {
        Ok(self
            .context
            .clone()
            .unwrap_or_else(|| format!("relevant to: {input}")))
    }

    async fn get_recent_messages(
        &self,
        session_id: &str,
        limit: usize,
    ) -> RuntimeResult<Vec<MemoryMessage>> {
        let guard = self.lock()?;
        let all = guard.get(session_id).map(Vec::as_slice).unwrap_or_default();
        let skip = all.len().saturating_sub(limit);
        Ok(all.iter().skip(skip).cloned().collect())
    }

    async fn add_session_message(
        &self,
        session_id: &str,
        content: &str,
        role: Role,
    ) -> RuntimeResult<()> {
        if self.fail_writes {
            return Err(RuntimeError::Memory("store is read-only".into()));
        }
        self.lock()?
            .entry(session_id.to_string())
            .or_default()
            .push(MemoryMessage::new(role, content));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MockSkills
// ---------------------------------------------------------------------------

/// Activates a fixed set of skills for every input.
#[derive(Debug, Clone, Default)]
pub struct MockSkills(pub Vec<Skill>);

#[async_trait]
impl SkillProvider for MockSkills {
    async fn activate(&self, _input: &str) -> RuntimeResult<Vec<Skill>> {
        Ok(self.0.clone())
    }
}

// ---------------------------------------------------------------------------
// FakeContainerApi
// ---------------------------------------------------------------------------

/// Scripted container engine that records every lifecycle call.
#[derive(Debug, Default)]
pub struct FakeContainerApi {
    calls: Mutex<Vec<String>>,
    specs: Mutex<Vec<ContainerSpec>>,
    wait_delay: Option<Duration>,
    exit_code: i64,
    logs: Vec<u8>,
    fail_create: bool,
}

impl FakeContainerApi {
    /// An engine whose containers exit 0 with no output.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Containers exit with `code`.
    #[must_use]
    pub fn with_exit_code(mut self, code: i64) -> Self {
        self.exit_code = code;
        self
    }

    /// Raw log bytes returned after exit, multiplexed or plain.
    #[must_use]
    pub fn with_logs(mut self, logs: impl Into<Vec<u8>>) -> Self {
        self.logs = logs.into();
        self
    }

    /// Containers run for `delay` before exiting.
    #[must_use]
    pub fn with_wait_delay(mut self, delay: Duration) -> Self {
        self.wait_delay = Some(delay);
        self
    }

    /// Reject container creation.
    #[must_use]
    pub fn failing_create(mut self) -> Self {
        self.fail_create = true;
        self
    }

    /// Lifecycle calls in order (`create`, `start`, `wait`, ...).
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("lock poisoned").clone()
    }

    /// Every container spec submitted.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn specs(&self) -> Vec<ContainerSpec> {
        self.specs.lock().expect("lock poisoned").clone()
    }

    fn record(&self, call: &str) {
        if let Ok(mut guard) = self.calls.lock() {
            guard.push(call.to_string());
        }
    }
}

#[async_trait]
impl ContainerApi for FakeContainerApi {
    async fn create(&self, spec: &ContainerSpec) -> IsolationResult<String> {
        self.record("create");
        if self.fail_create {
            return Err(SandboxError::Api {
                operation: "create",
                status: 404,
                message: format!("No such image: {}", spec.image),
            });
        }
        if let Ok(mut guard) = self.specs.lock() {
            guard.push(spec.clone());
        }
        Ok(format!("fake-{}", uuid::Uuid::new_v4()))
    }

    async fn start(&self, _id: &str) -> IsolationResult<()> {
        self.record("start");
        Ok(())
    }

    async fn wait(&self, _id: &str) -> IsolationResult<i64> {
        self.record("wait");
        if let Some(delay) = self.wait_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.exit_code)
    }

    async fn kill(&self, _id: &str) -> IsolationResult<()> {
        self.record("kill");
        Ok(())
    }

    async fn logs(&self, _id: &str) -> IsolationResult<Vec<u8>> {
        self.record("logs");
        Ok(self.logs.clone())
    }

    async fn remove(&self, _id: &str) -> IsolationResult<()> {
        self.record("remove");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FakeBridge
// ---------------------------------------------------------------------------

/// In-process tool servers keyed by name.
#[derive(Debug, Default)]
pub struct FakeBridge {
    tools: Mutex<HashMap<String, Vec<RemoteTool>>>,
    responses: Mutex<HashMap<(String, String), ToolResponse>>,
    calls: Mutex<Vec<(String, String, Value)>>,
}

impl FakeBridge {
    /// A bridge with no servers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Advertise `tool` on `server` and answer its calls with `output`.
    #[must_use]
    pub fn with_tool(self, server: &str, tool: &str, output: Value) -> Self {
        self.with_response(server, tool, ToolResponse {
            output,
            is_error: false,
        })
    }

    /// Advertise `tool` on `server` and answer its calls with `response`.
    #[must_use]
    pub fn with_response(self, server: &str, tool: &str, response: ToolResponse) -> Self {
        if let Ok(mut guard) = self.tools.lock() {
            guard.entry(server.to_string()).or_default().push(RemoteTool {
                name: tool.to_string(),
                server: server.to_string(),
                description: Some(format!("{tool} on {server}")),
                input_schema: serde_json::json!({"type": "object"}),
            });
        }
        if let Ok(mut guard) = self.responses.lock() {
            guard.insert((server.to_string(), tool.to_string()), response);
        }
        self
    }

    /// Every call received as `(server, tool, args)`.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn calls(&self) -> Vec<(String, String, Value)> {
        self.calls.lock().expect("lock poisoned").clone()
    }
}

#[async_trait]
impl ToolBridge for FakeBridge {
    async fn call_tool(&self, server: &str, tool: &str, args: Value) -> McpResult<ToolResponse> {
        if let Ok(mut guard) = self.calls.lock() {
            guard.push((server.to_string(), tool.to_string(), args));
        }
        let responses = self
            .responses
            .lock()
            .map_err(|_| McpError::ProtocolError("lock poisoned".into()))?;
        if let Some(response) = responses.get(&(server.to_string(), tool.to_string())) {
            return Ok(response.clone());
        }
        let known_server = responses.keys().any(|(s, _)| s == server);
        if known_server {
            Err(McpError::ToolCallFailed {
                server: server.to_string(),
                tool: tool.to_string(),
                reason: "unknown tool".to_string(),
            })
        } else {
            Err(McpError::ServerNotFound {
                name: server.to_string(),
            })
        }
    }

    async fn list_tools(&self, server: &str) -> McpResult<Vec<RemoteTool>> {
        self.tools
            .lock()
            .map_err(|_| McpError::ProtocolError("lock poisoned".into()))?
            .get(server)
            .cloned()
            .ok_or_else(|| McpError::ServerNotFound {
                name: server.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_persona_queue_then_valid() {
        let persona = MockPersona::new().rejecting(1);
        assert!(persona.validate("a").await.unwrap().should_regenerate);
        assert!(persona.validate("b").await.unwrap().is_valid);
        assert_eq!(persona.validated(), ["a", "b"]);
        assert_eq!(persona.enforce_persona("x").await.unwrap(), "[persona] x");
        assert_eq!(persona.enforce_calls(), 1);
    }

    #[tokio::test]
    async fn test_memory_recent_window() {
        let memory = MockMemory::new();
        for i in 0..5 {
            memory
                .add_session_message("s", &format!("m{i}"), Role::User)
                .await
                .unwrap();
        }
        let recent = memory.get_recent_messages("s", 2).await.unwrap();
        let texts: Vec<_> = recent.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(texts, ["m3", "m4"]);
        assert!(memory.has_session("s").await.unwrap());
        assert!(!memory.has_session("other").await.unwrap());
    }

    #[tokio::test]
    async fn test_memory_failing_writes() {
        let memory = MockMemory::new().failing_writes();
        assert!(memory.add_session_message("s", "x", Role::User).await.is_err());
    }

    #[tokio::test]
    async fn test_bridge_errors() {
        let bridge = FakeBridge::new().with_tool("search", "lookup", json!("hit"));
        let ok = bridge.call_tool("search", "lookup", json!({})).await.unwrap();
        assert_eq!(ok.output, json!("hit"));
        assert!(matches!(
            bridge.call_tool("search", "nope", json!({})).await,
            Err(McpError::ToolCallFailed { .. })
        ));
        assert!(matches!(
            bridge.list_tools("missing").await,
            Err(McpError::ServerNotFound { .. })
        ));
        assert_eq!(bridge.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_container_api_records_lifecycle() {
        let api = FakeContainerApi::new().with_exit_code(3).with_logs("out");
        let spec = ContainerSpec::from_request(
            &persona_sandbox::SandboxConfig::default(),
            &persona_sandbox::ExecRequest::new("echo"),
        );
        let id = api.create(&spec).await.unwrap();
        api.start(&id).await.unwrap();
        assert_eq!(api.wait(&id).await.unwrap(), 3);
        assert_eq!(api.logs(&id).await.unwrap(), b"out");
        api.remove(&id).await.unwrap();
        assert_eq!(api.calls(), ["create", "start", "wait", "logs", "remove"]);
    }
}
