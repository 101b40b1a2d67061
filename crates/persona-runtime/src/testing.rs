//! In-crate fakes for unit tests.

use async_trait::async_trait;
use futures::stream;
use persona_approval::{ApprovalConfig, ApprovalManager, PermissionChecker, PermissionConfig};
use persona_core::AgentKind;
use persona_llm::{
    ChatOptions, ChatResponse, ChunkStream, LlmError, LlmResult, Message, ModelProvider, Role, StreamChunk,
};
use persona_tools::ToolRegistry;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use crate::collaborators::{KeywordClassifier, MemoryEngine, MemoryMessage, NoSkills, PersonaEngine, SkillProvider};
use crate::error::RuntimeResult;
use crate::orchestrator::{Orchestrator, OrchestratorConfig};
use crate::state::{Skill, Validation};
use crate::workflow::{Workflow, WorkflowContext};

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

/// Replays canned responses and records every request.
#[derive(Default)]
pub(crate) struct ScriptedModel {
    script: Mutex<VecDeque<ChatResponse>>,
    requests: Mutex<Vec<Vec<Message>>>,
    offered: Mutex<Vec<Vec<String>>>,
    failing: bool,
}

impl ScriptedModel {
    pub(crate) fn new(responses: Vec<ChatResponse>) -> Self {
        Self {
            script: Mutex::new(responses.into()),
            ..Self::default()
        }
    }

    /// A model whose every call fails.
    pub(crate) fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub(crate) fn requests(&self) -> Vec<Vec<Message>> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn offered_tools(&self) -> Vec<Vec<String>> {
        self.offered.lock().unwrap().clone()
    }

    pub(crate) fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn next(&self, messages: &[Message], options: &ChatOptions) -> ChatResponse {
        self.requests.lock().unwrap().push(messages.to_vec());
        self.offered.lock().unwrap().push(
            options
                .tools
                .iter()
                .map(|t| t.name().to_string())
                .collect(),
        );
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| ChatResponse::text("ok"))
    }
}

#[async_trait]
impl ModelProvider for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-1"
    }

    async fn chat(&self, messages: &[Message], options: &ChatOptions) -> LlmResult<ChatResponse> {
        let response = self.next(messages, options);
        if self.failing {
            return Err(LlmError::ApiRequestFailed("model unavailable".into()));
        }
        Ok(response)
    }

    async fn stream(&self, messages: &[Message], options: &ChatOptions) -> LlmResult<ChunkStream> {
        let text = self.next(messages, options).content;
        if self.failing {
            return Err(LlmError::ApiRequestFailed("model unavailable".into()));
        }
        let mut chunks: Vec<LlmResult<StreamChunk>> = text
            .split_inclusive(' ')
            .map(|piece| Ok(StreamChunk::delta(piece)))
            .collect();
        chunks.push(Ok(StreamChunk::done()));
        Ok(Box::pin(stream::iter(chunks)))
    }
}

// ---------------------------------------------------------------------------
// Persona
// ---------------------------------------------------------------------------

#[derive(Default)]
pub(crate) struct FakePersona {
    failures_left: AtomicU32,
    enforce_calls: AtomicU32,
}

impl FakePersona {
    pub(crate) fn fail_validation_times(&self, n: u32) {
        self.failures_left.store(n, Ordering::SeqCst);
    }

    pub(crate) fn enforce_calls(&self) -> u32 {
        self.enforce_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PersonaEngine for FakePersona {
    fn system_prompt(&self, agent: AgentKind) -> String {
        format!("persona prompt ({})", agent.as_str())
    }

    async fn validate(&self, _response: &str) -> RuntimeResult<Validation> {
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        Ok(if failing {
            Validation::regenerate(["off persona"])
        } else {
            Validation::valid()
        })
    }

    async fn enforce_persona(&self, response: &str) -> RuntimeResult<String> {
        self.enforce_calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("[persona] {response}"))
    }
}

// ---------------------------------------------------------------------------
// Memory
// ---------------------------------------------------------------------------

#[derive(Default)]
pub(crate) struct FakeMemory {
    sessions: Mutex<HashMap<String, Vec<MemoryMessage>>>,
}

impl FakeMemory {
    pub(crate) fn seed(&self, session_id: &str, messages: Vec<MemoryMessage>) {
        self.sessions
            .lock()
            .unwrap()
            .insert(session_id.to_string(), messages);
    }

    pub(crate) fn has(&self, session_id: &str) -> bool {
        self.sessions.lock().unwrap().contains_key(session_id)
    }

    pub(crate) fn messages(&self, session_id: &str) -> Vec<MemoryMessage> {
        self.sessions
            .lock()
            .unwrap()
            .get(session_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl MemoryEngine for FakeMemory {
    async fn has_session(&self, session_id: &str) -> RuntimeResult<bool> {
        Ok(self.has(session_id))
    }

    async fn create_session(&self, session_id: &str, _user_id: &str) -> RuntimeResult<()> {
        self.sessions
            .lock()
            .unwrap()
            .entry(session_id.to_string())
            .or_default();
        Ok(())
    }

    async fn build_context(&self, _session_id: &str, input: &str) -> RuntimeResult<String> {
        Ok(format!("context for {input}"))
    }

    async fn get_recent_messages(
        &self,
        session_id: &str,
        limit: usize,
    ) -> RuntimeResult<Vec<MemoryMessage>> {
        let all = self.messages(session_id);
        let skip = all.len().saturating_sub(limit);
        Ok(all.into_iter().skip(skip).collect())
    }

    async fn add_session_message(
        &self,
        session_id: &str,
        content: &str,
        role: Role,
    ) -> RuntimeResult<()> {
        self.sessions
            .lock()
            .unwrap()
            .entry(session_id.to_string())
            .or_default()
            .push(MemoryMessage::new(role, content));
        Ok(())
    }
}

struct FixedSkills(Vec<Skill>);

#[async_trait]
impl SkillProvider for FixedSkills {
    async fn activate(&self, _input: &str) -> RuntimeResult<Vec<Skill>> {
        Ok(self.0.clone())
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

/// A workflow context wired to fakes.
///
/// Permissions: `web_search` safe, `shell` confirm, `system_modify` deny.
pub(crate) struct Harness {
    pub(crate) ctx: WorkflowContext,
    pub(crate) model: Arc<ScriptedModel>,
    pub(crate) persona: Arc<FakePersona>,
    pub(crate) memory: Arc<FakeMemory>,
}

impl Harness {
    pub(crate) fn new(model: ScriptedModel) -> Self {
        let model = Arc::new(model);
        let persona = Arc::new(FakePersona::default());
        let memory = Arc::new(FakeMemory::default());
        let permissions = PermissionChecker::new(&PermissionConfig {
            safe: vec!["web_search".into()],
            confirm: vec!["shell".into()],
            deny: vec!["system_modify".into()],
            role_allowed_tools: None,
        });

        let ctx = WorkflowContext {
            model: model.clone(),
            persona: persona.clone(),
            memory: memory.clone(),
            classifier: Arc::new(KeywordClassifier::new(["search", "run", "搜索"])),
            skills: Arc::new(NoSkills),
            registry: Arc::new(ToolRegistry::new()),
            permissions: Arc::new(permissions),
            approvals: Arc::new(ApprovalManager::new(ApprovalConfig::default())),
            config: OrchestratorConfig::default(),
        };
        Self {
            ctx,
            model,
            persona,
            memory,
        }
    }

    /// An orchestrator over this harness's services.
    pub(crate) fn orchestrator(&self) -> Orchestrator {
        Orchestrator {
            ctx: self.ctx.clone(),
            workflow: Arc::new(Workflow::standard()),
        }
    }

    pub(crate) fn with_skills(mut self, skills: Vec<Skill>) -> Self {
        self.ctx.skills = Arc::new(FixedSkills(skills));
        self
    }
}
