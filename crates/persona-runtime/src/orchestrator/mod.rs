//! The orchestrator - the entry point for every turn.
//!
//! Wires the model, persona, memory, tool registry and approval gate into
//! the turn workflow and exposes [`process`](Orchestrator::process),
//! [`process_stream`](Orchestrator::process_stream) and
//! [`execute_tool`](Orchestrator::execute_tool).

use persona_approval::{ApprovalConfig, ApprovalManager, PermissionChecker, PermissionConfig};
use persona_config::OrchestratorSection;
use persona_llm::ModelProvider;
use persona_tools::ToolRegistry;
use std::fmt;
use std::sync::Arc;
use tracing::info;

use crate::collaborators::{IntentClassifier, KeywordClassifier, MemoryEngine, NoSkills, PersonaEngine, SkillProvider};
use crate::workflow::{Workflow, WorkflowContext};

mod config;
mod execution;
mod outcome;
mod stream;
mod tool_execution;


pub use config::{
    DEFAULT_MAX_CONTEXT_MESSAGES, DEFAULT_MAX_RETRIES, DEFAULT_MAX_TOOL_ITERATIONS,
    OrchestratorConfig,
};
pub use outcome::TurnOutcome;
pub use stream::{FinalResponse, StreamingTurn, TextStream};

/// Runs turns for any number of sessions.
///
/// Cheap to share behind an `Arc`. Session-scoped state lives in the
/// per-turn [`AgentState`](crate::AgentState) and in the approval manager's
/// per-session slot; everything held here is safe for concurrent use.
pub struct Orchestrator {
    pub(super) ctx: WorkflowContext,
    pub(super) workflow: Arc<Workflow>,
}

impl Orchestrator {
    /// Create an orchestrator with an empty tool registry, default-closed
    /// permissions, the keyword classifier and no skills.
    #[must_use]
    pub fn new(
        model: Arc<dyn ModelProvider>,
        persona: Arc<dyn PersonaEngine>,
        memory: Arc<dyn MemoryEngine>,
        config: OrchestratorConfig,
    ) -> Self {
        info!(
            provider = model.name(),
            model = model.model(),
            max_retries = config.max_retries,
            max_tool_iterations = config.max_tool_iterations,
            strict_persona = config.strict_persona,
            "Orchestrator initialized"
        );

        Self {
            ctx: WorkflowContext {
                model,
                persona,
                memory,
                classifier: Arc::new(KeywordClassifier::new(
                    OrchestratorSection::default().task_keywords,
                )),
                skills: Arc::new(NoSkills),
                registry: Arc::new(ToolRegistry::new()),
                permissions: Arc::new(PermissionChecker::new(&PermissionConfig::default())),
                approvals: Arc::new(ApprovalManager::new(ApprovalConfig::default())),
                config,
            },
            workflow: Arc::new(Workflow::standard()),
        }
    }

    /// Use a different intent classifier.
    #[must_use]
    pub fn with_classifier(mut self, classifier: Arc<dyn IntentClassifier>) -> Self {
        self.ctx.classifier = classifier;
        self
    }

    /// Use a skill provider.
    #[must_use]
    pub fn with_skills(mut self, skills: Arc<dyn SkillProvider>) -> Self {
        self.ctx.skills = skills;
        self
    }

    /// Use a populated tool registry.
    #[must_use]
    pub fn with_registry(mut self, registry: Arc<ToolRegistry>) -> Self {
        self.ctx.registry = registry;
        self
    }

    /// Use a permission checker.
    #[must_use]
    pub fn with_permissions(mut self, permissions: Arc<PermissionChecker>) -> Self {
        self.ctx.permissions = permissions;
        self
    }

    /// Use an approval manager.
    #[must_use]
    pub fn with_approvals(mut self, approvals: Arc<ApprovalManager>) -> Self {
        self.ctx.approvals = approvals;
        self
    }

    /// Replace the turn workflow.
    #[must_use]
    pub fn with_workflow(mut self, workflow: Workflow) -> Self {
        self.workflow = Arc::new(workflow);
        self
    }

    /// Active limits.
    #[must_use]
    pub fn config(&self) -> &OrchestratorConfig {
        &self.ctx.config
    }

    /// The tool registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.ctx.registry
    }

    /// The permission checker.
    #[must_use]
    pub fn permissions(&self) -> &Arc<PermissionChecker> {
        &self.ctx.permissions
    }

    /// The approval manager.
    #[must_use]
    pub fn approvals(&self) -> &Arc<ApprovalManager> {
        &self.ctx.approvals
    }

    /// The model provider.
    #[must_use]
    pub fn model(&self) -> &Arc<dyn ModelProvider> {
        &self.ctx.model
    }
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("ctx", &self.ctx)
            .field("workflow", &self.workflow)
            .finish()
    }
}
