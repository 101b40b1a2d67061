//! Turn workflow as an explicit transition table.
//!
//! ```text
//! context_build -> route -> skill_activate -> {conversation | task}
//!     -> validate -> {enforce (end) | conversation | task (retry)}
//! ```
//!
//! Each node reads the current [`AgentState`] and returns a [`StatePatch`].
//! After a node runs, its edge picks the next node: either a fixed successor
//! or a router function over the patched state. The tool-call sub-loop lives
//! inside the generation nodes, not in the graph.

use async_trait::async_trait;
use persona_approval::{ApprovalManager, PermissionChecker};
use persona_core::AgentKind;
use persona_llm::ModelProvider;
use persona_tools::ToolRegistry;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::collaborators::{IntentClassifier, MemoryEngine, PersonaEngine, SkillProvider};
use crate::error::{RuntimeError, RuntimeResult};
use crate::orchestrator::OrchestratorConfig;
use crate::state::{AgentState, StatePatch};

mod nodes;
mod tool_loop;

pub use nodes::{ContextBuild, Enforce, Generate, Route, SkillActivate, Validate};
pub(crate) use nodes::{chat_options, system_prompt};

/// Workflow node names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NodeId {
    /// Load session history and memory context.
    ContextBuild,
    /// Pick the agent branch.
    Route,
    /// Activate skills and settle the tool set.
    SkillActivate,
    /// Generate as the conversation agent.
    Conversation,
    /// Generate as the task agent.
    Task,
    /// Check persona compliance.
    Validate,
    /// Final persona rewrite.
    Enforce,
}

impl NodeId {
    /// Stage name used in logs and errors.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ContextBuild => "context_build",
            Self::Route => "route",
            Self::SkillActivate => "skill_activate",
            Self::Conversation => "conversation",
            Self::Task => "task",
            Self::Validate => "validate",
            Self::Enforce => "enforce",
        }
    }

    /// The generation node for a branch.
    #[must_use]
    pub fn for_agent(agent: AgentKind) -> Self {
        match agent {
            AgentKind::Conversation => Self::Conversation,
            AgentKind::Task => Self::Task,
        }
    }

    /// Whether this node generates a response.
    #[must_use]
    pub fn is_generation(self) -> bool {
        matches!(self, Self::Conversation | Self::Task)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where control goes after a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Next {
    /// Run another node.
    Node(NodeId),
    /// Finish the turn.
    End,
}

/// Picks the next node from the patched state.
pub type Router = fn(&AgentState, &OrchestratorConfig) -> Next;

/// Outgoing edge of a node.
#[derive(Clone, Copy)]
pub enum Edge {
    /// Always go to the same place.
    To(Next),
    /// Ask a router.
    Branch(Router),
}

impl fmt::Debug for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::To(next) => f.debug_tuple("To").field(next).finish(),
            Self::Branch(_) => f.write_str("Branch(..)"),
        }
    }
}

/// Shared services every node may use.
#[derive(Clone)]
pub struct WorkflowContext {
    /// Chat model.
    pub model: Arc<dyn ModelProvider>,
    /// Persona collaborator.
    pub persona: Arc<dyn PersonaEngine>,
    /// Memory collaborator.
    pub memory: Arc<dyn MemoryEngine>,
    /// Intent classifier for routing.
    pub classifier: Arc<dyn IntentClassifier>,
    /// Skill source.
    pub skills: Arc<dyn SkillProvider>,
    /// Tool dispatch.
    pub registry: Arc<ToolRegistry>,
    /// Tier classification.
    pub permissions: Arc<PermissionChecker>,
    /// Pending approvals.
    pub approvals: Arc<ApprovalManager>,
    /// Limits.
    pub config: OrchestratorConfig,
}

impl fmt::Debug for WorkflowContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkflowContext")
            .field("model", &self.model.model())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// A workflow step.
#[async_trait]
pub trait Node: Send + Sync {
    /// Which node this is.
    fn id(&self) -> NodeId;

    /// Compute the patch for `state`.
    async fn run(&self, ctx: &WorkflowContext, state: &AgentState) -> RuntimeResult<StatePatch>;
}

/// Transition table plus node implementations.
pub struct Workflow {
    nodes: BTreeMap<NodeId, Arc<dyn Node>>,
    edges: BTreeMap<NodeId, Edge>,
    entry: NodeId,
}

impl Workflow {
    /// The standard turn pipeline.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            nodes: BTreeMap::new(),
            edges: BTreeMap::new(),
            entry: NodeId::ContextBuild,
        }
        .with_node(ContextBuild)
        .with_node(Route)
        .with_node(SkillActivate)
        .with_node(Generate::new(AgentKind::Conversation))
        .with_node(Generate::new(AgentKind::Task))
        .with_node(Validate)
        .with_node(Enforce)
        .with_edge(NodeId::ContextBuild, Edge::To(Next::Node(NodeId::Route)))
        .with_edge(NodeId::Route, Edge::To(Next::Node(NodeId::SkillActivate)))
        .with_edge(NodeId::SkillActivate, Edge::Branch(route_by_agent))
        .with_edge(NodeId::Conversation, Edge::Branch(after_generate))
        .with_edge(NodeId::Task, Edge::Branch(after_generate))
        .with_edge(NodeId::Validate, Edge::Branch(after_validate))
        .with_edge(NodeId::Enforce, Edge::To(Next::End))
    }

    /// Register or replace a node.
    #[must_use]
    pub fn with_node(mut self, node: impl Node + 'static) -> Self {
        self.nodes.insert(node.id(), Arc::new(node));
        self
    }

    /// Set a node's outgoing edge.
    #[must_use]
    pub fn with_edge(mut self, from: NodeId, edge: Edge) -> Self {
        self.edges.insert(from, edge);
        self
    }

    /// The edge leaving `node`, if any.
    #[must_use]
    pub fn edge(&self, node: NodeId) -> Option<&Edge> {
        self.edges.get(&node)
    }

    /// Run the whole turn.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::StageFailed`] naming the node that failed. No
    /// partial state is returned.
    pub async fn run(&self, ctx: &WorkflowContext, state: AgentState) -> RuntimeResult<AgentState> {
        self.drive(ctx, state, |_| false).await
    }

    /// Run until control reaches a generation node, without running it.
    ///
    /// # Errors
    ///
    /// Same as [`run`](Self::run).
    pub async fn run_until_generation(
        &self,
        ctx: &WorkflowContext,
        state: AgentState,
    ) -> RuntimeResult<AgentState> {
        self.drive(ctx, state, NodeId::is_generation).await
    }

    async fn drive(
        &self,
        ctx: &WorkflowContext,
        mut state: AgentState,
        stop_before: impl Fn(NodeId) -> bool,
    ) -> RuntimeResult<AgentState> {
        let mut current = self.entry;
        loop {
            if stop_before(current) {
                return Ok(state);
            }
            let node = self.nodes.get(&current).ok_or_else(|| {
                RuntimeError::Config(format!("no node registered for '{current}'"))
                    .at_stage(current.as_str())
            })?;

            debug!(stage = current.as_str(), session_id = %state.session_id, "entering stage");
            let patch = node
                .run(ctx, &state)
                .await
                .map_err(|e| e.at_stage(current.as_str()))?;
            state.apply(patch);

            let next = match self.edges.get(&current) {
                Some(Edge::To(next)) => *next,
                Some(Edge::Branch(router)) => router(&state, &ctx.config),
                None => Next::End,
            };
            match next {
                Next::Node(node) => current = node,
                Next::End => {
                    debug!(stage = current.as_str(), session_id = %state.session_id, "turn finished");
                    return Ok(state);
                },
            }
        }
    }
}

impl fmt::Debug for Workflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Workflow")
            .field("nodes", &self.nodes.keys().collect::<Vec<_>>())
            .field("edges", &self.edges)
            .field("entry", &self.entry)
            .finish()
    }
}

impl Default for Workflow {
    fn default() -> Self {
        Self::standard()
    }
}

// ---------------------------------------------------------------------------
// Routers
// ---------------------------------------------------------------------------

/// Send control to the branch chosen by `route`.
#[must_use]
pub fn route_by_agent(state: &AgentState, _config: &OrchestratorConfig) -> Next {
    Next::Node(NodeId::for_agent(state.current_agent))
}

/// End the turn while an approval is pending, otherwise validate.
#[must_use]
pub fn after_generate(state: &AgentState, config: &OrchestratorConfig) -> Next {
    if state.awaiting_approval() {
        return Next::End;
    }
    if tool_cap_reached(state, config) {
        debug!(
            session_id = %state.session_id,
            iterations = state.tool_call_iteration,
            "tool iteration cap was reached this turn"
        );
    }
    Next::Node(NodeId::Validate)
}

/// Retry the same branch while validation asks for it and retries remain.
#[must_use]
pub fn after_validate(state: &AgentState, config: &OrchestratorConfig) -> Next {
    let regenerate = state
        .validation
        .as_ref()
        .is_some_and(|v| v.should_regenerate);
    if regenerate && state.retry_count < config.max_retries {
        Next::Node(NodeId::for_agent(state.current_agent))
    } else {
        Next::Node(NodeId::Enforce)
    }
}

/// Whether the turn has used up its tool-calling rounds.
#[must_use]
pub fn tool_cap_reached(state: &AgentState, config: &OrchestratorConfig) -> bool {
    state.tool_call_iteration >= config.max_tool_iterations
}
