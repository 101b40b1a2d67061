//! Per-turn agent state and the patches workflow nodes produce.

use chrono::{DateTime, Utc};
use persona_approval::ApprovalState;
use persona_core::{AgentKind, ToolCall, ToolResult};
use persona_llm::Message;
use serde::{Deserialize, Serialize};

/// Which agent branch handles a turn, and why.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteDecision {
    /// Selected branch.
    pub agent: AgentKind,
    /// Classifier confidence in `0.0..=1.0`.
    pub confidence: f32,
    /// Short explanation.
    pub reason: String,
}

impl RouteDecision {
    /// Route to the conversation branch.
    pub fn conversation(confidence: f32, reason: impl Into<String>) -> Self {
        Self {
            agent: AgentKind::Conversation,
            confidence,
            reason: reason.into(),
        }
    }

    /// Route to the task branch.
    pub fn task(confidence: f32, reason: impl Into<String>) -> Self {
        Self {
            agent: AgentKind::Task,
            confidence,
            reason: reason.into(),
        }
    }
}

/// Outcome of a persona compliance check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validation {
    /// Whether the response is in character.
    pub is_valid: bool,
    /// What was wrong with it.
    pub violations: Vec<String>,
    /// Whether the response should be generated again.
    pub should_regenerate: bool,
}

impl Validation {
    /// A passing validation.
    #[must_use]
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            violations: Vec::new(),
            should_regenerate: false,
        }
    }

    /// A failing validation that asks for regeneration.
    #[must_use]
    pub fn regenerate<I, S>(violations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            is_valid: false,
            violations: violations.into_iter().map(Into::into).collect(),
            should_regenerate: true,
        }
    }
}

/// A skill activated for the current input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skill {
    /// Skill name.
    pub name: String,
    /// Extra system instructions.
    pub instructions: String,
    /// Tools the skill works with. Empty leaves the tool set unchanged.
    #[serde(default)]
    pub tools: Vec<String>,
}

/// Everything a turn knows, threaded through the workflow.
///
/// Created fresh for every turn. Nodes never mutate it directly; they return
/// a [`StatePatch`] which the workflow applies.
#[derive(Debug, Clone)]
pub struct AgentState {
    /// Conversation id.
    pub session_id: String,
    /// Speaker id.
    pub user_id: String,
    /// The user's input for this turn.
    pub current_input: String,
    /// Latest response text.
    pub current_response: String,
    /// Conversation sent to the model, without the system prompt.
    pub messages: Vec<Message>,
    /// Active branch.
    pub current_agent: AgentKind,
    /// Routing outcome.
    pub route_decision: Option<RouteDecision>,
    /// Latest persona validation.
    pub validation: Option<Validation>,
    /// Regenerations so far.
    pub retry_count: u32,
    /// Background context from memory.
    pub context: String,
    /// Skills active for this turn.
    pub active_skills: Vec<Skill>,
    /// Tool names offered to the model.
    pub available_tools: Vec<String>,
    /// Calls requested but not resolved.
    pub pending_tool_calls: Vec<ToolCall>,
    /// Results collected this turn, in request order.
    pub tool_results: Vec<ToolResult>,
    /// Tool-calling rounds so far.
    pub tool_call_iteration: u32,
    /// Approval opened during this turn.
    pub approval_state: Option<ApprovalState>,
    /// When the turn started.
    pub started_at: DateTime<Utc>,
    /// When the last patch was applied.
    pub updated_at: DateTime<Utc>,
}

impl AgentState {
    /// Fresh state for one turn.
    pub fn new(
        session_id: impl Into<String>,
        user_id: impl Into<String>,
        input: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.into(),
            user_id: user_id.into(),
            current_input: input.into(),
            current_response: String::new(),
            messages: Vec::new(),
            current_agent: AgentKind::default(),
            route_decision: None,
            validation: None,
            retry_count: 0,
            context: String::new(),
            active_skills: Vec::new(),
            available_tools: Vec::new(),
            pending_tool_calls: Vec::new(),
            tool_results: Vec::new(),
            tool_call_iteration: 0,
            approval_state: None,
            started_at: now,
            updated_at: now,
        }
    }

    /// Seed messages and results that follow the user's input, such as a
    /// tool exchange resolved from an approval reply.
    #[must_use]
    pub fn with_seed(mut self, messages: Vec<Message>, results: Vec<ToolResult>) -> Self {
        self.messages = messages;
        self.tool_results = results;
        self
    }

    /// Whether the turn stopped to wait for a human.
    #[must_use]
    pub fn awaiting_approval(&self) -> bool {
        self.approval_state.is_some()
    }

    /// Apply a node's patch.
    pub fn apply(&mut self, patch: StatePatch) {
        let StatePatch {
            current_response,
            messages,
            current_agent,
            route_decision,
            validation,
            retry_count,
            context,
            active_skills,
            available_tools,
            pending_tool_calls,
            tool_results,
            tool_call_iteration,
            approval_state,
        } = patch;

        if let Some(v) = current_response {
            self.current_response = v;
        }
        if let Some(v) = messages {
            self.messages = v;
        }
        if let Some(v) = current_agent {
            self.current_agent = v;
        }
        if let Some(v) = route_decision {
            self.route_decision = Some(v);
        }
        if let Some(v) = validation {
            self.validation = v;
        }
        if let Some(v) = retry_count {
            self.retry_count = v;
        }
        if let Some(v) = context {
            self.context = v;
        }
        if let Some(v) = active_skills {
            self.active_skills = v;
        }
        if let Some(v) = available_tools {
            self.available_tools = v;
        }
        if let Some(v) = pending_tool_calls {
            self.pending_tool_calls = v;
        }
        if let Some(v) = tool_results {
            self.tool_results = v;
        }
        if let Some(v) = tool_call_iteration {
            self.tool_call_iteration = v;
        }
        if let Some(v) = approval_state {
            self.approval_state = Some(v);
        }
        self.updated_at = Utc::now();
    }
}

/// Partial update returned by a workflow node. `None` leaves a field as is.
#[derive(Debug, Clone, Default)]
pub struct StatePatch {
    /// New response text.
    pub current_response: Option<String>,
    /// Replacement conversation.
    pub messages: Option<Vec<Message>>,
    /// New branch.
    pub current_agent: Option<AgentKind>,
    /// Routing outcome.
    pub route_decision: Option<RouteDecision>,
    /// New validation; `Some(None)` clears it.
    pub validation: Option<Option<Validation>>,
    /// New retry count.
    pub retry_count: Option<u32>,
    /// Memory context.
    pub context: Option<String>,
    /// Active skills.
    pub active_skills: Option<Vec<Skill>>,
    /// Offered tool names.
    pub available_tools: Option<Vec<String>>,
    /// Replacement pending calls.
    pub pending_tool_calls: Option<Vec<ToolCall>>,
    /// Replacement result list.
    pub tool_results: Option<Vec<ToolResult>>,
    /// New iteration count.
    pub tool_call_iteration: Option<u32>,
    /// Approval opened by this node.
    pub approval_state: Option<ApprovalState>,
}

impl StatePatch {
    /// An empty patch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the response.
    #[must_use]
    pub fn response(mut self, response: impl Into<String>) -> Self {
        self.current_response = Some(response.into());
        self
    }

    /// Set the validation.
    #[must_use]
    pub fn validation(mut self, validation: Validation) -> Self {
        self.validation = Some(Some(validation));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_defaults() {
        let state = AgentState::new("s1", "u1", "hello");
        assert_eq!(state.current_input, "hello");
        assert_eq!(state.current_agent, AgentKind::Conversation);
        assert_eq!(state.retry_count, 0);
        assert_eq!(state.tool_call_iteration, 0);
        assert!(!state.awaiting_approval());
    }

    #[test]
    fn test_apply_only_touches_set_fields() {
        let mut state = AgentState::new("s1", "u1", "hello");
        state.context = "kept".into();

        state.apply(StatePatch {
            current_agent: Some(AgentKind::Task),
            retry_count: Some(1),
            ..StatePatch::new().response("hi")
        });

        assert_eq!(state.current_response, "hi");
        assert_eq!(state.current_agent, AgentKind::Task);
        assert_eq!(state.retry_count, 1);
        assert_eq!(state.context, "kept");
    }

    #[test]
    fn test_validation_can_be_cleared() {
        let mut state = AgentState::new("s1", "u1", "hello");
        state.apply(StatePatch::new().validation(Validation::regenerate(["too formal"])));
        assert!(state.validation.as_ref().is_some_and(|v| v.should_regenerate));

        state.apply(StatePatch {
            validation: Some(None),
            ..StatePatch::default()
        });
        assert!(state.validation.is_none());
    }

    #[test]
    fn test_seed() {
        let call = ToolCall::with_id("c1", "shell");
        let result = ToolResult::failure(&call, "rejected by user", 0);
        let state = AgentState::new("s1", "u1", "取消")
            .with_seed(vec![Message::tool("c1", "Error: rejected by user")], vec![result]);
        assert_eq!(state.messages.len(), 1);
        assert_eq!(state.tool_results.len(), 1);
    }
}
