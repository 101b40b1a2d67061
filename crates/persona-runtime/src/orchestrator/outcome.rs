//! What a finished turn returns to the caller.

use persona_approval::ApprovalState;
use persona_core::{ToolCall, ToolResult};
use serde::{Deserialize, Serialize};

use crate::state::{AgentState, RouteDecision, Validation};

/// Result of [`Orchestrator::process`](super::Orchestrator::process).
///
/// `approval_required` is `Some(true)` when the turn stopped to wait for a
/// human; `response` is then the approval prompt and `pending_tool_call` the
/// call awaiting confirmation. It is `None` otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnOutcome {
    /// Whether the turn completed.
    pub success: bool,
    /// Final response text.
    pub response: String,
    /// Memory context used for the turn.
    pub context: String,
    /// Last persona validation, if one ran.
    pub validation: Option<Validation>,
    /// Wall-clock time for the turn.
    pub latency_ms: u64,
    /// Set when a confirm-tier call is waiting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_required: Option<bool>,
    /// Approval prompt for the human.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_message: Option<String>,
    /// The call awaiting confirmation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_tool_call: Option<ToolCall>,
    /// Tool results produced this turn, in request order.
    #[serde(default)]
    pub tool_results: Vec<ToolResult>,
    /// Routing outcome.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route: Option<RouteDecision>,
    /// Persona regenerations used.
    #[serde(default)]
    pub retry_count: u32,
}

impl TurnOutcome {
    pub(crate) fn from_state(state: AgentState, latency_ms: u64) -> Self {
        let mut outcome = Self {
            success: true,
            response: state.current_response,
            context: state.context,
            validation: state.validation,
            latency_ms,
            approval_required: None,
            approval_message: None,
            pending_tool_call: None,
            tool_results: state.tool_results,
            route: state.route_decision,
            retry_count: state.retry_count,
        };
        if let Some(approval) = state.approval_state {
            outcome.mark_awaiting(approval);
        }
        outcome
    }

    /// The session is still waiting on `approval`; nothing else ran.
    pub(crate) fn still_pending(approval: ApprovalState, latency_ms: u64) -> Self {
        let mut outcome = Self {
            success: true,
            response: String::new(),
            context: String::new(),
            validation: None,
            latency_ms,
            approval_required: None,
            approval_message: None,
            pending_tool_call: None,
            tool_results: Vec::new(),
            route: None,
            retry_count: 0,
        };
        outcome.mark_awaiting(approval);
        outcome
    }

    fn mark_awaiting(&mut self, approval: ApprovalState) {
        self.response.clone_from(&approval.message);
        self.approval_required = Some(true);
        self.approval_message = Some(approval.message);
        self.pending_tool_call = Some(approval.tool_call);
    }

    /// Whether the turn is waiting on a human.
    #[must_use]
    pub fn awaiting_approval(&self) -> bool {
        self.approval_required == Some(true)
    }
}
