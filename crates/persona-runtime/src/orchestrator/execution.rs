//! The synchronous turn and approval reply handling.

use persona_approval::{ApprovalReply, ApprovalState};
use persona_core::{ToolCall, ToolResult, elapsed_ms};
use persona_llm::{Message, Role};
use persona_telemetry::TurnContext;
use std::slice;
use std::time::Instant;
use tracing::{Instrument, error, info};

use super::{Orchestrator, TurnOutcome};
use crate::error::RuntimeResult;
use crate::state::AgentState;
use crate::workflow::WorkflowContext;

/// What a pending approval turned into before the workflow runs.
enum ReplyResolution {
    /// No approval was pending.
    NothingPending,
    /// The reply matched no keyword; the approval is still open.
    StillPending(ApprovalState),
    /// The approval resolved; seed the tool exchange into the turn.
    Resolved {
        messages: Vec<Message>,
        results: Vec<ToolResult>,
    },
}

impl Orchestrator {
    /// Run one turn to completion.
    ///
    /// If the session has a pending approval, `input` is first read as the
    /// reply: a confirmation executes the call, a cancellation or an expired
    /// approval yields a failed result, and either way the model then answers
    /// with that outcome in view. An ambiguous reply returns the approval
    /// prompt again without running the workflow.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::StageFailed`](crate::RuntimeError::StageFailed) if a workflow node fails (model
    /// invocation, memory or persona errors), tagged with the stage name.
    /// Tool failures and permission denials are not errors.
    pub async fn process(
        &self,
        session_id: &str,
        user_id: &str,
        input: &str,
    ) -> RuntimeResult<TurnOutcome> {
        let turn = TurnContext::new(session_id, "process").with_user_id(user_id);
        self.process_turn(session_id, user_id, input)
            .instrument(turn.span())
            .await
    }

    async fn process_turn(
        &self,
        session_id: &str,
        user_id: &str,
        input: &str,
    ) -> RuntimeResult<TurnOutcome> {
        let start = Instant::now();

        let state = match self.resolve_reply(session_id, input).await {
            ReplyResolution::NothingPending => AgentState::new(session_id, user_id, input),
            ReplyResolution::StillPending(approval) => {
                info!(approval_id = %approval.id, "reply did not resolve the approval");
                return Ok(TurnOutcome::still_pending(approval, elapsed_ms(start)));
            },
            ReplyResolution::Resolved { messages, results } => {
                AgentState::new(session_id, user_id, input).with_seed(messages, results)
            },
        };

        let state = self
            .workflow
            .run(&self.ctx, state)
            .await
            .inspect_err(|e| {
                error!(stage = e.stage().unwrap_or("unknown"), error = %e, "turn failed");
            })?;

        // A suspended turn is persisted once the approval resolves.
        if !state.awaiting_approval() {
            persist_turn(&self.ctx, session_id, input, &state.current_response)
                .await
                .map_err(|e| e.at_stage("persist"))?;
        }

        let latency_ms = elapsed_ms(start);
        info!(
            agent = state.current_agent.as_str(),
            retries = state.retry_count,
            tool_results = state.tool_results.len(),
            awaiting_approval = state.awaiting_approval(),
            latency_ms,
            "turn complete"
        );
        Ok(TurnOutcome::from_state(state, latency_ms))
    }

    async fn resolve_reply(&self, session_id: &str, input: &str) -> ReplyResolution {
        let approvals = &self.ctx.approvals;
        if !approvals.has_pending(session_id) {
            return ReplyResolution::NothingPending;
        }

        match approvals.handle_reply(session_id, input) {
            ApprovalReply::Invalid => approvals
                .get_pending(session_id)
                .map_or(ReplyResolution::NothingPending, ReplyResolution::StillPending),
            ApprovalReply::Approved(state) => {
                let result = self.execute_tool(session_id, &state.tool_call).await;
                seed(&state.tool_call, result)
            },
            ApprovalReply::Rejected(state) => {
                let result = ToolResult::failure(&state.tool_call, "rejected by user", 0);
                seed(&state.tool_call, result)
            },
            ApprovalReply::Timeout(state) => {
                let result = ToolResult::failure(&state.tool_call, "approval timed out", 0);
                seed(&state.tool_call, result)
            },
        }
    }
}

fn seed(call: &ToolCall, result: ToolResult) -> ReplyResolution {
    let messages = vec![
        Message::assistant_with_tools("", slice::from_ref(call)),
        Message::tool(&result.call_id, result.to_model_content()),
    ];
    ReplyResolution::Resolved {
        messages,
        results: vec![result],
    }
}

/// Flush the user's input and the final response to memory.
pub(super) async fn persist_turn(
    ctx: &WorkflowContext,
    session_id: &str,
    input: &str,
    response: &str,
) -> RuntimeResult<()> {
    ctx.memory
        .add_session_message(session_id, input, Role::User)
        .await?;
    ctx.memory
        .add_session_message(session_id, response, Role::Assistant)
        .await?;
    Ok(())
}
