//! The tool-call sub-loop run inside a generation node.
//!
//! Each round sends the conversation to the model. A reply without tool
//! calls ends the loop. Otherwise every call is resolved in request order:
//! denied calls fail, confirm-tier calls open (or queue behind) an approval,
//! safe calls execute. A newly opened approval ends the loop and the turn.

use persona_approval::ApprovalState;
use persona_core::{PermissionLevel, ToolCall, ToolResult};
use persona_llm::{Message, ModelToolCall, ToolSchema};
use tracing::{debug, info, warn};

use super::WorkflowContext;
use super::nodes::chat;
use crate::error::RuntimeResult;

const FORCED_STOP_NOTE: &str = "Tool use limit reached for this turn. \
    Answer the user now with the information you already have.";

const DEFERRED: &str = "deferred: another call is awaiting approval";

pub(super) struct LoopInput<'a> {
    pub(super) session_id: &'a str,
    pub(super) system: &'a str,
    pub(super) messages: Vec<Message>,
    pub(super) tools: Vec<ToolSchema>,
    pub(super) iteration: u32,
    pub(super) results: Vec<ToolResult>,
}

#[derive(Debug)]
pub(super) struct LoopOutcome {
    pub(super) response: String,
    pub(super) messages: Vec<Message>,
    pub(super) results: Vec<ToolResult>,
    pub(super) iteration: u32,
    pub(super) pending: Vec<ToolCall>,
    pub(super) approval: Option<ApprovalState>,
}

#[derive(Debug, Default)]
struct Round {
    results: Vec<ToolResult>,
    pending: Vec<ToolCall>,
    approval: Option<ApprovalState>,
}

pub(super) async fn run_tool_loop(
    ctx: &WorkflowContext,
    input: LoopInput<'_>,
) -> RuntimeResult<LoopOutcome> {
    let LoopInput {
        session_id,
        system,
        mut messages,
        tools,
        mut iteration,
        mut results,
    } = input;
    let max = ctx.config.max_tool_iterations;

    loop {
        let response = chat(ctx, system, &messages, tools.clone()).await?;
        if !response.has_tool_calls() {
            return Ok(LoopOutcome {
                response: response.content,
                messages,
                results,
                iteration,
                pending: Vec::new(),
                approval: None,
            });
        }

        if iteration >= max {
            warn!(
                session_id,
                iteration,
                max,
                dropped = response.tool_calls.len(),
                "tool iteration cap reached, dropping requested calls"
            );
            messages.push(Message::system(FORCED_STOP_NOTE));
            let last = chat(ctx, system, &messages, Vec::new()).await?;
            return Ok(LoopOutcome {
                response: last.content,
                messages,
                results,
                iteration,
                pending: Vec::new(),
                approval: None,
            });
        }

        if let Some(existing) = ctx.approvals.get_pending(session_id) {
            info!(
                session_id,
                approval_id = %existing.id,
                "approval already pending, not dispatching new calls"
            );
            let pending = response
                .tool_calls
                .iter()
                .filter_map(|raw| raw.parse().ok())
                .collect();
            return Ok(LoopOutcome {
                response: existing.message.clone(),
                messages,
                results,
                iteration,
                pending,
                approval: Some(existing),
            });
        }

        iteration = iteration.saturating_add(1);
        debug!(session_id, iteration, calls = response.tool_calls.len(), "tool round");

        let round = resolve_round(ctx, session_id, &response.tool_calls).await;

        messages.push(Message {
            tool_calls: response.tool_calls.clone(),
            ..Message::assistant(&response.content)
        });
        for result in &round.results {
            messages.push(Message::tool(&result.call_id, result.to_model_content()));
        }
        results.extend(round.results);

        if let Some(approval) = round.approval {
            return Ok(LoopOutcome {
                response: approval.message.clone(),
                messages,
                results,
                iteration,
                pending: round.pending,
                approval: Some(approval),
            });
        }
    }
}

async fn resolve_round(ctx: &WorkflowContext, session_id: &str, calls: &[ModelToolCall]) -> Round {
    let mut round = Round::default();

    for raw in calls {
        let call = match raw.parse() {
            Ok(call) => call,
            Err(e) => {
                warn!(session_id, tool = %raw.function.name, error = %e, "unparseable tool call");
                let call = ToolCall::with_id(&raw.id, &raw.function.name);
                round
                    .results
                    .push(ToolResult::failure(&call, format!("invalid arguments: {e}"), 0));
                continue;
            },
        };

        let check = ctx.permissions.check(&call.name);
        if !check.allowed {
            info!(session_id, tool = %call.name, reason = %check.reason, "tool call denied");
            round.results.push(ToolResult::failure(&call, check.reason, 0));
            continue;
        }

        match check.level {
            PermissionLevel::Confirm => {
                if round.approval.is_some() {
                    debug!(session_id, tool = %call.name, "queued behind pending approval");
                    round.results.push(ToolResult::failure(&call, DEFERRED, 0));
                    round.pending.push(call);
                    continue;
                }
                let approval = ctx.approvals.create_approval(session_id, call.clone());
                if approval.tool_call.id == call.id {
                    info!(
                        session_id,
                        tool = %call.name,
                        approval_id = %approval.id,
                        "approval requested"
                    );
                    round.results.push(
                        ToolResult::failure(&call, "awaiting approval", 0)
                            .with_approval(&approval.message),
                    );
                    round.approval = Some(approval);
                } else {
                    round.results.push(ToolResult::failure(&call, DEFERRED, 0));
                }
                round.pending.push(call);
            },
            PermissionLevel::Safe => {
                let result = ctx
                    .registry
                    .execute_with_level(&call, PermissionLevel::Safe)
                    .await;
                round.results.push(result);
            },
            PermissionLevel::Deny => {
                round.results.push(ToolResult::failure(&call, check.reason, 0));
            },
        }
    }

    round
}
