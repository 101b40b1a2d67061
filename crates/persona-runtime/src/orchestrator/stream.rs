//! Streaming turns.
//!
//! A streaming turn runs the same context, route and skill steps as
//! [`process`](Orchestrator::process), then streams one model completion
//! without offering tools. Once the caller drains the stream, the text is
//! passed through persona enforcement and persisted to memory; the result
//! resolves [`FinalResponse`].

use futures::{Stream, StreamExt, stream};
use persona_llm::Message;
use persona_telemetry::TurnContext;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;
use tracing::{Instrument, debug, warn};

use super::Orchestrator;
use super::execution::persist_turn;
use crate::error::{RuntimeError, RuntimeResult};
use crate::state::AgentState;
use crate::workflow::{NodeId, WorkflowContext, chat_options, system_prompt};

/// Text deltas of a streaming turn.
pub type TextStream = Pin<Box<dyn Stream<Item = RuntimeResult<String>> + Send>>;

/// Resolves to the persona-enforced full response once the stream is drained.
///
/// Resolves to [`RuntimeError::StreamAborted`] if the stream is dropped
/// before it finishes.
#[derive(Debug)]
pub struct FinalResponse(oneshot::Receiver<RuntimeResult<String>>);

impl Future for FinalResponse {
    type Output = RuntimeResult<String>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.0).poll(cx).map(|received| {
            received.unwrap_or_else(|_| {
                Err(RuntimeError::StreamAborted(
                    "stream dropped before completion".to_string(),
                ))
            })
        })
    }
}

/// A streaming turn: deltas now, the final text later.
pub struct StreamingTurn {
    /// Text as the model produces it.
    pub chunks: TextStream,
    /// The full response after enforcement and persistence.
    pub final_response: FinalResponse,
}

impl StreamingTurn {
    fn ready(text: String) -> Self {
        let (tx, rx) = oneshot::channel();
        // Cannot fail, the receiver is alive.
        let _ = tx.send(Ok(text.clone()));
        Self {
            chunks: Box::pin(stream::iter([Ok::<_, RuntimeError>(text)])),
            final_response: FinalResponse(rx),
        }
    }
}

impl std::fmt::Debug for StreamingTurn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingTurn")
            .field("final_response", &self.final_response)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Start a streaming turn.
    ///
    /// A session with a pending approval is handled exactly as by
    /// [`process`](Self::process) and the result is delivered as a single
    /// chunk.
    ///
    /// # Errors
    ///
    /// Returns a stage-tagged error if building context, routing or opening
    /// the model stream fails. Errors while streaming arrive as stream items.
    pub async fn process_stream(
        &self,
        session_id: &str,
        user_id: &str,
        input: &str,
    ) -> RuntimeResult<StreamingTurn> {
        if self.ctx.approvals.has_pending(session_id) {
            let outcome = self.process(session_id, user_id, input).await?;
            return Ok(StreamingTurn::ready(outcome.response));
        }

        let span = TurnContext::new(session_id, "process_stream")
            .with_user_id(user_id)
            .span();

        let state = self
            .workflow
            .run_until_generation(&self.ctx, AgentState::new(session_id, user_id, input))
            .instrument(span.clone())
            .await?;

        let stage = NodeId::for_agent(state.current_agent).as_str();
        let mut request = Vec::with_capacity(state.messages.len().saturating_add(1));
        request.push(Message::system(system_prompt(&self.ctx, &state, state.current_agent)));
        request.extend(state.messages.iter().cloned());

        let model = self.ctx.model.model().to_string();
        let mut upstream = self
            .ctx
            .model
            .stream(&request, &chat_options(&self.ctx, Vec::new()))
            .instrument(span.clone())
            .await
            .map_err(|source| {
                RuntimeError::ModelInvocation {
                    model: model.clone(),
                    source,
                }
                .at_stage(stage)
            })?;

        let (tx, rx) = oneshot::channel();
        let ctx = self.ctx.clone();
        let session = state.session_id;
        let input = state.current_input;

        let chunks = async_stream::stream! {
            let mut full = String::new();
            while let Some(item) = upstream.next().await {
                match item {
                    Ok(chunk) => {
                        if !chunk.delta.is_empty() {
                            full.push_str(&chunk.delta);
                            yield Ok(chunk.delta);
                        }
                        if chunk.done {
                            break;
                        }
                    },
                    Err(source) => {
                        warn!(session_id = %session, error = %source, "model stream failed");
                        let _ = tx.send(Err(RuntimeError::StreamAborted(source.to_string())));
                        yield Err(RuntimeError::ModelInvocation { model, source }.at_stage(stage));
                        return;
                    },
                }
            }

            let finished = finish(&ctx, &session, &input, &full).instrument(span).await;
            let _ = tx.send(finished);
        };

        Ok(StreamingTurn {
            chunks: Box::pin(chunks),
            final_response: FinalResponse(rx),
        })
    }
}

async fn finish(
    ctx: &WorkflowContext,
    session_id: &str,
    input: &str,
    full: &str,
) -> RuntimeResult<String> {
    let response = ctx
        .persona
        .enforce_persona(full)
        .await
        .map_err(|e| e.at_stage(NodeId::Enforce.as_str()))?;
    persist_turn(ctx, session_id, input, &response)
        .await
        .map_err(|e| e.at_stage("persist"))?;
    debug!(session_id, chars = response.len(), "streaming turn complete");
    Ok(response)
}
