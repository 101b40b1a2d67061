//! Workflow node implementations.

use async_trait::async_trait;
use persona_core::AgentKind;
use persona_llm::{ChatOptions, ChatResponse, Message, Role, ToolSchema};
use std::collections::HashSet;
use tracing::{debug, info, warn};

use super::tool_loop::{LoopInput, run_tool_loop};
use super::{Node, NodeId, WorkflowContext};
use crate::collaborators::MemoryMessage;
use crate::error::{RuntimeError, RuntimeResult};
use crate::state::{AgentState, StatePatch, Validation};

/// Loads session history and memory context.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextBuild;

#[async_trait]
impl Node for ContextBuild {
    fn id(&self) -> NodeId {
        NodeId::ContextBuild
    }

    async fn run(&self, ctx: &WorkflowContext, state: &AgentState) -> RuntimeResult<StatePatch> {
        let memory = &ctx.memory;
        if !memory.has_session(&state.session_id).await? {
            info!(session_id = %state.session_id, user_id = %state.user_id, "creating session");
            memory
                .create_session(&state.session_id, &state.user_id)
                .await?;
        }

        let context = memory
            .build_context(&state.session_id, &state.current_input)
            .await?;
        let recent = memory
            .get_recent_messages(&state.session_id, ctx.config.max_context_messages)
            .await?;

        let mut messages: Vec<Message> = recent.into_iter().filter_map(history_message).collect();
        messages.push(Message::user(&state.current_input));
        messages.extend(state.messages.iter().cloned());

        debug!(
            history = messages.len(),
            context_chars = context.len(),
            "context built"
        );
        Ok(StatePatch {
            context: Some(context),
            messages: Some(messages),
            ..StatePatch::default()
        })
    }
}

// Stored tool messages have lost their call ids and cannot be replayed.
fn history_message(stored: MemoryMessage) -> Option<Message> {
    match stored.role {
        Role::System => Some(Message::system(stored.content)),
        Role::User => Some(Message::user(stored.content)),
        Role::Assistant => Some(Message::assistant(stored.content)),
        Role::Tool => None,
    }
}

/// Picks the conversation or task branch.
#[derive(Debug, Clone, Copy, Default)]
pub struct Route;

#[async_trait]
impl Node for Route {
    fn id(&self) -> NodeId {
        NodeId::Route
    }

    async fn run(&self, ctx: &WorkflowContext, state: &AgentState) -> RuntimeResult<StatePatch> {
        let decision = ctx.classifier.classify(&state.current_input);
        info!(
            agent = decision.agent.as_str(),
            confidence = decision.confidence,
            reason = %decision.reason,
            "routed"
        );
        Ok(StatePatch {
            current_agent: Some(decision.agent),
            route_decision: Some(decision),
            ..StatePatch::default()
        })
    }
}

/// Activates skills and settles which tools the model may see.
#[derive(Debug, Clone, Copy, Default)]
pub struct SkillActivate;

#[async_trait]
impl Node for SkillActivate {
    fn id(&self) -> NodeId {
        NodeId::SkillActivate
    }

    async fn run(&self, ctx: &WorkflowContext, state: &AgentState) -> RuntimeResult<StatePatch> {
        let skills = ctx.skills.activate(&state.current_input).await?;

        let narrowed: Option<HashSet<&str>> = skills
            .iter()
            .any(|s| !s.tools.is_empty())
            .then(|| {
                skills
                    .iter()
                    .flat_map(|s| s.tools.iter().map(String::as_str))
                    .collect()
            });

        let available: Vec<String> = ctx
            .registry
            .names()
            .await
            .into_iter()
            .filter(|name| narrowed.as_ref().is_none_or(|set| set.contains(name.as_str())))
            .filter(|name| ctx.permissions.check(name).allowed)
            .collect();

        debug!(
            skills = skills.len(),
            tools = ?available,
            "skills activated"
        );
        Ok(StatePatch {
            available_tools: Some(available),
            active_skills: Some(skills),
            ..StatePatch::default()
        })
    }
}

/// Generates a response for one branch, running the tool-call sub-loop.
#[derive(Debug, Clone, Copy)]
pub struct Generate {
    agent: AgentKind,
}

impl Generate {
    /// Generation node for `agent`.
    #[must_use]
    pub fn new(agent: AgentKind) -> Self {
        Self { agent }
    }
}

#[async_trait]
impl Node for Generate {
    fn id(&self) -> NodeId {
        NodeId::for_agent(self.agent)
    }

    async fn run(&self, ctx: &WorkflowContext, state: &AgentState) -> RuntimeResult<StatePatch> {
        let mut messages = state.messages.clone();
        let mut retry_count = state.retry_count;

        if let Some(validation) = state.validation.as_ref().filter(|v| v.should_regenerate) {
            retry_count = retry_count.saturating_add(1);
            info!(
                agent = self.agent.as_str(),
                attempt = retry_count,
                violations = ?validation.violations,
                "regenerating response"
            );
            if !state.current_response.is_empty() {
                messages.push(Message::assistant(&state.current_response));
            }
            messages.push(Message::system(retry_note(validation)));
        }

        let system = system_prompt(ctx, state, self.agent);
        let tools = offered_schemas(ctx, &state.available_tools).await;

        let outcome = run_tool_loop(
            ctx,
            LoopInput {
                session_id: &state.session_id,
                system: &system,
                messages,
                tools,
                iteration: state.tool_call_iteration,
                results: state.tool_results.clone(),
            },
        )
        .await?;

        Ok(StatePatch {
            current_response: Some(outcome.response),
            messages: Some(outcome.messages),
            retry_count: Some(retry_count),
            pending_tool_calls: Some(outcome.pending),
            tool_results: Some(outcome.results),
            tool_call_iteration: Some(outcome.iteration),
            approval_state: outcome.approval,
            ..StatePatch::default()
        })
    }
}

fn retry_note(validation: &Validation) -> String {
    format!(
        "Your previous reply broke character: {}. Rewrite it fully in persona.",
        validation.violations.join("; ")
    )
}

/// Persona prompt plus skill instructions and memory context.
pub(crate) fn system_prompt(ctx: &WorkflowContext, state: &AgentState, agent: AgentKind) -> String {
    let mut prompt = ctx.persona.system_prompt(agent);
    for skill in state.active_skills.iter().filter(|s| !s.instructions.is_empty()) {
        prompt.push_str("\n\n## Skill: ");
        prompt.push_str(&skill.name);
        prompt.push('\n');
        prompt.push_str(&skill.instructions);
    }
    if !state.context.is_empty() {
        prompt.push_str("\n\n## Context\n");
        prompt.push_str(&state.context);
    }
    prompt
}

async fn offered_schemas(ctx: &WorkflowContext, available: &[String]) -> Vec<ToolSchema> {
    if available.is_empty() {
        return Vec::new();
    }
    ctx.registry
        .schemas()
        .await
        .into_iter()
        .filter(|schema| available.iter().any(|name| name == schema.name()))
        .collect()
}

/// Send one chat request with the system prompt prepended.
pub(super) async fn chat(
    ctx: &WorkflowContext,
    system: &str,
    messages: &[Message],
    tools: Vec<ToolSchema>,
) -> RuntimeResult<ChatResponse> {
    let mut request = Vec::with_capacity(messages.len().saturating_add(1));
    request.push(Message::system(system));
    request.extend_from_slice(messages);

    ctx.model
        .chat(&request, &chat_options(ctx, tools))
        .await
        .map_err(|source| RuntimeError::ModelInvocation {
            model: ctx.model.model().to_string(),
            source,
        })
}

/// Options for a model call from the configured sampling limits.
pub(crate) fn chat_options(ctx: &WorkflowContext, tools: Vec<ToolSchema>) -> ChatOptions {
    let mut options = ChatOptions::default().with_tools(tools);
    if let Some(temperature) = ctx.config.temperature {
        options = options.with_temperature(temperature);
    }
    if let Some(max_tokens) = ctx.config.max_tokens {
        options = options.with_max_tokens(max_tokens);
    }
    options
}

/// Checks the response against the persona.
#[derive(Debug, Clone, Copy, Default)]
pub struct Validate;

#[async_trait]
impl Node for Validate {
    fn id(&self) -> NodeId {
        NodeId::Validate
    }

    async fn run(&self, ctx: &WorkflowContext, state: &AgentState) -> RuntimeResult<StatePatch> {
        let validation = ctx.persona.validate(&state.current_response).await?;

        if validation.should_regenerate && state.retry_count >= ctx.config.max_retries {
            if ctx.config.strict_persona {
                return Err(RuntimeError::MaxRetriesExceeded {
                    max: ctx.config.max_retries,
                });
            }
            warn!(
                retries = state.retry_count,
                violations = ?validation.violations,
                "persona retries exhausted, keeping last response"
            );
        }

        Ok(StatePatch::new().validation(validation))
    }
}

/// Rewrites the final response in the persona's voice.
#[derive(Debug, Clone, Copy, Default)]
pub struct Enforce;

#[async_trait]
impl Node for Enforce {
    fn id(&self) -> NodeId {
        NodeId::Enforce
    }

    async fn run(&self, ctx: &WorkflowContext, state: &AgentState) -> RuntimeResult<StatePatch> {
        let response = ctx.persona.enforce_persona(&state.current_response).await?;
        Ok(StatePatch::new().response(response))
    }
}
