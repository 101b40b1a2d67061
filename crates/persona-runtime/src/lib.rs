//! Persona Runtime - turn workflow, tool-call loop and orchestration.
//!
//! This crate provides:
//! - The per-turn [`AgentState`] and the patches workflow nodes return
//! - A [`Workflow`] transition table: context, routing, skills, generation,
//!   persona validation with bounded retries, and enforcement
//! - The tool-call sub-loop that resolves model tool requests through the
//!   permission checker, the approval gate and the tool registry
//! - The [`Orchestrator`] exposing `process`, `process_stream` and
//!   `execute_tool`
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use persona_runtime::{MemoryEngine, Orchestrator, OrchestratorConfig, PersonaEngine};
//! use persona_llm::OpenAiCompatProvider;
//!
//! # async fn example(
//! #     persona: Arc<dyn PersonaEngine>,
//! #     memory: Arc<dyn MemoryEngine>,
//! # ) -> Result<(), Box<dyn std::error::Error>> {
//! let model = Arc::new(OpenAiCompatProvider::openai("sk-...", "gpt-4o-mini"));
//! let orchestrator = Orchestrator::new(model, persona, memory, OrchestratorConfig::default());
//!
//! let outcome = orchestrator.process("session-1", "user-1", "帮我搜索一下天气").await?;
//! if outcome.awaiting_approval() {
//!     println!("{}", outcome.approval_message.unwrap_or_default());
//! } else {
//!     println!("{}", outcome.response);
//! }
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod config_bridge;
pub mod prelude;
pub mod workflow;

mod collaborators;
mod error;
mod orchestrator;
mod state;

#[cfg(test)]
mod testing;

pub use collaborators::{
    IntentClassifier, KeywordClassifier, MemoryEngine, MemoryMessage, NoSkills, PersonaEngine,
    SkillProvider,
};
pub use error::{RuntimeError, RuntimeResult};
pub use orchestrator::{
    DEFAULT_MAX_CONTEXT_MESSAGES, DEFAULT_MAX_RETRIES, DEFAULT_MAX_TOOL_ITERATIONS,
    FinalResponse, Orchestrator, OrchestratorConfig, StreamingTurn, TextStream, TurnOutcome,
};
pub use state::{AgentState, RouteDecision, Skill, StatePatch, Validation};
pub use workflow::{Node, NodeId, Workflow, WorkflowContext};
