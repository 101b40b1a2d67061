//! Orchestrator limits.

use serde::{Deserialize, Serialize};

/// Default number of history messages loaded per turn.
pub const DEFAULT_MAX_CONTEXT_MESSAGES: usize = 20;
/// Default persona regeneration limit.
pub const DEFAULT_MAX_RETRIES: u32 = 2;
/// Default tool-calling rounds per turn.
pub const DEFAULT_MAX_TOOL_ITERATIONS: u32 = 5;

/// Per-turn limits and sampling options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// History messages loaded from memory.
    pub max_context_messages: usize,
    /// Persona regenerations before falling through to enforcement.
    pub max_retries: u32,
    /// Tool-calling rounds per turn, shared across retries.
    pub max_tool_iterations: u32,
    /// Fail the turn instead of falling through when retries run out.
    pub strict_persona: bool,
    /// Sampling temperature passed to the model.
    pub temperature: Option<f32>,
    /// Response token limit passed to the model.
    pub max_tokens: Option<u32>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_context_messages: DEFAULT_MAX_CONTEXT_MESSAGES,
            max_retries: DEFAULT_MAX_RETRIES,
            max_tool_iterations: DEFAULT_MAX_TOOL_ITERATIONS,
            strict_persona: false,
            temperature: None,
            max_tokens: None,
        }
    }
}
