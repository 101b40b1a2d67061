//! Prelude module - commonly used types for convenient import.
//!
//! Use `use persona_runtime::prelude::*;` to import all essential types.

pub use crate::{
    AgentState, FinalResponse, IntentClassifier, KeywordClassifier, MemoryEngine, MemoryMessage,
    NoSkills, Orchestrator, OrchestratorConfig, PersonaEngine, RouteDecision, RuntimeError,
    RuntimeResult, Skill, SkillProvider, StreamingTurn, TurnOutcome, Validation,
};
