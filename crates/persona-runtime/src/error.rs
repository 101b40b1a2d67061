//! Runtime error types.

use thiserror::Error;

/// Errors that end a turn.
///
/// Tool failures, permission denials and ambiguous approval replies are not
/// errors; they travel as data in [`ToolResult`](persona_core::ToolResult)
/// and [`ApprovalReply`](persona_approval::ApprovalReply).
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// A workflow node failed.
    #[error("stage '{stage}' failed: {source}")]
    StageFailed {
        /// Node name.
        stage: &'static str,
        /// Underlying error.
        #[source]
        source: Box<RuntimeError>,
    },

    /// The model call failed.
    #[error("model '{model}' invocation failed: {source}")]
    ModelInvocation {
        /// Model name.
        model: String,
        /// Provider error.
        #[source]
        source: persona_llm::LlmError,
    },

    /// The persona collaborator failed.
    #[error("persona error: {0}")]
    Persona(String),

    /// The memory collaborator failed.
    #[error("memory error: {0}")]
    Memory(String),

    /// A tool could not be dispatched.
    #[error("tool error: {0}")]
    Tool(#[from] persona_tools::ToolError),

    /// Validation still demanded regeneration after every retry.
    #[error("persona validation failed after {max} retries")]
    MaxRetriesExceeded {
        /// Configured retry limit.
        max: u32,
    },

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// A streaming turn ended before its stream was drained.
    #[error("stream aborted: {0}")]
    StreamAborted(String),
}

impl RuntimeError {
    /// Tag an error with the node that raised it. Already tagged errors keep
    /// their original stage.
    #[must_use]
    pub fn at_stage(self, stage: &'static str) -> Self {
        match self {
            tagged @ Self::StageFailed { .. } => tagged,
            other => Self::StageFailed {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// The failing stage, if this error came out of the workflow.
    #[must_use]
    pub fn stage(&self) -> Option<&'static str> {
        match self {
            Self::StageFailed { stage, .. } => Some(stage),
            _ => None,
        }
    }
}

impl From<persona_config::ConfigError> for RuntimeError {
    fn from(e: persona_config::ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}

impl From<persona_sandbox::SandboxError> for RuntimeError {
    fn from(e: persona_sandbox::SandboxError) -> Self {
        Self::Config(format!("sandbox: {e}"))
    }
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_tagging_is_not_nested() {
        let err = RuntimeError::Memory("down".into()).at_stage("context_build");
        assert_eq!(err.stage(), Some("context_build"));

        let err = err.at_stage("route");
        assert_eq!(err.stage(), Some("context_build"));
        assert!(err.to_string().contains("memory error: down"));
    }

    #[test]
    fn test_untagged_has_no_stage() {
        assert_eq!(RuntimeError::MaxRetriesExceeded { max: 2 }.stage(), None);
    }
}
