//! Turn context for log correlation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Identifies one conversational turn across every log line it produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnContext {
    /// Unique turn identifier.
    pub turn_id: Uuid,
    /// Conversation the turn belongs to.
    pub session_id: String,
    /// Speaker, if known.
    pub user_id: Option<String>,
    /// Entry point that started the turn (`process`, `process_stream`, ...).
    pub operation: String,
    /// When the turn started.
    pub started_at: DateTime<Utc>,
    /// Additional metadata.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl TurnContext {
    /// Start a context for `session_id`.
    #[must_use]
    pub fn new(session_id: impl Into<String>, operation: impl Into<String>) -> Self {
        Self {
            turn_id: Uuid::new_v4(),
            session_id: session_id.into(),
            user_id: None,
            operation: operation.into(),
            started_at: Utc::now(),
            metadata: HashMap::new(),
        }
    }

    /// Set the speaker.
    #[must_use]
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Add metadata.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Milliseconds since the turn started.
    #[must_use]
    pub fn elapsed_ms(&self) -> i64 {
        // started_at is set at construction, so the difference is non-negative.
        #[allow(clippy::arithmetic_side_effects)]
        let elapsed = Utc::now() - self.started_at;
        elapsed.num_milliseconds()
    }

    /// First eight characters of the turn id.
    #[must_use]
    pub fn short_id(&self) -> String {
        self.turn_id.simple().to_string().chars().take(8).collect()
    }

    /// A span carrying the turn's identifiers.
    #[must_use]
    pub fn span(&self) -> tracing::Span {
        tracing::info_span!(
            "turn",
            turn_id = %self.turn_id,
            session_id = %self.session_id,
            user_id = self.user_id.as_deref(),
            operation = %self.operation,
        )
    }
}

/// Enters a turn's span and logs its duration on drop.
pub struct TurnGuard {
    context: TurnContext,
    #[allow(dead_code)]
    span: tracing::span::EnteredSpan,
}

impl TurnGuard {
    /// Enter the context's span.
    #[must_use]
    pub fn new(context: TurnContext) -> Self {
        let span = context.span().entered();
        tracing::debug!("Turn started");
        Self { context, span }
    }

    /// The turn context.
    #[must_use]
    pub fn context(&self) -> &TurnContext {
        &self.context
    }
}

impl Drop for TurnGuard {
    fn drop(&mut self) {
        tracing::debug!(elapsed_ms = self.context.elapsed_ms(), "Turn finished");
    }
}
