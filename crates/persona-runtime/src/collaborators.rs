//! Contracts for the components the turn pipeline consumes but does not own.

use async_trait::async_trait;
use persona_core::AgentKind;
use persona_llm::Role;
use serde::{Deserialize, Serialize};

use crate::error::RuntimeResult;
use crate::state::{RouteDecision, Skill, Validation};

/// Keeps responses in character.
#[async_trait]
pub trait PersonaEngine: Send + Sync {
    /// System prompt for the given branch.
    fn system_prompt(&self, agent: AgentKind) -> String;

    /// Check a response against the persona.
    async fn validate(&self, response: &str) -> RuntimeResult<Validation>;

    /// Rewrite a response into the persona's voice.
    async fn enforce_persona(&self, response: &str) -> RuntimeResult<String>;
}

/// A stored conversation message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryMessage {
    /// Who said it.
    pub role: Role,
    /// What was said.
    pub content: String,
}

impl MemoryMessage {
    /// Create a message.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Session history and long-term context.
#[async_trait]
pub trait MemoryEngine: Send + Sync {
    /// Whether the session exists.
    async fn has_session(&self, session_id: &str) -> RuntimeResult<bool>;

    /// Create an empty session.
    async fn create_session(&self, session_id: &str, user_id: &str) -> RuntimeResult<()>;

    /// Background context relevant to `input`.
    async fn build_context(&self, session_id: &str, input: &str) -> RuntimeResult<String>;

    /// The last `limit` messages, oldest first.
    async fn get_recent_messages(
        &self,
        session_id: &str,
        limit: usize,
    ) -> RuntimeResult<Vec<MemoryMessage>>;

    /// Append a message to the session.
    async fn add_session_message(
        &self,
        session_id: &str,
        content: &str,
        role: Role,
    ) -> RuntimeResult<()>;
}

/// Picks the agent branch for an input.
pub trait IntentClassifier: Send + Sync {
    /// Classify `input`.
    fn classify(&self, input: &str) -> RouteDecision;
}

/// Routes to the task branch when the input contains any task keyword.
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    keywords: Vec<String>,
}

impl KeywordClassifier {
    /// Build from keywords, matched case-insensitively as substrings.
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keywords: keywords
                .into_iter()
                .map(|k| k.into().trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    /// The normalized keyword list.
    #[must_use]
    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }
}

impl IntentClassifier for KeywordClassifier {
    fn classify(&self, input: &str) -> RouteDecision {
        let lowered = input.to_lowercase();
        let hits: Vec<&str> = self
            .keywords
            .iter()
            .filter(|k| lowered.contains(k.as_str()))
            .map(String::as_str)
            .collect();

        if hits.is_empty() {
            return RouteDecision::conversation(0.6, "no task keywords");
        }

        // One hit is a fair signal, each further hit adds a little.
        let extra = u16::try_from(hits.len().saturating_sub(1)).unwrap_or(u16::MAX);
        let confidence = (0.7 + 0.1 * f32::from(extra)).min(0.95);
        RouteDecision::task(confidence, format!("matched: {}", hits.join(", ")))
    }
}

/// Chooses skills for an input.
#[async_trait]
pub trait SkillProvider: Send + Sync {
    /// Skills that apply to `input`.
    async fn activate(&self, input: &str) -> RuntimeResult<Vec<Skill>>;
}

/// A provider with no skills.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSkills;

#[async_trait]
impl SkillProvider for NoSkills {
    async fn activate(&self, _input: &str) -> RuntimeResult<Vec<Skill>> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_classifier_routes_tasks() {
        let classifier = KeywordClassifier::new(["搜索", "Search", " ", "run"]);
        assert_eq!(classifier.keywords(), ["搜索", "search", "run"]);

        let decision = classifier.classify("帮我搜索一下天气");
        assert_eq!(decision.agent, AgentKind::Task);
        assert!(decision.reason.contains("搜索"));

        let decision = classifier.classify("SEARCH and RUN it");
        assert_eq!(decision.agent, AgentKind::Task);
        assert!(decision.confidence > 0.7);
    }

    #[test]
    fn test_keyword_classifier_defaults_to_conversation() {
        let classifier = KeywordClassifier::new(["search"]);
        let decision = classifier.classify("how are you today?");
        assert_eq!(decision.agent, AgentKind::Conversation);
    }

    #[tokio::test]
    async fn test_no_skills() {
        assert!(NoSkills.activate("anything").await.unwrap().is_empty());
    }
}
