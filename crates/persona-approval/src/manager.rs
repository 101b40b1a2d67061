//! Approval manager - session-scoped human confirmation of tool calls.
//!
//! A `confirm`-tier tool call does not run until the human answers. The turn
//! that requested it returns an approval prompt; the *next* message in that
//! session is expected to carry the answer, which [`ApprovalManager::handle_reply`]
//! interprets.
//!
//! # Lifecycle
//!
//! ```text
//! none ──create_approval──▶ pending ──handle_reply──▶ approved | rejected | timeout
//!                              │                          (record deleted)
//!                              └── unrecognized reply ──▶ pending (unchanged)
//! ```
//!
//! Each session holds at most one pending approval. Expiry is lazy: a stale
//! record is only noticed when it is inspected (`handle_reply`, `create_approval`)
//! or swept (`cleanup_expired`, optionally on a timer via
//! [`ApprovalManager::spawn_expiry_sweep`]).

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use persona_core::ToolCall;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{ApprovalError, ApprovalResult};

/// Default approval timeout (5 minutes).
pub const DEFAULT_TIMEOUT_MS: u64 = 5 * 60 * 1000;

/// Longest argument rendering embedded in an approval prompt.
const MAX_ARGS_PREVIEW_CHARS: usize = 200;

/// Approval behaviour settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApprovalConfig {
    /// How long a pending approval stays valid, in milliseconds.
    pub timeout_ms: u64,
    /// Reply fragments that approve.
    ///
    /// Matching is case-insensitive. A keyword edge that is an ASCII letter or
    /// digit must sit on a word boundary, so `ok` does not match `looks`;
    /// other keywords match anywhere in the reply.
    pub confirm_keywords: Vec<String>,
    /// Reply fragments that reject, matched like `confirm_keywords`.
    pub cancel_keywords: Vec<String>,
}

impl Default for ApprovalConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            confirm_keywords: ["确认", "好的", "yes", "confirm", "approve", "ok"]
                .into_iter()
                .map(String::from)
                .collect(),
            cancel_keywords: ["取消", "拒绝", "不要", "no", "cancel", "deny", "reject"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl ApprovalConfig {
    /// Check that the configuration can ever resolve an approval.
    ///
    /// # Errors
    ///
    /// Returns [`ApprovalError::InvalidConfig`] for a zero timeout or an empty
    /// keyword list.
    pub fn validate(&self) -> ApprovalResult<()> {
        if self.timeout_ms == 0 {
            return Err(ApprovalError::InvalidConfig(
                "timeout_ms must be greater than zero".to_string(),
            ));
        }
        let blank = |k: &String| k.trim().is_empty();
        if self.confirm_keywords.is_empty() || self.confirm_keywords.iter().any(blank) {
            return Err(ApprovalError::InvalidConfig(
                "confirm_keywords must be non-empty and contain no blank entries".to_string(),
            ));
        }
        if self.cancel_keywords.is_empty() || self.cancel_keywords.iter().any(blank) {
            return Err(ApprovalError::InvalidConfig(
                "cancel_keywords must be non-empty and contain no blank entries".to_string(),
            ));
        }
        Ok(())
    }
}

/// Status of an approval record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    /// Waiting for the human.
    Pending,
    /// The human confirmed.
    Approved,
    /// The human cancelled.
    Rejected,
    /// Nobody answered in time.
    Timeout,
}

/// A request for human confirmation of one tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalState {
    /// Unique approval ID.
    pub id: String,
    /// Session the approval belongs to.
    pub session_id: String,
    /// The call awaiting confirmation.
    pub tool_call: ToolCall,
    /// Prompt shown to the human.
    pub message: String,
    /// Current status.
    pub status: ApprovalStatus,
    /// When the approval was created.
    pub created_at: DateTime<Utc>,
    /// Validity window in milliseconds.
    pub timeout_ms: u64,
}

impl ApprovalState {
    /// When the approval stops being valid.
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        let window = ChronoDuration::milliseconds(i64::try_from(self.timeout_ms).unwrap_or(i64::MAX));
        self.created_at
            .checked_add_signed(window)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Whether more than `timeout_ms` has elapsed at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at()
    }

    fn resolved(mut self, status: ApprovalStatus) -> Self {
        self.status = status;
        self
    }
}

/// Interpretation of a human reply.
#[derive(Debug, Clone, PartialEq)]
pub enum ApprovalReply {
    /// Confirmed; the call may run.
    Approved(ApprovalState),
    /// Cancelled; the call must not run.
    Rejected(ApprovalState),
    /// The approval expired before the reply arrived.
    Timeout(ApprovalState),
    /// Nothing pending, or the reply matched no keyword. A pending record
    /// stays pending.
    Invalid,
}

impl ApprovalReply {
    /// Check if the reply approved the call.
    #[must_use]
    pub fn is_approved(&self) -> bool {
        matches!(self, Self::Approved(_))
    }

    /// Check if the reply rejected the call.
    #[must_use]
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }

    /// Check if the approval had expired.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Check if the reply was not understood.
    #[must_use]
    pub fn is_invalid(&self) -> bool {
        matches!(self, Self::Invalid)
    }

    /// The resolved approval, if any.
    #[must_use]
    pub fn state(&self) -> Option<&ApprovalState> {
        match self {
            Self::Approved(s) | Self::Rejected(s) | Self::Timeout(s) => Some(s),
            Self::Invalid => None,
        }
    }

    /// Lowercase outcome name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approved(_) => "approved",
            Self::Rejected(_) => "rejected",
            Self::Timeout(_) => "timeout",
            Self::Invalid => "invalid",
        }
    }
}

/// Tracks pending approvals, one slot per session.
pub struct ApprovalManager {
    config: ApprovalConfig,
    /// Lowercased keyword lists.
    confirm_keywords: Vec<String>,
    cancel_keywords: Vec<String>,
    pending: Mutex<HashMap<String, ApprovalState>>,
}

impl ApprovalManager {
    /// Create a new approval manager.
    #[must_use]
    pub fn new(config: ApprovalConfig) -> Self {
        let lower = |keywords: &[String]| -> Vec<String> {
            keywords
                .iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect()
        };
        Self {
            confirm_keywords: lower(&config.confirm_keywords),
            cancel_keywords: lower(&config.cancel_keywords),
            config,
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &ApprovalConfig {
        &self.config
    }

    /// Open an approval for `tool_call`, or return the one already pending.
    ///
    /// Idempotent while a pending approval exists for the session: the
    /// existing record is returned unchanged and `tool_call` is not stored.
    /// A pending record that has already expired is replaced.
    pub fn create_approval(&self, session_id: &str, tool_call: ToolCall) -> ApprovalState {
        self.create_approval_at(session_id, tool_call, Utc::now())
    }

    /// [`create_approval`](Self::create_approval) with an explicit clock.
    pub fn create_approval_at(
        &self,
        session_id: &str,
        tool_call: ToolCall,
        now: DateTime<Utc>,
    ) -> ApprovalState {
        let mut pending = self.lock();

        if let Some(existing) = pending.get(session_id) {
            if existing.is_expired_at(now) {
                debug!(
                    session_id,
                    approval_id = %existing.id,
                    "replacing expired approval"
                );
            } else {
                debug!(
                    session_id,
                    approval_id = %existing.id,
                    requested_tool = %tool_call.name,
                    "approval already pending, returning existing"
                );
                return existing.clone();
            }
        }

        let state = ApprovalState {
            id: Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            message: approval_message(session_id, &tool_call),
            tool_call,
            status: ApprovalStatus::Pending,
            created_at: now,
            timeout_ms: self.config.timeout_ms,
        };

        info!(
            session_id,
            approval_id = %state.id,
            tool = %state.tool_call.name,
            timeout_ms = state.timeout_ms,
            "approval requested"
        );

        pending.insert(session_id.to_string(), state.clone());
        state
    }

    /// The pending approval for a session, if any.
    ///
    /// Does not check expiry.
    #[must_use]
    pub fn get_pending(&self, session_id: &str) -> Option<ApprovalState> {
        self.lock().get(session_id).cloned()
    }

    /// Whether the session has a pending approval.
    #[must_use]
    pub fn has_pending(&self, session_id: &str) -> bool {
        self.lock().contains_key(session_id)
    }

    /// Number of sessions with a pending approval.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.lock().len()
    }

    /// Interpret a human reply for the session's pending approval.
    ///
    /// The elapsed-time check runs before keyword matching, so a confirm
    /// keyword after the timeout yields [`ApprovalReply::Timeout`]. Confirm
    /// keywords are tested before cancel keywords.
    pub fn handle_reply(&self, session_id: &str, text: &str) -> ApprovalReply {
        self.handle_reply_at(session_id, text, Utc::now())
    }

    /// [`handle_reply`](Self::handle_reply) with an explicit clock.
    pub fn handle_reply_at(&self, session_id: &str, text: &str, now: DateTime<Utc>) -> ApprovalReply {
        let mut pending = self.lock();

        let Some(state) = pending.get(session_id) else {
            return ApprovalReply::Invalid;
        };

        if state.is_expired_at(now) {
            let state = pending
                .remove(session_id)
                .map(|s| s.resolved(ApprovalStatus::Timeout));
            info!(session_id, "approval timed out");
            return state.map_or(ApprovalReply::Invalid, ApprovalReply::Timeout);
        }

        let reply = text.to_lowercase();
        let status = if self.confirm_keywords.iter().any(|k| keyword_in(&reply, k)) {
            ApprovalStatus::Approved
        } else if self.cancel_keywords.iter().any(|k| keyword_in(&reply, k)) {
            ApprovalStatus::Rejected
        } else {
            debug!(session_id, "reply matched no approval keyword");
            return ApprovalReply::Invalid;
        };

        let Some(state) = pending.remove(session_id).map(|s| s.resolved(status)) else {
            return ApprovalReply::Invalid;
        };
        info!(
            session_id,
            approval_id = %state.id,
            tool = %state.tool_call.name,
            outcome = ?status,
            "approval resolved"
        );

        match status {
            ApprovalStatus::Approved => ApprovalReply::Approved(state),
            _ => ApprovalReply::Rejected(state),
        }
    }

    /// Drop the session's pending approval without a reply.
    ///
    /// # Errors
    ///
    /// Returns [`ApprovalError::NotPending`] if nothing was pending.
    pub fn cancel(&self, session_id: &str) -> ApprovalResult<ApprovalState> {
        self.lock()
            .remove(session_id)
            .map(|s| s.resolved(ApprovalStatus::Rejected))
            .ok_or_else(|| ApprovalError::NotPending {
                session_id: session_id.to_string(),
            })
    }

    /// Delete every expired approval. Returns how many were removed.
    pub fn cleanup_expired(&self) -> usize {
        self.cleanup_expired_at(Utc::now())
    }

    /// [`cleanup_expired`](Self::cleanup_expired) with an explicit clock.
    pub fn cleanup_expired_at(&self, now: DateTime<Utc>) -> usize {
        let mut pending = self.lock();
        let before = pending.len();
        pending.retain(|_, state| !state.is_expired_at(now));
        let removed = before.saturating_sub(pending.len());
        if removed > 0 {
            info!(removed, "expired approvals cleaned up");
        }
        removed
    }

    /// Run [`cleanup_expired`](Self::cleanup_expired) every `interval` on the
    /// current tokio runtime.
    ///
    /// The task ends on its own once the manager is dropped.
    #[must_use]
    pub fn spawn_expiry_sweep(self: &Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        let weak = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(manager) = weak.upgrade() else {
                    break;
                };
                manager.cleanup_expired();
            }
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, ApprovalState>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for ApprovalManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApprovalManager")
            .field("timeout_ms", &self.config.timeout_ms)
            .field("pending", &self.pending_count())
            .finish_non_exhaustive()
    }
}

/// Prompt templates. Each embeds the tool name, the arguments and the
/// confirm/cancel wording.
const TEMPLATES: [&str; 3] = [
    "即将执行工具「{tool}」，参数：{args}。该操作需要您的确认：回复“确认”继续，回复“取消”放弃。(Reply \"confirm\" or \"cancel\".)",
    "我想调用工具「{tool}」（参数：{args}）。请回复“确认”允许执行，或回复“取消”拒绝。(Reply \"confirm\" to allow it, \"cancel\" to stop.)",
    "工具「{tool}」需要您的授权才能运行，参数：{args}。回复“确认”以继续，回复“取消”以放弃。(Please confirm or cancel.)",
];

/// Build the approval prompt.
///
/// The template is picked by an FNV-1a hash of the session ID and tool name,
/// so the same session asking for the same tool always gets the same wording.
fn approval_message(session_id: &str, call: &ToolCall) -> String {
    let mut args = call.arguments.to_string();
    if args.chars().count() > MAX_ARGS_PREVIEW_CHARS {
        args = args.chars().take(MAX_ARGS_PREVIEW_CHARS).collect();
        args.push('…');
    }
    let seed = fnv1a(session_id.bytes().chain([0u8]).chain(call.name.bytes()));
    let count = u64::try_from(TEMPLATES.len()).unwrap_or(1);
    let index = seed
        .checked_rem(count)
        .and_then(|i| usize::try_from(i).ok())
        .unwrap_or(0);
    TEMPLATES
        .get(index)
        .unwrap_or(&TEMPLATES[0])
        .replace("{tool}", &call.name)
        .replace("{args}", &args)
}

fn fnv1a(bytes: impl Iterator<Item = u8>) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    bytes.fold(OFFSET, |hash, b| (hash ^ u64::from(b)).wrapping_mul(PRIME))
}

/// Whether `keyword` occurs in `reply` (both already lowercased).
fn keyword_in(reply: &str, keyword: &str) -> bool {
    let word_char = |c: char| c.is_ascii_alphanumeric();
    let guard_start = keyword.starts_with(word_char);
    let guard_end = keyword.ends_with(word_char);

    reply.match_indices(keyword).any(|(at, found)| {
        let before = reply[..at].chars().next_back();
        let after = reply[at.saturating_add(found.len())..].chars().next();
        !((guard_start && before.is_some_and(word_char)) || (guard_end && after.is_some_and(word_char)))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn shell_call() -> ToolCall {
        ToolCall::with_id("call_1", "shell").with_arguments(json!({"command": "ls -la"}))
    }

    fn manager() -> ApprovalManager {
        ApprovalManager::new(ApprovalConfig::default())
    }

    // -----------------------------------------------------------------------
    // Creation
    // -----------------------------------------------------------------------

    #[test]
    fn test_create_approval_message() {
        let manager = manager();
        let state = manager.create_approval("s1", shell_call());

        assert_eq!(state.status, ApprovalStatus::Pending);
        assert_eq!(state.session_id, "s1");
        assert!(state.message.contains("shell"));
        assert!(state.message.contains("确认"));
        assert!(state.message.contains("ls -la"));
        assert!(manager.has_pending("s1"));
    }

    #[test]
    fn test_create_approval_is_idempotent() {
        let manager = manager();
        let first = manager.create_approval("s1", shell_call());
        let second = manager.create_approval("s1", ToolCall::new("write_file"));

        assert_eq!(first, second);
        assert_eq!(second.tool_call.name, "shell");
        assert_eq!(manager.pending_count(), 1);
    }

    #[test]
    fn test_sessions_are_isolated() {
        let manager = manager();
        manager.create_approval("s1", shell_call());
        manager.create_approval("s2", ToolCall::new("write_file"));
        assert_eq!(manager.pending_count(), 2);

        assert!(manager.handle_reply("s1", "取消").is_rejected());
        assert!(manager.has_pending("s2"));
        assert!(!manager.has_pending("s1"));
    }

    #[test]
    fn test_expired_pending_is_replaced() {
        let manager = ApprovalManager::new(ApprovalConfig {
            timeout_ms: 1_000,
            ..ApprovalConfig::default()
        });
        let t0 = Utc::now();
        let first = manager.create_approval_at("s1", shell_call(), t0);
        let later = t0 + ChronoDuration::seconds(5);
        let second = manager.create_approval_at("s1", ToolCall::new("write_file"), later);

        assert_ne!(first.id, second.id);
        assert_eq!(second.tool_call.name, "write_file");
    }

    #[test]
    fn test_message_is_deterministic() {
        let call = shell_call();
        assert_eq!(approval_message("abc", &call), approval_message("abc", &call));
        for session in ["a", "b", "c", "d", "e", "f"] {
            let message = approval_message(session, &call);
            assert!(message.contains("shell"));
            assert!(message.contains("确认"));
            assert!(message.to_lowercase().contains("confirm"));
        }
    }

    #[test]
    fn test_message_truncates_large_arguments() {
        let call = ToolCall::new("write_file").with_arguments(json!({"content": "x".repeat(5_000)}));
        let message = approval_message("s", &call);
        assert!(message.chars().count() < 400);
        assert!(message.contains('…'));
    }

    // -----------------------------------------------------------------------
    // Replies
    // -----------------------------------------------------------------------

    #[test]
    fn test_reply_without_pending_is_invalid() {
        assert!(manager().handle_reply("nobody", "确认").is_invalid());
    }

    #[test]
    fn test_confirm_reply_approves_and_removes() {
        let manager = manager();
        manager.create_approval("s1", shell_call());

        let reply = manager.handle_reply("s1", "确认");
        assert!(reply.is_approved());
        let state = reply.state().unwrap();
        assert_eq!(state.status, ApprovalStatus::Approved);
        assert_eq!(state.tool_call, shell_call());
        assert!(!manager.has_pending("s1"));
    }

    #[test]
    fn test_keywords_are_case_insensitive_substrings() {
        let manager = manager();
        manager.create_approval("s1", shell_call());
        assert!(manager.handle_reply("s1", "Sure, CONFIRM it").is_approved());

        manager.create_approval("s1", shell_call());
        assert!(manager.handle_reply("s1", "请帮我取消吧").is_rejected());
    }

    #[test]
    fn test_ascii_keywords_match_whole_words() {
        let manager = manager();
        manager.create_approval("s1", shell_call());
        let reply = manager.handle_reply("s1", "cancel that, the command looks dangerous");
        assert!(reply.is_rejected());

        manager.create_approval("s1", shell_call());
        assert!(manager.handle_reply("s1", "I know, the token is bad").is_invalid());
        assert!(manager.handle_reply("s1", "OK, go").is_approved());

        manager.create_approval("s1", shell_call());
        assert!(manager.handle_reply("s1", "no!").is_rejected());

        manager.create_approval("s1", shell_call());
        assert!(manager.handle_reply("s1", "好的吧").is_approved());
    }

    #[test]
    fn test_cancel_reply_rejects_and_removes() {
        let manager = manager();
        manager.create_approval("s1", shell_call());

        let reply = manager.handle_reply("s1", "取消");
        assert!(reply.is_rejected());
        assert_eq!(reply.state().unwrap().status, ApprovalStatus::Rejected);
        assert_eq!(manager.pending_count(), 0);
    }

    #[test]
    fn test_unrecognized_reply_keeps_pending() {
        let manager = manager();
        let state = manager.create_approval("s1", shell_call());

        assert!(manager.handle_reply("s1", "嗯……让我想想").is_invalid());
        assert_eq!(manager.get_pending("s1").unwrap().id, state.id);

        assert!(manager.handle_reply("s1", "确认").is_approved());
    }

    #[test]
    fn test_timeout_checked_before_keywords() {
        let manager = ApprovalManager::new(ApprovalConfig {
            timeout_ms: 1_000,
            ..ApprovalConfig::default()
        });
        let t0 = Utc::now();
        manager.create_approval_at("s1", shell_call(), t0);

        let reply = manager.handle_reply_at("s1", "确认", t0 + ChronoDuration::seconds(2));
        assert!(reply.is_timeout());
        assert_eq!(reply.state().unwrap().status, ApprovalStatus::Timeout);
        assert!(!manager.has_pending("s1"));
    }

    #[test]
    fn test_reply_exactly_at_deadline_is_still_valid() {
        let manager = ApprovalManager::new(ApprovalConfig {
            timeout_ms: 1_000,
            ..ApprovalConfig::default()
        });
        let t0 = Utc::now();
        manager.create_approval_at("s1", shell_call(), t0);
        let reply = manager.handle_reply_at("s1", "yes", t0 + ChronoDuration::milliseconds(1_000));
        assert!(reply.is_approved());
    }

    #[tokio::test]
    async fn test_timeout_with_real_clock() {
        let manager = ApprovalManager::new(ApprovalConfig {
            timeout_ms: 10,
            ..ApprovalConfig::default()
        });
        manager.create_approval("s1", shell_call());
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(manager.handle_reply("s1", "确认").is_timeout());
    }

    #[test]
    fn test_custom_keywords() {
        let manager = ApprovalManager::new(ApprovalConfig {
            confirm_keywords: vec!["Go Ahead".into()],
            cancel_keywords: vec!["Stop".into()],
            ..ApprovalConfig::default()
        });
        manager.create_approval("s1", shell_call());
        assert!(manager.handle_reply("s1", "确认").is_invalid());
        assert!(manager.handle_reply("s1", "please go ahead").is_approved());
    }

    // -----------------------------------------------------------------------
    // Housekeeping
    // -----------------------------------------------------------------------

    #[test]
    fn test_cancel() {
        let manager = manager();
        assert!(matches!(
            manager.cancel("s1"),
            Err(ApprovalError::NotPending { .. })
        ));
        manager.create_approval("s1", shell_call());
        assert_eq!(manager.cancel("s1").unwrap().status, ApprovalStatus::Rejected);
        assert!(!manager.has_pending("s1"));
    }

    #[test]
    fn test_cleanup_expired() {
        let manager = ApprovalManager::new(ApprovalConfig {
            timeout_ms: 1_000,
            ..ApprovalConfig::default()
        });
        let t0 = Utc::now();
        manager.create_approval_at("old", shell_call(), t0);
        manager.create_approval_at("new", shell_call(), t0 + ChronoDuration::seconds(10));

        assert_eq!(manager.cleanup_expired_at(t0 + ChronoDuration::seconds(5)), 1);
        assert!(!manager.has_pending("old"));
        assert!(manager.has_pending("new"));
        assert_eq!(manager.cleanup_expired_at(t0 + ChronoDuration::seconds(5)), 0);
    }

    #[tokio::test]
    async fn test_expiry_sweep_removes_stale_approvals() {
        let manager = Arc::new(ApprovalManager::new(ApprovalConfig {
            timeout_ms: 5,
            ..ApprovalConfig::default()
        }));
        manager.create_approval("s1", shell_call());
        let handle = manager.spawn_expiry_sweep(Duration::from_millis(10));

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(!manager.has_pending("s1"));

        drop(manager);
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[test]
    fn test_config_validation() {
        assert!(ApprovalConfig::default().validate().is_ok());
        let bad = ApprovalConfig {
            timeout_ms: 0,
            ..ApprovalConfig::default()
        };
        assert!(bad.validate().is_err());
        let bad = ApprovalConfig {
            confirm_keywords: vec![" ".into()],
            ..ApprovalConfig::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_approval_state_serializes() {
        let state = manager().create_approval("s1", shell_call());
        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(value["status"], "pending");
        assert_eq!(value["tool_call"]["name"], "shell");
    }
}
