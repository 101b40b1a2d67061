//! Persona Approval - Permission tiers and human-in-the-loop approval.
//!
//! Every tool call the model requests passes through this crate before it
//! can run:
//!
//! - [`PermissionChecker`] classifies a tool name as `safe`, `confirm` or
//!   `deny` from configured lists and an optional role whitelist.
//! - [`ApprovalManager`] holds at most one pending [`ApprovalState`] per
//!   session and turns free-text replies into an [`ApprovalReply`].
//!
//! # Example
//!
//! ```
//! use persona_approval::{ApprovalConfig, ApprovalManager, PermissionChecker, PermissionConfig};
//! use persona_core::{PermissionLevel, ToolCall};
//!
//! let checker = PermissionChecker::new(&PermissionConfig {
//!     safe: vec!["web_search".into()],
//!     confirm: vec!["shell".into()],
//!     ..PermissionConfig::default()
//! });
//! assert_eq!(checker.level("shell"), PermissionLevel::Confirm);
//! assert!(!checker.check("format_disk").allowed);
//!
//! let approvals = ApprovalManager::new(ApprovalConfig::default());
//! let state = approvals.create_approval("session-1", ToolCall::new("shell"));
//! assert!(state.message.contains("shell"));
//! assert!(approvals.handle_reply("session-1", "确认").is_approved());
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

/// Error types and results for the approval module.
pub mod error;
pub mod manager;
pub mod permission;

pub use error::{ApprovalError, ApprovalResult};
pub use manager::{ApprovalConfig, ApprovalManager, ApprovalReply, ApprovalState, ApprovalStatus};
pub use permission::{PermissionCheck, PermissionChecker, PermissionConfig};
