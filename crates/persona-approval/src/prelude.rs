//! Prelude module - commonly used types for convenient import.
//!
//! Use `use persona_approval::prelude::*;` to import all essential types.

pub use crate::{ApprovalError, ApprovalResult};
pub use crate::{ApprovalConfig, ApprovalManager, ApprovalReply, ApprovalState, ApprovalStatus};
pub use crate::{PermissionCheck, PermissionChecker, PermissionConfig};
