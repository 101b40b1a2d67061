//! Permission tiers - which tools may run, and how.
//!
//! The [`PermissionChecker`] is the admin-configured layer of the tool
//! security model. It performs no I/O.
//!
//! # Check Order
//!
//! 1. Is the tool in the deny list? -> `deny`
//! 2. Is the tool in the confirm list? -> `confirm`
//! 3. Is the tool in the safe list? -> `safe`
//! 4. Otherwise -> `deny` (default-closed)
//!
//! [`PermissionChecker::check`] additionally applies the role whitelist: when
//! one is configured, any tool missing from it is denied regardless of tier.

use persona_core::PermissionLevel;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{PoisonError, RwLock};
use tracing::debug;

/// Permission lists as they appear in configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PermissionConfig {
    /// Tools executed automatically.
    pub safe: Vec<String>,
    /// Tools that require human confirmation.
    pub confirm: Vec<String>,
    /// Tools that never run.
    pub deny: Vec<String>,
    /// If set, only these tools may run for the current role.
    pub role_allowed_tools: Option<Vec<String>>,
}

/// Result of [`PermissionChecker::check`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionCheck {
    /// Whether the call may proceed (possibly after approval).
    pub allowed: bool,
    /// Effective tier.
    pub level: PermissionLevel,
    /// Human-readable explanation.
    pub reason: String,
}

impl PermissionCheck {
    /// Whether the call must wait for a human.
    #[must_use]
    pub fn requires_approval(&self) -> bool {
        self.allowed && self.level == PermissionLevel::Confirm
    }
}

#[derive(Debug, Default)]
struct Tiers {
    safe: HashSet<String>,
    confirm: HashSet<String>,
    deny: HashSet<String>,
    role_allowed: Option<HashSet<String>>,
}

impl Tiers {
    fn remove_everywhere(&mut self, tool: &str) {
        self.safe.remove(tool);
        self.confirm.remove(tool);
        self.deny.remove(tool);
    }

    fn insert(&mut self, tool: &str, level: PermissionLevel) {
        self.remove_everywhere(tool);
        let set = match level {
            PermissionLevel::Safe => &mut self.safe,
            PermissionLevel::Confirm => &mut self.confirm,
            PermissionLevel::Deny => &mut self.deny,
        };
        set.insert(tool.to_string());
    }
}

/// Classifies tool names into permission tiers.
///
/// Safe for concurrent use: reads share a lock, tier edits take it
/// exclusively.
#[derive(Debug, Default)]
pub struct PermissionChecker {
    tiers: RwLock<Tiers>,
}

impl PermissionChecker {
    /// Build a checker from configuration.
    ///
    /// A tool listed in several tiers ends up in the most restrictive one.
    #[must_use]
    pub fn new(config: &PermissionConfig) -> Self {
        let mut tiers = Tiers::default();
        for tool in &config.safe {
            tiers.insert(tool, PermissionLevel::Safe);
        }
        for tool in &config.confirm {
            tiers.insert(tool, PermissionLevel::Confirm);
        }
        for tool in &config.deny {
            tiers.insert(tool, PermissionLevel::Deny);
        }
        tiers.role_allowed = config
            .role_allowed_tools
            .as_ref()
            .map(|tools| tools.iter().cloned().collect());

        Self {
            tiers: RwLock::new(tiers),
        }
    }

    /// Base tier of a tool, ignoring the role whitelist.
    #[must_use]
    pub fn level(&self, tool: &str) -> PermissionLevel {
        let tiers = self.tiers.read().unwrap_or_else(PoisonError::into_inner);
        if tiers.deny.contains(tool) {
            PermissionLevel::Deny
        } else if tiers.confirm.contains(tool) {
            PermissionLevel::Confirm
        } else if tiers.safe.contains(tool) {
            PermissionLevel::Safe
        } else {
            PermissionLevel::Deny
        }
    }

    /// Full check including the role whitelist.
    #[must_use]
    pub fn check(&self, tool: &str) -> PermissionCheck {
        let tiers = self.tiers.read().unwrap_or_else(PoisonError::into_inner);

        if let Some(allowed) = &tiers.role_allowed
            && !allowed.contains(tool)
        {
            return PermissionCheck {
                allowed: false,
                level: PermissionLevel::Deny,
                reason: format!("tool '{tool}' is not allowed for the current role"),
            };
        }

        let (level, reason) = if tiers.deny.contains(tool) {
            (
                PermissionLevel::Deny,
                format!("tool '{tool}' is denied by policy"),
            )
        } else if tiers.confirm.contains(tool) {
            (
                PermissionLevel::Confirm,
                format!("tool '{tool}' requires user confirmation"),
            )
        } else if tiers.safe.contains(tool) {
            (
                PermissionLevel::Safe,
                format!("tool '{tool}' is allowed"),
            )
        } else {
            (
                PermissionLevel::Deny,
                format!("tool '{tool}' is not in any permission list and is denied by default"),
            )
        };

        PermissionCheck {
            allowed: level != PermissionLevel::Deny,
            level,
            reason,
        }
    }

    /// Move a tool into the safe tier.
    pub fn add_safe_tool(&self, tool: &str) {
        self.set_level(tool, PermissionLevel::Safe);
    }

    /// Move a tool into the confirm tier.
    pub fn add_confirm_tool(&self, tool: &str) {
        self.set_level(tool, PermissionLevel::Confirm);
    }

    /// Move a tool into the deny tier.
    pub fn add_deny_tool(&self, tool: &str) {
        self.set_level(tool, PermissionLevel::Deny);
    }

    /// Move a tool into `level`, removing it from the other two tiers.
    pub fn set_level(&self, tool: &str, level: PermissionLevel) {
        let mut tiers = self.tiers.write().unwrap_or_else(PoisonError::into_inner);
        tiers.insert(tool, level);
        debug!(tool, level = %level, "permission tier updated");
    }

    /// Remove a tool from every tier (it falls back to default-deny).
    pub fn remove_tool(&self, tool: &str) {
        let mut tiers = self.tiers.write().unwrap_or_else(PoisonError::into_inner);
        tiers.remove_everywhere(tool);
    }

    /// Replace the role whitelist. `None` disables it.
    pub fn set_role_allowed_tools(&self, tools: Option<Vec<String>>) {
        let mut tiers = self.tiers.write().unwrap_or_else(PoisonError::into_inner);
        tiers.role_allowed = tools.map(|t| t.into_iter().collect());
    }

    /// Tools currently in a tier, sorted.
    #[must_use]
    pub fn tools_in(&self, level: PermissionLevel) -> Vec<String> {
        let tiers = self.tiers.read().unwrap_or_else(PoisonError::into_inner);
        let set = match level {
            PermissionLevel::Safe => &tiers.safe,
            PermissionLevel::Confirm => &tiers.confirm,
            PermissionLevel::Deny => &tiers.deny,
        };
        let mut tools: Vec<String> = set.iter().cloned().collect();
        tools.sort();
        tools
    }
}
