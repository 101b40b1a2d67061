//! Post-merge configuration validation.
//!
//! Checks value ranges and cross-field invariants on a deserialized
//! [`Config`](crate::Config).

use std::collections::HashMap;

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

/// Smallest memory ceiling a sandboxed container may be given (4 MiB).
const MIN_SANDBOX_MEMORY_BYTES: u64 = 4 * 1024 * 1024;

/// Validate a fully merged and deserialized configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_model(config)?;
    validate_orchestrator(config)?;
    validate_permissions(config)?;
    validate_approval(config)?;
    validate_sandbox(config)?;
    validate_servers(config)?;
    validate_logging(config)?;
    Ok(())
}

fn validate_model(config: &Config) -> ConfigResult<()> {
    let m = &config.model;

    if !matches!(m.provider.as_str(), "openai" | "local" | "custom") {
        return Err(ConfigError::invalid(
            "model.provider",
            format!(
                "unsupported provider '{}'; expected one of: openai, local, custom",
                m.provider
            ),
        ));
    }

    if m.model.trim().is_empty() {
        return Err(ConfigError::invalid("model.model", "model name is empty"));
    }

    if matches!(m.provider.as_str(), "local" | "custom")
        && m.api_url.as_deref().is_none_or(|u| u.trim().is_empty())
    {
        return Err(ConfigError::invalid(
            "model.api_url",
            format!("provider '{}' requires api_url", m.provider),
        ));
    }

    if !m.temperature.is_finite() || !(0.0..=2.0).contains(&m.temperature) {
        return Err(ConfigError::invalid(
            "model.temperature",
            format!(
                "temperature {} is out of range; must be between 0.0 and 2.0",
                m.temperature
            ),
        ));
    }

    if m.max_tokens == 0 {
        return Err(ConfigError::invalid(
            "model.max_tokens",
            "max_tokens must be at least 1",
        ));
    }

    Ok(())
}

fn validate_orchestrator(config: &Config) -> ConfigResult<()> {
    let o = &config.orchestrator;
    if o.max_tool_iterations == 0 {
        return Err(ConfigError::invalid(
            "orchestrator.max_tool_iterations",
            "max_tool_iterations must be at least 1",
        ));
    }
    if o.max_context_messages == 0 {
        return Err(ConfigError::invalid(
            "orchestrator.max_context_messages",
            "max_context_messages must be at least 1",
        ));
    }
    Ok(())
}

fn validate_permissions(config: &Config) -> ConfigResult<()> {
    let p = &config.permissions;
    let mut seen: HashMap<&str, &str> = HashMap::new();
    for (tier, tools) in [("safe", &p.safe), ("confirm", &p.confirm), ("deny", &p.deny)] {
        for tool in tools {
            if let Some(previous) = seen.insert(tool.as_str(), tier)
                && previous != tier
            {
                return Err(ConfigError::invalid(
                    &format!("permissions.{tier}"),
                    format!("tool '{tool}' is listed in both '{previous}' and '{tier}'"),
                ));
            }
        }
    }
    Ok(())
}

fn validate_approval(config: &Config) -> ConfigResult<()> {
    let a = &config.approval;
    if a.timeout_ms == 0 {
        return Err(ConfigError::invalid(
            "approval.timeout_ms",
            "timeout_ms must be greater than zero",
        ));
    }
    if a.confirm_keywords.iter().all(|k| k.trim().is_empty()) {
        return Err(ConfigError::invalid(
            "approval.confirm_keywords",
            "at least one confirm keyword is required",
        ));
    }
    if a.cancel_keywords.iter().all(|k| k.trim().is_empty()) {
        return Err(ConfigError::invalid(
            "approval.cancel_keywords",
            "at least one cancel keyword is required",
        ));
    }
    Ok(())
}

fn validate_sandbox(config: &Config) -> ConfigResult<()> {
    let s = &config.sandbox;
    if !s.cpu_limit_cores.is_finite() || s.cpu_limit_cores <= 0.0 {
        return Err(ConfigError::invalid(
            "sandbox.cpu_limit_cores",
            "cpu_limit_cores must be a finite positive number",
        ));
    }
    if s.memory_limit_bytes < MIN_SANDBOX_MEMORY_BYTES {
        return Err(ConfigError::invalid(
            "sandbox.memory_limit_bytes",
            format!("memory_limit_bytes must be at least {MIN_SANDBOX_MEMORY_BYTES}"),
        ));
    }
    if s.timeout_ms == 0 {
        return Err(ConfigError::invalid(
            "sandbox.timeout_ms",
            "timeout_ms must be greater than zero",
        ));
    }
    if s.image.trim().is_empty() {
        return Err(ConfigError::invalid("sandbox.image", "image is empty"));
    }
    if !s.work_dir.starts_with('/') {
        return Err(ConfigError::invalid(
            "sandbox.work_dir",
            "work_dir must be an absolute container path",
        ));
    }
    if !(s.engine_url.starts_with("http://") || s.engine_url.starts_with("https://")) {
        return Err(ConfigError::invalid(
            "sandbox.engine_url",
            format!("engine_url '{}' must be an http(s) URL", s.engine_url),
        ));
    }
    Ok(())
}

fn validate_servers(config: &Config) -> ConfigResult<()> {
    for (name, server) in &config.servers {
        if server.command.trim().is_empty() {
            return Err(ConfigError::invalid(
                &format!("servers.{name}.command"),
                "server command is empty",
            ));
        }
        if !matches!(server.tier.as_str(), "safe" | "confirm" | "deny") {
            return Err(ConfigError::invalid(
                &format!("servers.{name}.tier"),
                format!(
                    "unknown tier '{}'; expected one of: safe, confirm, deny",
                    server.tier
                ),
            ));
        }
    }
    Ok(())
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    let l = &config.logging;
    if !matches!(
        l.level.to_ascii_lowercase().as_str(),
        "trace" | "debug" | "info" | "warn" | "error"
    ) {
        return Err(ConfigError::invalid(
            "logging.level",
            format!("unknown level '{}'", l.level),
        ));
    }
    if !matches!(l.format.as_str(), "pretty" | "compact" | "json" | "full") {
        return Err(ConfigError::invalid(
            "logging.format",
            format!("unknown format '{}'", l.format),
        ));
    }
    if !matches!(l.target.as_str(), "stdout" | "stderr" | "file") {
        return Err(ConfigError::invalid(
            "logging.target",
            format!("unknown target '{}'", l.target),
        ));
    }
    if l.target == "file" && l.directory.as_deref().is_none_or(|d| d.trim().is_empty()) {
        return Err(ConfigError::invalid(
            "logging.directory",
            "the file target requires a directory",
        ));
    }
    Ok(())
}
