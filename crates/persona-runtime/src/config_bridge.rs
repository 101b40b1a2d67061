//! Bridge from `persona_config::Config` to domain types.
//!
//! The config crate has no dependencies on other internal crates. This
//! module translates its sections into the types used by the orchestrator,
//! permission checker, approval manager, sandbox, remote bridge, model
//! provider and logging, so the conversion happens exactly once.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use persona_approval::{ApprovalConfig, ApprovalManager, PermissionChecker, PermissionConfig};
use persona_config::{Config, ServerSection};
use persona_core::PermissionLevel;
use persona_llm::OpenAiCompatProvider;
use persona_mcp::{McpBridge, ServerConfig};
use persona_sandbox::{SandboxConfig, SandboxExecutor};
use persona_telemetry::{LogConfig, LogFormat, LogTarget};
use persona_tools::{ToolOrigin, ToolRegistry};
use tracing::{info, warn};

use crate::collaborators::{KeywordClassifier, MemoryEngine, PersonaEngine};
use crate::error::{RuntimeError, RuntimeResult};
use crate::orchestrator::{Orchestrator, OrchestratorConfig};

/// Convert config to [`OrchestratorConfig`].
#[must_use]
pub fn to_orchestrator_config(cfg: &Config) -> OrchestratorConfig {
    OrchestratorConfig {
        max_context_messages: cfg.orchestrator.max_context_messages,
        max_retries: cfg.orchestrator.max_retries,
        max_tool_iterations: cfg.orchestrator.max_tool_iterations,
        strict_persona: cfg.orchestrator.strict_persona,
        temperature: Some(cfg.model.temperature),
        max_tokens: Some(cfg.model.max_tokens),
    }
}

/// Convert config to [`PermissionConfig`].
#[must_use]
pub fn to_permission_config(cfg: &Config) -> PermissionConfig {
    PermissionConfig {
        safe: cfg.permissions.safe.clone(),
        confirm: cfg.permissions.confirm.clone(),
        deny: cfg.permissions.deny.clone(),
        role_allowed_tools: cfg.permissions.role_allowed_tools.clone(),
    }
}

/// Convert config to [`ApprovalConfig`].
#[must_use]
pub fn to_approval_config(cfg: &Config) -> ApprovalConfig {
    ApprovalConfig {
        timeout_ms: cfg.approval.timeout_ms,
        confirm_keywords: cfg.approval.confirm_keywords.clone(),
        cancel_keywords: cfg.approval.cancel_keywords.clone(),
    }
}

/// Convert config to [`SandboxConfig`].
#[must_use]
pub fn to_sandbox_config(cfg: &Config) -> SandboxConfig {
    let s = &cfg.sandbox;
    SandboxConfig {
        image: s.image.clone(),
        memory_limit_bytes: s.memory_limit_bytes,
        cpu_limit_cores: s.cpu_limit_cores,
        network_disabled: s.network_disabled,
        work_dir: s.work_dir.clone(),
        timeout_ms: s.timeout_ms,
        user: s.user.clone(),
        read_only_root: s.read_only_root,
        engine_url: s.engine_url.clone(),
        api_version: s.api_version.clone(),
    }
}

/// Convert the `[servers]` table to bridge server configs.
#[must_use]
pub fn to_server_configs(cfg: &Config) -> HashMap<String, ServerConfig> {
    cfg.servers
        .iter()
        .map(|(name, section)| {
            let server = ServerConfig {
                command: section.command.clone(),
                args: section.args.clone(),
                env: section.env.clone(),
                cwd: section.cwd.as_ref().map(PathBuf::from),
            };
            (name.clone(), server)
        })
        .collect()
}

/// Permission tier for tools discovered on a server.
///
/// Unknown tier names fall back to `confirm`.
#[must_use]
pub fn server_tier(section: &ServerSection) -> PermissionLevel {
    section.tier.parse().unwrap_or_else(|_| {
        warn!(tier = %section.tier, "Unknown server tier, using confirm");
        PermissionLevel::Confirm
    })
}

/// Convert the `[logging]` section to [`LogConfig`].
///
/// # Errors
///
/// Returns [`RuntimeError::Config`] for an unknown format or target, or a
/// file target without a directory.
pub fn to_log_config(cfg: &Config) -> RuntimeResult<LogConfig> {
    let l = &cfg.logging;
    let format: LogFormat = l
        .format
        .parse()
        .map_err(|e: persona_telemetry::TelemetryError| RuntimeError::Config(e.to_string()))?;

    let mut log = LogConfig::new(&l.level).with_format(format);
    log = match l.target.as_str() {
        "stdout" => log.with_target(LogTarget::Stdout),
        "stderr" => log.with_target(LogTarget::Stderr),
        "file" => {
            let dir = l.directory.as_deref().ok_or_else(|| {
                RuntimeError::Config("logging.directory is required for the file target".into())
            })?;
            log.with_file_logging(dir, &l.file_prefix)
        },
        other => {
            return Err(RuntimeError::Config(format!(
                "unknown logging target '{other}'"
            )));
        },
    };
    for directive in &l.directives {
        log = log.with_directive(directive);
    }
    Ok(log)
}

/// Build the chat model from the `[model]` section.
///
/// # Errors
///
/// Returns [`RuntimeError::Config`] when the provider is unknown, the
/// `openai` provider has no API key, or `local`/`custom` has no URL.
pub fn to_model_provider(cfg: &Config) -> RuntimeResult<OpenAiCompatProvider> {
    let m = &cfg.model;
    let provider = match m.provider.as_str() {
        "openai" => {
            let key = m.api_key.as_deref().ok_or_else(|| {
                RuntimeError::Config("model.api_key is required for the openai provider".into())
            })?;
            OpenAiCompatProvider::openai(key, &m.model)
        },
        "local" | "custom" => {
            let url = m.api_url.as_deref().ok_or_else(|| {
                RuntimeError::Config(format!("model.api_url is required for '{}'", m.provider))
            })?;
            if m.provider == "local" {
                OpenAiCompatProvider::local(url, &m.model)
            } else {
                OpenAiCompatProvider::custom(url, m.api_key.as_deref(), &m.model)
            }
        },
        other => {
            return Err(RuntimeError::Config(format!(
                "unknown model provider '{other}'"
            )));
        },
    };
    Ok(provider
        .with_max_tokens(m.max_tokens)
        .with_temperature(m.temperature))
}

/// Build the task keyword classifier.
#[must_use]
pub fn to_classifier(cfg: &Config) -> KeywordClassifier {
    KeywordClassifier::new(cfg.orchestrator.task_keywords.iter().cloned())
}

/// Build an empty tool registry with the sandbox and remote bridge attached
/// as configured.
///
/// # Errors
///
/// Returns [`RuntimeError::Config`] if the sandbox is enabled with an
/// unusable engine URL.
pub fn build_registry(cfg: &Config) -> RuntimeResult<ToolRegistry> {
    let mut registry = ToolRegistry::new();

    if cfg.sandbox.enabled {
        let sandbox = SandboxExecutor::docker(to_sandbox_config(cfg))?;
        info!(
            image = %cfg.sandbox.image,
            engine = %cfg.sandbox.engine_url,
            "Sandbox enabled for confirm-tier tools"
        );
        registry = registry.with_sandbox(Arc::new(sandbox));
    }

    if !cfg.servers.is_empty() {
        let bridge = McpBridge::with_servers(to_server_configs(cfg));
        registry = registry.with_bridge(Arc::new(bridge));
    }

    Ok(registry)
}

/// Discover tools on every configured server and register them.
///
/// Discovered tools not already in a permission tier are added at the
/// server's tier. A server that fails to answer is skipped with a warning.
/// Returns the number of tools registered.
pub async fn discover_remote_tools(
    cfg: &Config,
    registry: &ToolRegistry,
    permissions: &PermissionChecker,
) -> usize {
    let mut total: usize = 0;
    let mut names: Vec<&String> = cfg.servers.keys().collect();
    names.sort();

    for name in names {
        let Some(section) = cfg.servers.get(name) else {
            continue;
        };
        let tier = server_tier(section);
        match registry.discover_remote(name, tier).await {
            Ok(count) => {
                let listed: Vec<String> = [
                    PermissionLevel::Safe,
                    PermissionLevel::Confirm,
                    PermissionLevel::Deny,
                ]
                .into_iter()
                .flat_map(|level| permissions.tools_in(level))
                .collect();
                for def in registry.definitions().await {
                    let from_server =
                        matches!(&def.origin, ToolOrigin::Remote { server } if server == name);
                    if from_server && !listed.contains(&def.name) {
                        permissions.set_level(&def.name, tier);
                    }
                }
                info!(server = %name, tools = count, tier = tier.as_str(), "Remote tools registered");
                total = total.saturating_add(count);
            },
            Err(e) => warn!(server = %name, error = %e, "Remote tool discovery failed"),
        }
    }
    total
}

/// Assemble an orchestrator from a loaded config.
///
/// Wires the model, permission tiers, approval manager (plus the expiry
/// sweep when `approval.sweep_interval_ms > 0`), the sandbox, remote tools
/// and classifier. Local tools can be registered on
/// [`Orchestrator::registry`] afterwards.
///
/// # Errors
///
/// Returns [`RuntimeError::Config`] if the model or sandbox cannot be built.
pub async fn build_orchestrator(
    cfg: &Config,
    persona: Arc<dyn PersonaEngine>,
    memory: Arc<dyn MemoryEngine>,
) -> RuntimeResult<Orchestrator> {
    let model = to_model_provider(cfg)?;
    let registry = build_registry(cfg)?;
    let permissions = PermissionChecker::new(&to_permission_config(cfg));
    discover_remote_tools(cfg, &registry, &permissions).await;

    let approvals = Arc::new(ApprovalManager::new(to_approval_config(cfg)));
    if cfg.approval.sweep_interval_ms > 0 {
        let interval = Duration::from_millis(cfg.approval.sweep_interval_ms);
        let _sweep = approvals.spawn_expiry_sweep(interval);
        info!(interval_ms = cfg.approval.sweep_interval_ms, "Approval expiry sweep started");
    }

    Ok(
        Orchestrator::new(Arc::new(model), persona, memory, to_orchestrator_config(cfg))
            .with_classifier(Arc::new(to_classifier(cfg)))
            .with_registry(Arc::new(registry))
            .with_permissions(Arc::new(permissions))
            .with_approvals(approvals),
    )
}
