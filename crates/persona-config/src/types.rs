//! Configuration types for the persona runtime.
//!
//! All types in this module are self-contained with no dependencies on other
//! internal persona crates. Domain types are mirrored here and converted at
//! the boundary. Every struct implements [`Default`] matching `defaults.toml`
//! so that a bare `[section]` header in TOML produces a working
//! configuration.

use std::collections::HashMap;

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root configuration for the persona runtime.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Model endpoint selection.
    pub model: ModelConfig,
    /// Turn pipeline limits.
    pub orchestrator: OrchestratorSection,
    /// Permission tiers.
    pub permissions: PermissionsSection,
    /// Human approval behaviour.
    pub approval: ApprovalSection,
    /// Sandboxed execution.
    pub sandbox: SandboxSection,
    /// Named remote tool servers.
    pub servers: HashMap<String, ServerSection>,
    /// Logging output.
    pub logging: LoggingSection,
}

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

/// Model endpoint selection.
#[derive(Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// `openai`, `local` or `custom`.
    pub provider: String,
    /// Model name.
    pub model: String,
    /// API key.
    pub api_key: Option<String>,
    /// Base URL for `local` and `custom` providers.
    pub api_url: Option<String>,
    /// Output token limit.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_owned(),
            model: "gpt-4o-mini".to_owned(),
            api_key: None,
            api_url: None,
            max_tokens: 2048,
            temperature: 0.7,
        }
    }
}

impl std::fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("has_api_key", &self.api_key.is_some())
            .field("api_url", &self.api_url)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .finish()
    }
}

impl Serialize for ModelConfig {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ModelConfig", 5)?;
        state.serialize_field("provider", &self.provider)?;
        state.serialize_field("model", &self.model)?;
        // api_key is never written back out.
        state.serialize_field("api_url", &self.api_url)?;
        state.serialize_field("max_tokens", &self.max_tokens)?;
        state.serialize_field("temperature", &self.temperature)?;
        state.end()
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Turn pipeline limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorSection {
    /// Recent messages loaded into each turn.
    pub max_context_messages: usize,
    /// Persona regeneration attempts per turn.
    pub max_retries: u32,
    /// Tool-calling rounds per turn.
    pub max_tool_iterations: u32,
    /// Fail the turn instead of falling through once retries run out.
    pub strict_persona: bool,
    /// Input fragments that route a turn to the task agent.
    pub task_keywords: Vec<String>,
}

impl Default for OrchestratorSection {
    fn default() -> Self {
        Self {
            max_context_messages: 20,
            max_retries: 2,
            max_tool_iterations: 5,
            strict_persona: false,
            task_keywords: [
                "帮我", "执行", "运行", "查询", "搜索", "计算", "创建", "删除", "打开", "run",
                "execute", "search", "find", "calculate", "create", "delete", "open", "list",
            ]
            .into_iter()
            .map(str::to_owned)
            .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Permissions & approval
// ---------------------------------------------------------------------------

/// Permission tier lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PermissionsSection {
    /// Executed automatically.
    pub safe: Vec<String>,
    /// Executed after human confirmation.
    pub confirm: Vec<String>,
    /// Never executed.
    pub deny: Vec<String>,
    /// Optional role whitelist.
    pub role_allowed_tools: Option<Vec<String>>,
}

impl Default for PermissionsSection {
    fn default() -> Self {
        let list = |items: &[&str]| items.iter().map(|s| (*s).to_owned()).collect();
        Self {
            safe: list(&["web_search", "get_weather", "calculator", "current_time"]),
            confirm: list(&["shell", "write_file", "send_email"]),
            deny: list(&["system_modify", "format_disk"]),
            role_allowed_tools: None,
        }
    }
}

/// Human approval behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApprovalSection {
    /// Pending approval lifetime in milliseconds.
    pub timeout_ms: u64,
    /// Reply fragments that approve.
    pub confirm_keywords: Vec<String>,
    /// Reply fragments that reject.
    pub cancel_keywords: Vec<String>,
    /// Background expiry sweep interval; `0` disables the sweep.
    pub sweep_interval_ms: u64,
}

impl Default for ApprovalSection {
    fn default() -> Self {
        let list = |items: &[&str]| items.iter().map(|s| (*s).to_owned()).collect();
        Self {
            timeout_ms: 300_000,
            confirm_keywords: list(&["确认", "好的", "yes", "confirm", "approve", "ok"]),
            cancel_keywords: list(&["取消", "拒绝", "不要", "no", "cancel", "deny", "reject"]),
            sweep_interval_ms: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Sandbox
// ---------------------------------------------------------------------------

/// Sandboxed execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxSection {
    /// Route `confirm`-tier tools into the sandbox.
    pub enabled: bool,
    /// Container image.
    pub image: String,
    /// Memory ceiling in bytes.
    pub memory_limit_bytes: u64,
    /// CPU quota in cores.
    pub cpu_limit_cores: f64,
    /// Disable networking.
    pub network_disabled: bool,
    /// Working directory inside the container.
    pub work_dir: String,
    /// Per-run timeout in milliseconds.
    pub timeout_ms: u64,
    /// Non-root user.
    pub user: String,
    /// Read-only root filesystem.
    pub read_only_root: bool,
    /// Container engine endpoint, `http(s)://` only. A Unix socket engine
    /// must be exposed over TCP or through a socket proxy.
    pub engine_url: String,
    /// Container engine API version.
    pub api_version: String,
}

impl Default for SandboxSection {
    fn default() -> Self {
        Self {
            enabled: false,
            image: "alpine:3.20".to_owned(),
            memory_limit_bytes: 268_435_456,
            cpu_limit_cores: 0.5,
            network_disabled: true,
            work_dir: "/workspace".to_owned(),
            timeout_ms: 30_000,
            user: "65534:65534".to_owned(),
            read_only_root: true,
            engine_url: "http://127.0.0.1:2375".to_owned(),
            api_version: "v1.43".to_owned(),
        }
    }
}

// ---------------------------------------------------------------------------
// Servers
// ---------------------------------------------------------------------------

/// A remote tool server launched over stdio.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Executable to run.
    pub command: String,
    /// Command-line arguments.
    pub args: Vec<String>,
    /// Environment variables passed to the server.
    pub env: HashMap<String, String>,
    /// Working directory.
    pub cwd: Option<String>,
    /// Tier given to every tool the server advertises.
    pub tier: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            command: String::new(),
            args: Vec::new(),
            env: HashMap::new(),
            cwd: None,
            tier: "confirm".to_owned(),
        }
    }
}

impl std::fmt::Debug for ServerSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let env: HashMap<&str, &str> = self.env.keys().map(|k| (k.as_str(), "***")).collect();
        f.debug_struct("ServerSection")
            .field("command", &self.command)
            .field("args", &self.args)
            .field("env", &env)
            .field("cwd", &self.cwd)
            .field("tier", &self.tier)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// Logging output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Base level: `trace`, `debug`, `info`, `warn` or `error`.
    pub level: String,
    /// `pretty`, `compact`, `json` or `full`.
    pub format: String,
    /// `stdout`, `stderr` or `file`.
    pub target: String,
    /// Directory for the `file` target.
    pub directory: Option<String>,
    /// File name prefix for the `file` target.
    pub file_prefix: String,
    /// Extra `target=level` filter directives.
    pub directives: Vec<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "compact".to_owned(),
            target: "stderr".to_owned(),
            directory: None,
            file_prefix: "persona".to_owned(),
            directives: Vec::new(),
        }
    }
}
