//! Sandbox configuration, requests and results.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::error::SandboxError;

/// Exit code reported for a run killed on timeout (128 + SIGKILL).
pub const TIMEOUT_EXIT_CODE: i64 = 137;

/// Default memory ceiling (256 MiB).
pub const DEFAULT_MEMORY_LIMIT_BYTES: u64 = 256 * 1024 * 1024;

/// Settings applied to every sandboxed run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    /// Container image.
    pub image: String,
    /// Memory ceiling in bytes.
    pub memory_limit_bytes: u64,
    /// CPU quota in cores (fractions allowed).
    pub cpu_limit_cores: f64,
    /// Disable networking entirely.
    pub network_disabled: bool,
    /// Default working directory inside the container.
    pub work_dir: String,
    /// Default per-run timeout in milliseconds.
    pub timeout_ms: u64,
    /// Non-root user the command runs as.
    pub user: String,
    /// Mount the root filesystem read-only.
    pub read_only_root: bool,
    /// Container engine endpoint.
    ///
    /// Must be `http://` or `https://`. The engine's default Unix socket
    /// (`/var/run/docker.sock`) is not reachable directly; expose the engine
    /// on TCP (`dockerd -H tcp://127.0.0.1:2375`) or put a socket proxy in
    /// front of it.
    pub engine_url: String,
    /// Container engine API version path segment.
    pub api_version: String,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            image: "alpine:3.20".to_string(),
            memory_limit_bytes: DEFAULT_MEMORY_LIMIT_BYTES,
            cpu_limit_cores: 0.5,
            network_disabled: true,
            work_dir: "/workspace".to_string(),
            timeout_ms: 30_000,
            user: "65534:65534".to_string(),
            read_only_root: true,
            engine_url: "http://127.0.0.1:2375".to_string(),
            api_version: "v1.43".to_string(),
        }
    }
}

impl SandboxConfig {
    /// Default timeout as a [`Duration`].
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// CPU quota in the engine's nano-CPU unit.
    #[must_use]
    pub fn nano_cpus(&self) -> i64 {
        // Clamped to a sane range before the cast.
        #[allow(
            clippy::arithmetic_side_effects,
            clippy::cast_possible_truncation
        )]
        let nanos = (self.cpu_limit_cores.clamp(0.0, 1024.0) * 1e9).round() as i64;
        nanos
    }
}

/// A bind mount: `host:container[:ro|:rw]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeSpec {
    /// Absolute path on the host.
    pub host: PathBuf,
    /// Absolute path inside the container.
    pub container: String,
    /// Mount read-only.
    pub read_only: bool,
}

impl VolumeSpec {
    /// Create a read-write mount.
    pub fn new(host: impl Into<PathBuf>, container: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            container: container.into(),
            read_only: false,
        }
    }

    /// Make the mount read-only.
    #[must_use]
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Render as an engine `Binds` entry.
    #[must_use]
    pub fn to_bind(&self) -> String {
        let mode = if self.read_only { "ro" } else { "rw" };
        format!("{}:{}:{mode}", self.host.display(), self.container)
    }
}

impl fmt::Display for VolumeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_bind())
    }
}

impl FromStr for VolumeSpec {
    type Err = SandboxError;

    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| SandboxError::InvalidVolume {
            spec: spec.to_string(),
            reason: reason.to_string(),
        };

        let parts: Vec<&str> = spec.split(':').collect();
        let (host, container, read_only) = match parts.as_slice() {
            [host, container] => (*host, *container, false),
            [host, container, "ro"] => (*host, *container, true),
            [host, container, "rw"] => (*host, *container, false),
            [_, _, mode] => return Err(invalid(&format!("unknown mode '{mode}'"))),
            _ => return Err(invalid("expected host:container[:ro|:rw]")),
        };

        if !Path::new(host).is_absolute() {
            return Err(invalid("host path must be absolute"));
        }
        if !container.starts_with('/') {
            return Err(invalid("container path must be absolute"));
        }

        Ok(Self {
            host: PathBuf::from(host),
            container: container.to_string(),
            read_only,
        })
    }
}

/// One command to run in the sandbox.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecRequest {
    /// Shell command, run with `sh -c`.
    pub command: String,
    /// Extra environment variables.
    pub env: BTreeMap<String, String>,
    /// Bind mounts.
    pub volumes: Vec<VolumeSpec>,
    /// Working directory override.
    pub work_dir: Option<String>,
    /// Timeout override.
    pub timeout: Option<Duration>,
}

impl ExecRequest {
    /// Create a request for `command`.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Self::default()
        }
    }

    /// Set an environment variable.
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Add a bind mount.
    #[must_use]
    pub fn with_volume(mut self, volume: VolumeSpec) -> Self {
        self.volumes.push(volume);
        self
    }

    /// Override the working directory.
    #[must_use]
    pub fn with_work_dir(mut self, work_dir: impl Into<String>) -> Self {
        self.work_dir = Some(work_dir.into());
        self
    }

    /// Override the timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Everything needed to create one container.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerSpec {
    /// Image to run.
    pub image: String,
    /// Shell command.
    pub command: String,
    /// `KEY=VALUE` environment entries.
    pub env: Vec<String>,
    /// Working directory.
    pub work_dir: String,
    /// User to run as.
    pub user: String,
    /// Memory ceiling in bytes.
    pub memory_limit_bytes: u64,
    /// CPU quota in nano-CPUs.
    pub nano_cpus: i64,
    /// Disable networking.
    pub network_disabled: bool,
    /// Read-only root filesystem.
    pub read_only_root: bool,
    /// Bind mounts.
    pub volumes: Vec<VolumeSpec>,
}

impl ContainerSpec {
    /// Combine fixed settings with a per-run request.
    #[must_use]
    pub fn from_request(config: &SandboxConfig, request: &ExecRequest) -> Self {
        Self {
            image: config.image.clone(),
            command: request.command.clone(),
            env: request
                .env
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect(),
            work_dir: request
                .work_dir
                .clone()
                .unwrap_or_else(|| config.work_dir.clone()),
            user: config.user.clone(),
            memory_limit_bytes: config.memory_limit_bytes,
            nano_cpus: config.nano_cpus(),
            network_disabled: config.network_disabled,
            read_only_root: config.read_only_root,
            volumes: request.volumes.clone(),
        }
    }
}

/// Raw outcome of a sandboxed run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SandboxResult {
    /// Process exit code (137 when killed on timeout).
    pub exit_code: i64,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
    /// Wall-clock time from container creation to result.
    pub latency_ms: u64,
    /// Whether the run was killed on timeout.
    pub timed_out: bool,
}

impl SandboxResult {
    /// Whether the command completed with exit code 0.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        !self.timed_out && self.exit_code == 0
    }
}
