//! Sandbox executor: request in, [`SandboxResult`] out.

use std::sync::Arc;
use tracing::{debug, info};

use crate::backend::{ContainerBackend, IsolationBackend};
use crate::docker::DockerEngine;
use crate::error::{IsolationResult, SandboxError};
use crate::types::{ContainerSpec, ExecRequest, SandboxConfig, SandboxResult};

/// Runs commands in fresh, single-use sandboxes.
///
/// Cheap to share: the backend handle is reused across calls while every
/// call gets its own container.
#[derive(Clone)]
pub struct SandboxExecutor {
    config: SandboxConfig,
    backend: Arc<dyn IsolationBackend>,
}

impl SandboxExecutor {
    /// Create an executor over any isolation backend.
    pub fn new(config: SandboxConfig, backend: Arc<dyn IsolationBackend>) -> Self {
        Self { config, backend }
    }

    /// Create an executor that talks to the Docker engine configured in
    /// `config`.
    ///
    /// # Errors
    ///
    /// Returns [`SandboxError::InvalidConfig`] if the engine URL is not HTTP.
    pub fn docker(config: SandboxConfig) -> IsolationResult<Self> {
        if config.engine_url.starts_with("unix://") {
            return Err(SandboxError::InvalidConfig(format!(
                "engine_url '{}' is a Unix socket; expose the engine over TCP \
                 (e.g. http://127.0.0.1:2375) or through a socket proxy",
                config.engine_url
            )));
        }
        if !config.engine_url.starts_with("http://") && !config.engine_url.starts_with("https://") {
            return Err(SandboxError::InvalidConfig(format!(
                "engine_url must be an http(s) URL, got '{}'",
                config.engine_url
            )));
        }
        let backend = ContainerBackend::new(DockerEngine::from_config(&config));
        Ok(Self::new(config, Arc::new(backend)))
    }

    /// The fixed settings applied to every run.
    #[must_use]
    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    /// Run one command.
    ///
    /// Timeouts and non-zero exits are reported in the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the isolation backend fails.
    pub async fn execute(&self, request: &ExecRequest) -> IsolationResult<SandboxResult> {
        let timeout = request.timeout.unwrap_or_else(|| self.config.timeout());
        let spec = ContainerSpec::from_request(&self.config, request);

        debug!(
            backend = self.backend.name(),
            timeout_ms = timeout.as_millis(),
            volumes = spec.volumes.len(),
            "sandbox execute"
        );

        let result = self.backend.run(&spec, timeout).await?;

        info!(
            exit_code = result.exit_code,
            timed_out = result.timed_out,
            latency_ms = result.latency_ms,
            "sandbox run finished"
        );
        Ok(result)
    }
}

impl std::fmt::Debug for SandboxExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SandboxExecutor")
            .field("config", &self.config)
            .field("backend", &self.backend.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Records the spec and timeout it was asked to run.
    #[derive(Default)]
    struct RecordingBackend {
        seen: Mutex<Option<(ContainerSpec, Duration)>>,
    }

    #[async_trait]
    impl IsolationBackend for RecordingBackend {
        fn name(&self) -> &str {
            "recording"
        }

        async fn run(
            &self,
            spec: &ContainerSpec,
            timeout: Duration,
        ) -> IsolationResult<SandboxResult> {
            *self.seen.lock().unwrap() = Some((spec.clone(), timeout));
            Ok(SandboxResult {
                stdout: "done".into(),
                ..SandboxResult::default()
            })
        }
    }

    #[tokio::test]
    async fn test_execute_uses_default_timeout() {
        let backend = Arc::new(RecordingBackend::default());
        let executor = SandboxExecutor::new(SandboxConfig::default(), backend.clone());

        let result = executor.execute(&ExecRequest::new("echo hi")).await.unwrap();
        assert_eq!(result.stdout, "done");

        let (spec, timeout) = backend.seen.lock().unwrap().clone().unwrap();
        assert_eq!(spec.command, "echo hi");
        assert_eq!(timeout, Duration::from_millis(30_000));
    }

    #[tokio::test]
    async fn test_execute_honours_timeout_override() {
        let backend = Arc::new(RecordingBackend::default());
        let executor = SandboxExecutor::new(SandboxConfig::default(), backend.clone());

        executor
            .execute(&ExecRequest::new("sleep 1").with_timeout(Duration::from_millis(250)))
            .await
            .unwrap();
        let (_, timeout) = backend.seen.lock().unwrap().clone().unwrap();
        assert_eq!(timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_docker_rejects_non_http_engine() {
        let config = SandboxConfig {
            engine_url: "unix:///var/run/docker.sock".into(),
            ..SandboxConfig::default()
        };
        let Err(SandboxError::InvalidConfig(message)) = SandboxExecutor::docker(config) else {
            panic!("unix socket engine must be rejected");
        };
        assert!(message.contains("over TCP"));

        let config = SandboxConfig {
            engine_url: "tcp://127.0.0.1:2375".into(),
            ..SandboxConfig::default()
        };
        assert!(matches!(
            SandboxExecutor::docker(config),
            Err(SandboxError::InvalidConfig(_))
        ));
        assert!(SandboxExecutor::docker(SandboxConfig::default()).is_ok());
    }
}
