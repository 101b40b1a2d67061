//! Docker Engine API client.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use crate::backend::ContainerApi;
use crate::error::{IsolationResult, SandboxError};
use crate::types::{ContainerSpec, SandboxConfig};

/// Size of the scratch `tmpfs` mounted at `/tmp` when the root is read-only.
const TMPFS_OPTIONS: &str = "rw,size=64m";

/// Talks to a Docker-compatible engine over its HTTP API.
#[derive(Debug, Clone)]
pub struct DockerEngine {
    client: Client,
    base_url: String,
}

#[derive(Deserialize)]
struct CreateResponse {
    #[serde(rename = "Id")]
    id: String,
}

#[derive(Deserialize)]
struct WaitResponse {
    #[serde(rename = "StatusCode")]
    status_code: i64,
}

impl DockerEngine {
    /// Create a client for `engine_url` (e.g. `http://127.0.0.1:2375`) and API
    /// version (e.g. `v1.43`).
    pub fn new(engine_url: &str, api_version: &str) -> Self {
        let base = engine_url.trim_end_matches('/');
        let version = api_version.trim_matches('/');
        let base_url = if version.is_empty() {
            base.to_string()
        } else {
            format!("{base}/{version}")
        };
        Self {
            client: Client::new(),
            base_url,
        }
    }

    /// Create a client from sandbox settings.
    #[must_use]
    pub fn from_config(config: &SandboxConfig) -> Self {
        Self::new(&config.engine_url, &config.api_version)
    }

    /// Base URL including the version segment.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Build the `/containers/create` body.
    #[must_use]
    pub fn create_body(spec: &ContainerSpec) -> Value {
        let binds: Vec<String> = spec.volumes.iter().map(crate::VolumeSpec::to_bind).collect();
        let mut host_config = json!({
            "Memory": spec.memory_limit_bytes,
            "NanoCpus": spec.nano_cpus,
            "ReadonlyRootfs": spec.read_only_root,
            "Binds": binds,
        });
        if spec.network_disabled {
            host_config["NetworkMode"] = json!("none");
        }
        if spec.read_only_root {
            host_config["Tmpfs"] = json!({ "/tmp": TMPFS_OPTIONS });
        }

        json!({
            "Image": spec.image,
            "Cmd": ["sh", "-c", spec.command],
            "Env": spec.env,
            "WorkingDir": spec.work_dir,
            "User": spec.user,
            "NetworkDisabled": spec.network_disabled,
            "AttachStdout": true,
            "AttachStderr": true,
            "Tty": false,
            "HostConfig": host_config,
        })
    }

    async fn check(operation: &'static str, response: Response) -> IsolationResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| v.get("message").and_then(Value::as_str).map(String::from))
            .unwrap_or(body);
        Err(SandboxError::Api {
            operation,
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl ContainerApi for DockerEngine {
    async fn create(&self, spec: &ContainerSpec) -> IsolationResult<String> {
        let response = self
            .client
            .post(self.url("/containers/create"))
            .json(&Self::create_body(spec))
            .send()
            .await?;
        let created: CreateResponse = Self::check("create", response)
            .await?
            .json()
            .await
            .map_err(|e| SandboxError::InvalidResponse(e.to_string()))?;
        Ok(created.id)
    }

    async fn start(&self, id: &str) -> IsolationResult<()> {
        let response = self
            .client
            .post(self.url(&format!("/containers/{id}/start")))
            .send()
            .await?;
        Self::check("start", response).await?;
        Ok(())
    }

    async fn wait(&self, id: &str) -> IsolationResult<i64> {
        let response = self
            .client
            .post(self.url(&format!("/containers/{id}/wait")))
            .send()
            .await?;
        let waited: WaitResponse = Self::check("wait", response)
            .await?
            .json()
            .await
            .map_err(|e| SandboxError::InvalidResponse(e.to_string()))?;
        Ok(waited.status_code)
    }

    async fn kill(&self, id: &str) -> IsolationResult<()> {
        let response = self
            .client
            .post(self.url(&format!("/containers/{id}/kill")))
            .send()
            .await?;
        // 409: already stopped
        if response.status() == StatusCode::CONFLICT {
            debug!(container_id = id, "container already stopped");
            return Ok(());
        }
        Self::check("kill", response).await?;
        Ok(())
    }

    async fn logs(&self, id: &str) -> IsolationResult<Vec<u8>> {
        let response = self
            .client
            .get(self.url(&format!("/containers/{id}/logs")))
            .query(&[("stdout", "true"), ("stderr", "true")])
            .send()
            .await?;
        let bytes = Self::check("logs", response).await?.bytes().await?;
        Ok(bytes.to_vec())
    }

    async fn remove(&self, id: &str) -> IsolationResult<()> {
        let response = self
            .client
            .delete(self.url(&format!("/containers/{id}")))
            .query(&[("force", "true")])
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        Self::check("remove", response).await?;
        Ok(())
    }
}
