//! Isolation backends.
//!
//! [`IsolationBackend`] is the narrow seam the rest of the runtime sees: run
//! one command under constraints, get a [`SandboxResult`]. [`ContainerBackend`]
//! implements it on top of any [`ContainerApi`], owning the single-use
//! container lifecycle:
//!
//! ```text
//! create ─▶ start ─▶ wait ⟷ timer ─┬─▶ logs ─▶ demux ──┐
//!                                  └─▶ kill (timed out) ┴─▶ remove (always, also on drop)
//! ```

use async_trait::async_trait;
use persona_core::elapsed_ms;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::demux::demux_logs;
use crate::error::IsolationResult;
use crate::types::{ContainerSpec, SandboxResult, TIMEOUT_EXIT_CODE};

/// Runs one command in isolation.
#[async_trait]
pub trait IsolationBackend: Send + Sync {
    /// Backend name for logs.
    fn name(&self) -> &str;

    /// Run `spec` to completion or until `timeout` elapses.
    ///
    /// A timeout is reported in the result, not as an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend itself fails (unreachable engine,
    /// rejected request).
    async fn run(&self, spec: &ContainerSpec, timeout: Duration) -> IsolationResult<SandboxResult>;
}

/// Low-level container engine operations.
#[async_trait]
pub trait ContainerApi: Send + Sync {
    /// Create a container and return its ID.
    async fn create(&self, spec: &ContainerSpec) -> IsolationResult<String>;

    /// Start a created container.
    async fn start(&self, id: &str) -> IsolationResult<()>;

    /// Block until the container exits and return its exit code.
    async fn wait(&self, id: &str) -> IsolationResult<i64>;

    /// Send SIGKILL.
    async fn kill(&self, id: &str) -> IsolationResult<()>;

    /// Fetch the multiplexed stdout/stderr log stream.
    async fn logs(&self, id: &str) -> IsolationResult<Vec<u8>>;

    /// Force-remove the container.
    async fn remove(&self, id: &str) -> IsolationResult<()>;
}

#[async_trait]
impl<T: ContainerApi + ?Sized> ContainerApi for Arc<T> {
    async fn create(&self, spec: &ContainerSpec) -> IsolationResult<String> {
        (**self).create(spec).await
    }

    async fn start(&self, id: &str) -> IsolationResult<()> {
        (**self).start(id).await
    }

    async fn wait(&self, id: &str) -> IsolationResult<i64> {
        (**self).wait(id).await
    }

    async fn kill(&self, id: &str) -> IsolationResult<()> {
        (**self).kill(id).await
    }

    async fn logs(&self, id: &str) -> IsolationResult<Vec<u8>> {
        (**self).logs(id).await
    }

    async fn remove(&self, id: &str) -> IsolationResult<()> {
        (**self).remove(id).await
    }
}

/// Single-use container lifecycle over a [`ContainerApi`].
///
/// The container is removed even if the [`run`](IsolationBackend::run)
/// future is dropped part way: removal then continues on a spawned task.
#[derive(Debug, Clone)]
pub struct ContainerBackend<A> {
    api: Arc<A>,
}

impl<A: ContainerApi + 'static> ContainerBackend<A> {
    /// Wrap an engine client.
    pub fn new(api: A) -> Self {
        Self { api: Arc::new(api) }
    }

    /// The underlying engine client.
    pub fn api(&self) -> &A {
        &self.api
    }

    async fn drive(
        &self,
        id: &str,
        timeout: Duration,
        started: Instant,
    ) -> IsolationResult<SandboxResult> {
        self.api.start(id).await?;
        debug!(container_id = id, "container started");

        let Ok(waited) = tokio::time::timeout(timeout, self.api.wait(id)).await else {
            if let Err(e) = self.api.kill(id).await {
                warn!(container_id = id, error = %e, "failed to kill timed out container");
            }
            let latency_ms = elapsed_ms(started);
            warn!(
                container_id = id,
                timeout_ms = timeout.as_millis(),
                latency_ms,
                "sandboxed command timed out"
            );
            return Ok(SandboxResult {
                exit_code: TIMEOUT_EXIT_CODE,
                stdout: String::new(),
                stderr: format!("command timed out after {} ms", timeout.as_millis()),
                latency_ms,
                timed_out: true,
            });
        };

        let exit_code = waited?;
        let raw = self.api.logs(id).await?;
        let (stdout, stderr) = demux_logs(&raw);

        Ok(SandboxResult {
            exit_code,
            stdout,
            stderr,
            latency_ms: elapsed_ms(started),
            timed_out: false,
        })
    }
}

#[async_trait]
impl<A: ContainerApi + 'static> IsolationBackend for ContainerBackend<A> {
    fn name(&self) -> &str {
        "container"
    }

    async fn run(&self, spec: &ContainerSpec, timeout: Duration) -> IsolationResult<SandboxResult> {
        let started = Instant::now();
        let id = self.api.create(spec).await?;
        info!(container_id = %id, image = %spec.image, "container created");

        let guard = RemoveOnDrop {
            api: Arc::clone(&self.api),
            id: Some(id.clone()),
        };
        let outcome = self.drive(&id, timeout, started).await;
        guard.disarm();

        remove_container(self.api.as_ref(), &id).await;
        outcome
    }
}

async fn remove_container<A: ContainerApi + ?Sized>(api: &A, id: &str) {
    if let Err(e) = api.remove(id).await {
        warn!(container_id = %id, error = %e, "failed to remove container");
    } else {
        debug!(container_id = %id, "container removed");
    }
}

/// Removes the container if a run is abandoned before its own cleanup.
struct RemoveOnDrop<A: ContainerApi + 'static> {
    api: Arc<A>,
    id: Option<String>,
}

impl<A: ContainerApi + 'static> RemoveOnDrop<A> {
    fn disarm(mut self) {
        self.id = None;
    }
}

impl<A: ContainerApi + 'static> Drop for RemoveOnDrop<A> {
    fn drop(&mut self) {
        let Some(id) = self.id.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                warn!(container_id = %id, "run abandoned, removing container in background");
                let api = Arc::clone(&self.api);
                handle.spawn(async move { remove_container(api.as_ref(), &id).await });
            },
            Err(_) => {
                warn!(container_id = %id, "run abandoned outside a runtime, container not removed");
            },
        }
    }
}
