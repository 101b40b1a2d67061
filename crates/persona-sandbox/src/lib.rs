//! Persona Sandbox - Single-use, resource-bounded command execution.
//!
//! Every sandboxed tool call gets a fresh container that runs as a fixed
//! non-root user under a memory ceiling, a CPU quota, an optional network
//! cut-off and a read-only root filesystem. The container is removed
//! afterwards whatever the outcome.
//!
//! - [`SandboxExecutor`] is the entry point: [`ExecRequest`] in,
//!   [`SandboxResult`] out.
//! - [`IsolationBackend`] is the seam for alternative isolation mechanisms.
//! - [`ContainerBackend`] implements it over any [`ContainerApi`];
//!   [`DockerEngine`] is the Docker Engine HTTP API client.
//!
//! Timeouts are data, not errors: a run that exceeds its timeout is killed
//! and reported with `timed_out = true` and exit code 137.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

mod backend;
mod demux;
mod docker;
mod error;
mod executor;
mod types;

pub use backend::{ContainerApi, ContainerBackend, IsolationBackend};
pub use demux::demux_logs;
pub use docker::DockerEngine;
pub use error::{IsolationResult, SandboxError};
pub use executor::SandboxExecutor;
pub use types::{
    ContainerSpec, DEFAULT_MEMORY_LIMIT_BYTES, ExecRequest, SandboxConfig, SandboxResult,
    TIMEOUT_EXIT_CODE, VolumeSpec,
};
