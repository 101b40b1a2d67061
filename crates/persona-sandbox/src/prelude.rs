//! Common imports for sandboxed execution.
//!
//! ```
//! use persona_sandbox::prelude::*;
//! ```

pub use crate::{
    ContainerApi, ContainerBackend, ContainerSpec, DockerEngine, ExecRequest, IsolationBackend,
    SandboxConfig, SandboxError, SandboxExecutor, SandboxResult, VolumeSpec,
};
