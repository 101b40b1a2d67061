//! Test harness helpers.

use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tracing_subscriber::EnvFilter;

use persona_approval::{ApprovalConfig, ApprovalManager};
use persona_runtime::{KeywordClassifier, Orchestrator, OrchestratorConfig};
use persona_sandbox::{ContainerBackend, SandboxConfig, SandboxExecutor};
use persona_tools::ToolRegistry;

use crate::fixtures::{ToolRuns, register_test_tools, test_permissions};
use crate::mock_llm::{MockModelProvider, MockTurn};
use crate::mocks::{FakeContainerApi, MockMemory, MockPersona};

/// Create a temporary directory for testing.
///
/// # Panics
///
/// Panics if the temporary directory cannot be created.
#[must_use]
pub fn test_dir() -> TempDir {
    TempDir::new().expect("Failed to create temp directory")
}

/// Set up test logging with the given filter.
///
/// Safe to call from every test; only the first call installs the
/// subscriber.
///
/// # Example
///
/// ```rust,ignore
/// use persona_test::setup_test_logging;
///
/// #[tokio::test]
/// async fn my_test() {
///     setup_test_logging("persona_runtime=debug");
///     // ... test code
/// }
/// ```
pub fn setup_test_logging(filter: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_test_writer()
        .try_init();
}

/// Set up test logging from `RUST_LOG`, falling back to `warn`.
pub fn init_test_logging() {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".to_string());
    setup_test_logging(&filter);
}

/// A sandbox executor over a fake container engine.
#[must_use]
pub fn fake_sandbox(api: Arc<FakeContainerApi>, timeout: Duration) -> SandboxExecutor {
    let config = SandboxConfig {
        timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        ..SandboxConfig::default()
    };
    SandboxExecutor::new(config, Arc::new(ContainerBackend::new(api)))
}

/// An orchestrator wired to mocks, with the test tools registered.
pub struct TestRuntime {
    /// The orchestrator under test.
    pub orchestrator: Orchestrator,
    /// The scripted model.
    pub model: Arc<MockModelProvider>,
    /// The persona mock.
    pub persona: Arc<MockPersona>,
    /// The memory mock.
    pub memory: Arc<MockMemory>,
    /// Execution counters for the registered tools.
    pub runs: ToolRuns,
}

/// Builds a [`TestRuntime`].
pub struct TestRuntimeBuilder {
    turns: Vec<MockTurn>,
    persona: MockPersona,
    memory: MockMemory,
    config: OrchestratorConfig,
    sandbox: Option<SandboxExecutor>,
    approval: ApprovalConfig,
}

impl TestRuntimeBuilder {
    /// Start from the given model turns and default mocks.
    #[must_use]
    pub fn new(turns: Vec<MockTurn>) -> Self {
        Self {
            turns,
            persona: MockPersona::new(),
            memory: MockMemory::new(),
            config: OrchestratorConfig::default(),
            sandbox: None,
            approval: ApprovalConfig::default(),
        }
    }

    /// Use this persona mock.
    #[must_use]
    pub fn persona(mut self, persona: MockPersona) -> Self {
        self.persona = persona;
        self
    }

    /// Use this memory mock.
    #[must_use]
    pub fn memory(mut self, memory: MockMemory) -> Self {
        self.memory = memory;
        self
    }

    /// Override orchestrator settings.
    #[must_use]
    pub fn config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Route confirm-tier tools through this sandbox.
    #[must_use]
    pub fn sandbox(mut self, sandbox: SandboxExecutor) -> Self {
        self.sandbox = Some(sandbox);
        self
    }

    /// Override approval settings.
    #[must_use]
    pub fn approval(mut self, approval: ApprovalConfig) -> Self {
        self.approval = approval;
        self
    }

    /// Build the runtime.
    pub async fn build(self) -> TestRuntime {
        let model = Arc::new(MockModelProvider::new(self.turns));
        let persona = Arc::new(self.persona);
        let memory = Arc::new(self.memory);

        let registry = match self.sandbox {
            Some(sandbox) => ToolRegistry::new().with_sandbox(Arc::new(sandbox)),
            None => ToolRegistry::new(),
        };
        let runs = register_test_tools(&registry).await;

        let orchestrator = Orchestrator::new(
            model.clone(),
            persona.clone(),
            memory.clone(),
            self.config,
        )
        .with_classifier(Arc::new(KeywordClassifier::new([
            "search", "run", "搜索", "执行", "修改",
        ])))
        .with_registry(Arc::new(registry))
        .with_permissions(Arc::new(test_permissions()))
        .with_approvals(Arc::new(ApprovalManager::new(self.approval)));

        TestRuntime {
            orchestrator,
            model,
            persona,
            memory,
            runs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_dir() {
        let dir = test_dir();
        assert!(dir.path().exists());
    }

    #[test]
    fn test_logging_init_is_idempotent() {
        setup_test_logging("debug");
        init_test_logging();
    }

    #[tokio::test]
    async fn test_runtime_builder_wires_tools() {
        let runtime = TestRuntimeBuilder::new(vec![MockTurn::text("hi")]).build().await;
        assert!(runtime.orchestrator.registry().contains("shell").await);
        assert!(!runtime.orchestrator.registry().sandbox_enabled());
    }

    #[tokio::test]
    async fn test_fake_sandbox_enables_routing() {
        let api = Arc::new(FakeContainerApi::new());
        let runtime = TestRuntimeBuilder::new(vec![])
            .sandbox(fake_sandbox(api, Duration::from_secs(1)))
            .build()
            .await;
        assert!(runtime.orchestrator.registry().sandbox_enabled());
    }
}
