//! Building an orchestrator from a configuration file.

use std::sync::Arc;

use persona_config::Config;
use persona_core::PermissionLevel;
use persona_runtime::config_bridge::{build_orchestrator, to_log_config};
use persona_test::{MockMemory, MockPersona, test_dir};

const CONFIG: &str = r#"
[model]
provider = "local"
model = "qwen2.5:7b"
api_url = "http://127.0.0.1:11434/v1"

[orchestrator]
max_retries = 3
max_tool_iterations = 4
task_keywords = ["查询", "lookup"]

[permissions]
safe = ["calculator"]
confirm = ["deploy"]
deny = ["format_disk"]

[approval]
timeout_ms = 60000
confirm_keywords = ["go"]
cancel_keywords = ["stop"]

[servers.unreachable]
command = "persona-test-no-such-server-binary"
tier = "safe"
"#;

fn load(contents: &str) -> Config {
    let dir = test_dir();
    let path = dir.path().join("persona.toml");
    std::fs::write(&path, contents).unwrap();
    Config::load_file(&path).unwrap()
}

#[tokio::test]
async fn orchestrator_reflects_file_settings() {
    let cfg = load(CONFIG);

    let orchestrator = build_orchestrator(
        &cfg,
        Arc::new(MockPersona::new()),
        Arc::new(MockMemory::new()),
    )
    .await
    .unwrap();

    let oc = orchestrator.config();
    assert_eq!(oc.max_retries, 3);
    assert_eq!(oc.max_tool_iterations, 4);

    let permissions = orchestrator.permissions();
    assert_eq!(permissions.level("calculator"), PermissionLevel::Safe);
    assert_eq!(permissions.level("deploy"), PermissionLevel::Confirm);
    assert_eq!(permissions.level("format_disk"), PermissionLevel::Deny);
    assert_eq!(permissions.level("anything_else"), PermissionLevel::Deny);

    assert_eq!(orchestrator.approvals().config().timeout_ms, 60_000);
    assert_eq!(orchestrator.model().model(), "qwen2.5:7b");

    // The unreachable server is skipped, not fatal.
    assert!(orchestrator.registry().names().await.is_empty());
    assert!(!orchestrator.registry().sandbox_enabled());
}

#[tokio::test]
async fn openai_provider_without_key_is_rejected() {
    let cfg = load(
        r#"
[model]
provider = "openai"
model = "gpt-4o-mini"
"#,
    );
    assert!(cfg.model.api_key.is_none());
    let err = build_orchestrator(
        &cfg,
        Arc::new(MockPersona::new()),
        Arc::new(MockMemory::new()),
    )
    .await
    .unwrap_err();
    assert!(err.to_string().contains("api_key"));
}

#[test]
fn file_logging_requires_directory() {
    let mut cfg = load(CONFIG);
    cfg.logging.target = "file".into();
    cfg.logging.directory = None;
    assert!(to_log_config(&cfg).is_err());

    let dir = test_dir();
    cfg.logging.directory = Some(dir.path().display().to_string());
    assert!(to_log_config(&cfg).is_ok());
}
