//! End-to-end turn scenarios.
//!
//! Each test drives a full orchestrator over scripted model turns and the
//! standard test tools: `web_search` (safe), `shell` (confirm) and
//! `system_modify` (deny).

mod common;

use std::sync::Arc;
use std::time::Duration;

use persona_approval::ApprovalConfig;
use persona_core::{AgentKind, PermissionLevel};
use persona_llm::Role;
use persona_runtime::{OrchestratorConfig, Validation};
use persona_sandbox::{ExecRequest, TIMEOUT_EXIT_CODE};
use persona_test::{
    FakeContainerApi, MockPersona, MockTurn, TestRuntimeBuilder, fake_sandbox, test_permissions,
    test_tool_call,
};
use serde_json::json;

use common::{assert_completed, runtime, tool_messages, tool_payload};

// ---------------------------------------------------------------------------
// Safe tool
// ---------------------------------------------------------------------------

#[tokio::test]
async fn safe_tool_runs_without_approval() {
    let rt = runtime(vec![
        MockTurn::tool_call("call-1", "web_search", json!({"query": "上海天气"})),
        MockTurn::text("今天上海晴。"),
    ])
    .await;

    let outcome = rt
        .orchestrator
        .process("s-safe", "u1", "帮我搜索一下上海天气")
        .await
        .unwrap();

    assert_completed(&outcome);
    assert_eq!(outcome.response, "[persona] 今天上海晴。");
    assert_eq!(outcome.route.as_ref().map(|r| r.agent), Some(AgentKind::Task));
    assert_eq!(rt.runs.web_search_runs(), 1);

    let result = &outcome.tool_results[0];
    assert!(result.success);
    assert!(!result.sandboxed);
    assert_eq!(result.call_id, "call-1");

    // The second model round saw the tool output.
    let requests = rt.model.captured_messages();
    assert_eq!(requests.len(), 2);
    let tools = tool_messages(&requests[1]);
    assert_eq!(tools.len(), 1);
    assert_eq!(tool_payload(tools[0])["query"], "上海天气");

    // Denied tools are never offered.
    let mut offered = rt.model.offered_tools()[0].clone();
    offered.sort();
    assert_eq!(offered, ["shell", "web_search"]);

    let stored = rt.memory.messages("s-safe");
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0].role, Role::User);
    assert_eq!(stored[1].role, Role::Assistant);
}

// ---------------------------------------------------------------------------
// Confirm tool
// ---------------------------------------------------------------------------

#[tokio::test]
async fn confirm_tool_waits_then_runs_on_confirm() {
    let rt = runtime(vec![
        MockTurn::tool_call("call-sh", "shell", json!({"command": "ls -la"})),
        MockTurn::text("目录里没有文件。"),
    ])
    .await;
    let orchestrator = &rt.orchestrator;

    let first = orchestrator.process("s-confirm", "u1", "run ls -la").await.unwrap();
    assert!(first.success);
    assert_eq!(first.approval_required, Some(true));
    let message = first.approval_message.clone().unwrap();
    assert!(message.contains("shell"));
    assert!(message.contains("确认"));
    let pending = first.pending_tool_call.clone().unwrap();
    assert_eq!(pending.name, "shell");
    assert_eq!(pending.arguments["command"], "ls -la");
    assert_eq!(rt.runs.shell_runs(), 0);
    assert_eq!(first.response, message);

    // Nothing is persisted while the turn is suspended.
    assert!(rt.memory.messages("s-confirm").is_empty());
    assert!(orchestrator.approvals().has_pending("s-confirm"));

    let second = orchestrator.process("s-confirm", "u1", "确认").await.unwrap();
    assert_completed(&second);
    assert_eq!(rt.runs.shell_runs(), 1);
    assert!(!orchestrator.approvals().has_pending("s-confirm"));
    assert_eq!(second.response, "[persona] 目录里没有文件。");
    assert_eq!(second.tool_results[0].call_id, "call-sh");
    assert!(second.tool_results[0].success);
    assert_eq!(rt.model.call_count(), 2);
}

#[tokio::test]
async fn confirm_tool_cancelled_never_runs() {
    let rt = runtime(vec![
        MockTurn::tool_call("call-sh", "shell", json!({"command": "ls -la"})),
        MockTurn::text("好的，已取消。"),
    ])
    .await;
    let orchestrator = &rt.orchestrator;

    orchestrator.process("s-cancel", "u1", "run ls -la").await.unwrap();
    let outcome = orchestrator.process("s-cancel", "u1", "取消").await.unwrap();

    assert_completed(&outcome);
    assert_eq!(rt.runs.shell_runs(), 0);
    assert!(!orchestrator.approvals().has_pending("s-cancel"));
    let result = &outcome.tool_results[0];
    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some("rejected by user"));

    // The model was told the call was rejected.
    let last = rt.model.captured_messages().pop().unwrap();
    let tools = tool_messages(&last);
    assert!(tools[0].content.contains("rejected by user"));
}

#[tokio::test]
async fn ambiguous_reply_reprompts() {
    let rt = runtime(vec![MockTurn::tool_call(
        "call-sh",
        "shell",
        json!({"command": "ls -la"}),
    )])
    .await;
    let orchestrator = &rt.orchestrator;

    let first = orchestrator.process("s-amb", "u1", "run ls -la").await.unwrap();
    let again = orchestrator.process("s-amb", "u1", "嗯？这是什么").await.unwrap();

    assert_eq!(again.approval_required, Some(true));
    assert_eq!(again.approval_message, first.approval_message);
    assert_eq!(again.pending_tool_call, first.pending_tool_call);
    assert_eq!(rt.model.call_count(), 1);
    assert!(orchestrator.approvals().has_pending("s-amb"));
}

#[tokio::test]
async fn expired_approval_is_timeout_even_when_confirmed() {
    let rt = TestRuntimeBuilder::new(vec![
        MockTurn::tool_call("call-sh", "shell", json!({"command": "ls -la"})),
        MockTurn::text("操作超时了。"),
    ])
    .approval(ApprovalConfig {
        timeout_ms: 20,
        ..ApprovalConfig::default()
    })
    .build()
    .await;
    let orchestrator = &rt.orchestrator;

    orchestrator.process("s-exp", "u1", "run ls -la").await.unwrap();
    tokio::time::sleep(Duration::from_millis(60)).await;
    let outcome = orchestrator.process("s-exp", "u1", "确认").await.unwrap();

    assert_eq!(rt.runs.shell_runs(), 0);
    assert_eq!(
        outcome.tool_results[0].error.as_deref(),
        Some("approval timed out")
    );
    assert!(!orchestrator.approvals().has_pending("s-exp"));
}

#[tokio::test]
async fn execute_tool_after_out_of_band_confirmation() {
    let rt = runtime(vec![]).await;
    let call = test_tool_call("call-oob", "shell", json!({"command": "ls -la"}));

    let result = rt.orchestrator.execute_tool("s-oob", &call).await;
    assert!(result.success);
    assert_eq!(result.call_id, "call-oob");
    assert_eq!(result.output.unwrap()["command"], "ls -la");
    assert_eq!(rt.runs.shell_runs(), 1);
}

// ---------------------------------------------------------------------------
// Denied tool
// ---------------------------------------------------------------------------

#[tokio::test]
async fn denied_tool_never_reaches_registry() {
    let check = test_permissions().check("system_modify");
    assert!(!check.allowed);
    assert_eq!(check.level, PermissionLevel::Deny);

    let rt = runtime(vec![
        MockTurn::tool_call("call-deny", "system_modify", json!({"setting": "firewall"})),
        MockTurn::text("抱歉，这个操作不被允许。"),
    ])
    .await;

    let outcome = rt
        .orchestrator
        .process("s-deny", "u1", "修改系统防火墙")
        .await
        .unwrap();

    assert_completed(&outcome);
    assert_eq!(rt.runs.system_modify_runs(), 0);
    let result = &outcome.tool_results[0];
    assert!(!result.success);
    assert!(result.output.is_none());
    assert!(!result.error.as_deref().unwrap_or_default().is_empty());
    assert_eq!(outcome.response, "[persona] 抱歉，这个操作不被允许。");
}

// ---------------------------------------------------------------------------
// Persona retry
// ---------------------------------------------------------------------------

#[tokio::test]
async fn persona_retry_enforces_second_response_once() {
    let rt = TestRuntimeBuilder::new(vec![
        MockTurn::text("As an AI language model, I cannot have feelings."),
        MockTurn::text("哈哈，我今天心情不错！"),
    ])
    .persona(MockPersona::new().with_validation(Validation::regenerate(["breaks character"])))
    .build()
    .await;

    let outcome = rt.orchestrator.process("s-retry", "u1", "你今天好吗").await.unwrap();

    assert_completed(&outcome);
    assert_eq!(outcome.retry_count, 1);
    assert_eq!(rt.persona.enforce_calls(), 1);
    assert_eq!(outcome.response, "[persona] 哈哈，我今天心情不错！");
    assert_eq!(
        rt.persona.validated(),
        [
            "As an AI language model, I cannot have feelings.",
            "哈哈，我今天心情不错！"
        ]
    );
    assert_eq!(
        outcome.route.as_ref().map(|r| r.agent),
        Some(AgentKind::Conversation)
    );
}

#[tokio::test]
async fn strict_persona_surfaces_exhausted_retries() {
    let rt = TestRuntimeBuilder::new(vec![MockTurn::text("one"), MockTurn::text("two")])
        .persona(MockPersona::new().rejecting(5))
        .config(OrchestratorConfig {
            max_retries: 1,
            strict_persona: true,
            ..OrchestratorConfig::default()
        })
        .build()
        .await;

    let err = rt.orchestrator.process("s-strict", "u1", "hi").await.unwrap_err();
    assert_eq!(err.stage(), Some("validate"));
    assert_eq!(rt.persona.enforce_calls(), 0);
}

// ---------------------------------------------------------------------------
// Sandbox timeout
// ---------------------------------------------------------------------------

#[tokio::test]
async fn sandbox_timeout_kills_and_removes_container() {
    let api = Arc::new(FakeContainerApi::new().with_wait_delay(Duration::from_secs(5)));
    let sandbox = fake_sandbox(Arc::clone(&api), Duration::from_millis(50));

    let result = sandbox.execute(&ExecRequest::new("sleep 100")).await.unwrap();

    assert!(result.timed_out);
    assert_eq!(result.exit_code, TIMEOUT_EXIT_CODE);
    assert_eq!(result.exit_code, 137);
    assert!(result.latency_ms >= 50);
    let calls = api.calls();
    assert_eq!(calls.first().map(String::as_str), Some("create"));
    assert!(calls.contains(&"kill".to_string()));
    assert_eq!(calls.last().map(String::as_str), Some("remove"));
}

#[tokio::test]
async fn sandbox_timeout_surfaces_as_failed_tool_result() {
    let api = Arc::new(FakeContainerApi::new().with_wait_delay(Duration::from_secs(5)));
    let rt = TestRuntimeBuilder::new(vec![
        MockTurn::tool_call("call-sh", "shell", json!({"command": "sleep 100"})),
        MockTurn::text("命令超时了。"),
    ])
    .sandbox(fake_sandbox(Arc::clone(&api), Duration::from_millis(50)))
    .build()
    .await;
    let orchestrator = &rt.orchestrator;

    let first = orchestrator.process("s-box", "u1", "run sleep 100").await.unwrap();
    assert_eq!(first.approval_required, Some(true));

    let outcome = orchestrator.process("s-box", "u1", "确认").await.unwrap();
    assert_completed(&outcome);

    let result = &outcome.tool_results[0];
    assert!(!result.success);
    assert!(result.sandboxed);
    let error = result.error.as_deref().unwrap();
    assert!(error.contains("timed out"));
    assert!(error.contains(&format!("{} ms", result.latency_ms)));

    // The sandbox ran instead of the local executor.
    assert_eq!(rt.runs.shell_runs(), 0);
    let specs = api.specs();
    assert_eq!(specs.len(), 1);
    assert!(specs[0].command.contains("sleep 100"));
    assert_eq!(api.calls().last().map(String::as_str), Some("remove"));
}
