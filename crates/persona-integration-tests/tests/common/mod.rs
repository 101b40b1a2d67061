//! Shared helpers for integration tests.

use persona_llm::{Message, Role};
use persona_runtime::TurnOutcome;
use persona_test::{MockTurn, TestRuntime, TestRuntimeBuilder, init_test_logging};
use serde_json::Value;

/// Build a runtime with default mocks and the given model turns.
#[allow(dead_code)]
pub async fn runtime(turns: Vec<MockTurn>) -> TestRuntime {
    init_test_logging();
    TestRuntimeBuilder::new(turns).build().await
}

/// The tool-role messages of a captured model request.
#[allow(dead_code)]
pub fn tool_messages(request: &[Message]) -> Vec<&Message> {
    request.iter().filter(|m| m.role == Role::Tool).collect()
}

/// Parse a tool message body back into JSON.
#[allow(dead_code)]
pub fn tool_payload(message: &Message) -> Value {
    serde_json::from_str(&message.content).unwrap()
}

/// Assert the outcome is a completed turn with no pending approval.
#[allow(dead_code)]
pub fn assert_completed(outcome: &TurnOutcome) {
    assert!(outcome.success, "turn failed: {outcome:?}");
    assert!(
        outcome.approval_required.is_none(),
        "unexpected approval: {:?}",
        outcome.approval_message
    );
    assert!(outcome.pending_tool_call.is_none());
}
