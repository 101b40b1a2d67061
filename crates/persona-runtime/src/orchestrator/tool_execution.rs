//! Direct tool execution outside the generation loop.

use persona_core::{ToolCall, ToolResult};
use persona_telemetry::TurnContext;
use tracing::{Instrument, warn};

use super::Orchestrator;

impl Orchestrator {
    /// Execute a call directly, typically one a human confirmed out of band.
    ///
    /// Permission is checked again: a `deny` tier yields a failed result
    /// carrying the policy reason. Confirm-tier tools run in the sandbox when
    /// the registry has one enabled. Never fails; every error is a failed
    /// [`ToolResult`].
    pub async fn execute_tool(&self, session_id: &str, call: &ToolCall) -> ToolResult {
        let turn = TurnContext::new(session_id, "execute_tool").with_metadata("tool", &call.name);

        async {
            let check = self.ctx.permissions.check(&call.name);
            if !check.allowed {
                warn!(tool = %call.name, reason = %check.reason, "direct execution denied");
                return ToolResult::failure(call, check.reason, 0);
            }
            self.ctx.registry.execute_with_level(call, check.level).await
        }
        .instrument(turn.span())
        .await
    }
}
