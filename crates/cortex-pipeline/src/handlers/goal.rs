use async_trait::async_trait;
use cortex_capabilities::{CapabilityHandler, HandlerResult};
use cortex_core::types::OrganizationId;
use cortex_memory::{AllContext, MemoryManager};
use serde_json::Value;

/// Registers a long-term goal. The multi-turn elicitation itself (asking
/// "why", following up on doubts) lives in the orchestrator's `GOAL_SETTING`
/// state machine — this handler only persists the final, fully-formed goal.
pub struct RegisterGoalHandler {
    memory: MemoryManager,
}

impl RegisterGoalHandler {
    pub fn new(memory: MemoryManager) -> Self {
        Self { memory }
    }
}

#[async_trait]
impl CapabilityHandler for RegisterGoalHandler {
    async fn handle(&self, params: Value, _room_id: &str, user_id: &str, _sender_name: &str, _context: &AllContext) -> HandlerResult {
        let Some(org) = params.get("organization_id").and_then(|v| v.as_str()) else {
            return HandlerResult::failed("missing organization_id");
        };
        let Some(title) = params.get("title").and_then(|v| v.as_str()) else {
            return HandlerResult::failed("missing goal title");
        };
        let org = OrganizationId::new(org);
        let why = params.get("why").and_then(|v| v.as_str());

        match self.memory.create_goal(&org, user_id, title, why).await {
            Ok(goal) => HandlerResult::ok(format!("Goal registered: {}", goal.title)),
            Err(err) => HandlerResult::failed(format!("couldn't register that goal: {err}")),
        }
    }
}
