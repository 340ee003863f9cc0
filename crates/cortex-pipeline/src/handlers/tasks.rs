use async_trait::async_trait;
use cortex_capabilities::{CapabilityHandler, HandlerResult};
use cortex_core::types::OrganizationId;
use cortex_memory::{AllContext, MemoryManager};
use serde_json::Value;

/// Lists the tenant's recent tasks. Seeds a `LIST_CONTEXT` state (via its
/// `data` payload) so the next turn's "1", "最初の" can resolve against it —
/// the orchestrator, not this handler, installs that state.
pub struct ListTasksHandler {
    memory: MemoryManager,
}

impl ListTasksHandler {
    pub fn new(memory: MemoryManager) -> Self {
        Self { memory }
    }
}

#[async_trait]
impl CapabilityHandler for ListTasksHandler {
    async fn handle(&self, params: Value, _room_id: &str, _user_id: &str, _sender_name: &str, _context: &AllContext) -> HandlerResult {
        let Some(org) = params.get("organization_id").and_then(|v| v.as_str()) else {
            return HandlerResult::failed("missing organization_id");
        };
        let org = OrganizationId::new(org);
        let tasks = self.memory.get_recent_tasks(&org, 10).await;
        if tasks.is_empty() {
            return HandlerResult::ok("You have no open tasks.");
        }
        let lines: Vec<String> = tasks
            .iter()
            .enumerate()
            .map(|(i, t)| format!("{}. {}", i + 1, t.body))
            .collect();
        let items: Vec<Value> = tasks.iter().map(|t| serde_json::json!({"task_id": t.task_id, "body": t.body})).collect();
        HandlerResult::ok(lines.join("\n")).with_data(Value::Array(items))
    }
}

/// Creates a task from collected fields. Expects `params` to already carry
/// `task_body` (required) plus optional `assigned_to`/`limit_date` — either
/// supplied directly or assembled by the orchestrator's `TASK_PENDING` flow.
pub struct CreateTaskHandler {
    memory: MemoryManager,
}

impl CreateTaskHandler {
    pub fn new(memory: MemoryManager) -> Self {
        Self { memory }
    }
}

#[async_trait]
impl CapabilityHandler for CreateTaskHandler {
    async fn handle(&self, params: Value, _room_id: &str, _user_id: &str, _sender_name: &str, _context: &AllContext) -> HandlerResult {
        let Some(org) = params.get("organization_id").and_then(|v| v.as_str()) else {
            return HandlerResult::failed("missing organization_id");
        };
        let Some(body) = params.get("task_body").and_then(|v| v.as_str()) else {
            return HandlerResult::ok("What's the task?").awaiting(true);
        };
        let org = OrganizationId::new(org);
        let assigned_to = params.get("assigned_to").and_then(|v| v.as_str());
        let limit_date = params.get("limit_date").and_then(|v| v.as_str());

        match self.memory.create_task(&org, body, assigned_to, limit_date).await {
            Ok(task) => HandlerResult::ok(format!("Created task: {}", task.body)),
            Err(err) => HandlerResult::failed(format!("couldn't create that task: {err}")),
        }
    }
}

trait AwaitingInputExt {
    fn awaiting(self, awaiting_input: bool) -> Self;
}

impl AwaitingInputExt for HandlerResult {
    fn awaiting(mut self, awaiting_input: bool) -> Self {
        self.metadata.awaiting_input = Some(awaiting_input);
        self
    }
}
