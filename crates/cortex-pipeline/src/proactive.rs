//! Proactive Generator.
//!
//! Triggered by an outside scheduler, never by a transport message. Builds a
//! trimmed `Context`, runs a truncated trigger-driven Understanding, and
//! **must** traverse the same Authorization Gate with the same safety
//! patterns before anything is emitted — a generated message that fails the
//! gate is dropped and logged, never handed to a transport.

use cortex_capabilities::CapabilityRegistry;
use cortex_core::config::FeatureFlags;
use cortex_core::types::OrganizationId;
use cortex_hooks::HookEngine;
use cortex_memory::MemoryManager;
use cortex_scheduler::ProactiveTrigger;
use tracing::info;

use crate::authorization;
use crate::context;
use crate::types::{GateLevel, UnderstandingResult};
use crate::{audit, response::PipelineResponse};

/// Runs one proactive trigger end to end. Returns `None` when the gate
/// dropped the generated message — the caller must not forward `None` to
/// any transport.
pub async fn generate(
    memory: &MemoryManager,
    registry: &CapabilityRegistry,
    hooks: &HookEngine,
    trigger: &ProactiveTrigger,
    features: &FeatureFlags,
) -> Option<PipelineResponse> {
    let organization_id = OrganizationId::new(trigger.organization_id.clone());
    let room_id = format!("proactive:{}", trigger.user_id);

    let ctx = context::build(memory, &organization_id, &room_id, &trigger.user_id, "scheduler", &trigger.trigger_type, features).await;

    let understanding = UnderstandingResult {
        intent: trigger.trigger_type.clone(),
        intent_confidence: 1.0,
        entities: Default::default(),
        resolved_pronouns: Vec::new(),
        urgency: crate::types::Urgency::Low,
        emotion: crate::types::Emotion::Neutral,
        raw_message: trigger.trigger_type.clone(),
        needs_clarification: false,
    };

    let capability = registry.get(&trigger.trigger_type);
    let gate = authorization::evaluate(capability, &trigger.trigger_type, &understanding);

    if gate.level != GateLevel::AutoApprove {
        info!(
            organization_id = organization_id.as_str(),
            user_id = %trigger.user_id,
            trigger_type = %trigger.trigger_type,
            reason = %gate.reason,
            "proactive message dropped by authorization gate"
        );
        audit::proactive_attempted(hooks, &organization_id, &trigger.user_id, true, Some(gate.reason.as_str()));
        return None;
    }

    audit::proactive_attempted(hooks, &organization_id, &trigger.user_id, false, None);

    let message = render_trigger_message(&trigger.trigger_type, &ctx);
    Some(PipelineResponse::new(message, trigger.trigger_type.clone(), true, 0))
}

fn render_trigger_message(trigger_type: &str, ctx: &crate::types::Context) -> String {
    match trigger_type {
        "goal_check_in" => match ctx.all.active_goals.first() {
            Some(goal) => format!("Just checking in — how's progress on \"{}\" going?", goal.title),
            None => "Just checking in — anything on your mind?".to_string(),
        },
        "task_reminder" => match ctx.all.recent_tasks.first() {
            Some(task) => format!("Reminder: \"{}\" is still open.", task.body),
            None => "You're all caught up on tasks.".to_string(),
        },
        other => format!("({other} check-in)"),
    }
}
