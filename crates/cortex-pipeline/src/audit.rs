//! Audit & Observability Bridge.
//!
//! Every gate decision, tool call, state transition, and proactive attempt
//! emits a structured `HookContext` through the shared `HookEngine`. PII
//! redaction happens here, before the event ever reaches a hook — the
//! engine forwards whatever payload it is given, so this module is the only
//! place that invariant can be enforced.

use cortex_core::types::OrganizationId;
use cortex_hooks::{HookContext, HookEngine, HookEvent};
use serde_json::Value;

use crate::execution::redact_pii;
use crate::types::{DecisionResult, GateDecision, UnderstandingResult};

pub fn context_built(engine: &HookEngine, organization_id: &OrganizationId, room_id: &str, user_id: &str) {
    let mut ctx = HookContext::new(HookEvent::ContextBuilt, Value::Null);
    ctx.organization_id = Some(organization_id.as_str().to_string());
    ctx.room_id = Some(room_id.into());
    ctx.user_id = Some(user_id.into());
    engine.emit(ctx);
}

pub fn understanding_done(engine: &HookEngine, organization_id: &OrganizationId, room_id: &str, user_id: &str, result: &UnderstandingResult) {
    let payload = serde_json::json!({
            "intent": result.intent,
            "intent_confidence": result.intent_confidence,
            "urgency": result.urgency,
            "emotion": result.emotion,
            "needs_clarification": result.needs_clarification,
    });
    let mut ctx = HookContext::new(HookEvent::UnderstandingDone, payload);
    ctx.organization_id = Some(organization_id.as_str().to_string());
    ctx.room_id = Some(room_id.into());
    ctx.user_id = Some(user_id.into());
    engine.emit(ctx);
}

pub fn gate_decided(engine: &HookEngine, organization_id: &OrganizationId, room_id: &str, user_id: &str, decision: &GateDecision) {
    let payload = serde_json::json!({
            "level": decision.level,
            "enforcement_action": decision.enforcement_action,
            "reason": decision.reason,
    });
    let mut ctx = HookContext::new(HookEvent::GateDecided, payload);
    ctx.organization_id = Some(organization_id.as_str().to_string());
    ctx.room_id = Some(room_id.into());
    ctx.user_id = Some(user_id.into());
    engine.emit(ctx);
}

pub fn decision_made(engine: &HookEngine, organization_id: &OrganizationId, room_id: &str, user_id: &str, decision: &DecisionResult) {
    let payload = serde_json::json!({
            "action": decision.action,
            "confidence": decision.confidence,
            "risk_level": decision.risk_level,
            "needs_confirmation": decision.needs_confirmation,
            "params": redact_pii(&decision.params),
    });
    let mut ctx = HookContext::new(HookEvent::DecisionMade, payload);
    ctx.organization_id = Some(organization_id.as_str().to_string());
    ctx.room_id = Some(room_id.into());
    ctx.user_id = Some(user_id.into());
    engine.emit(ctx);
}

pub fn handler_invoked(
    engine: &HookEngine,
    organization_id: &OrganizationId,
    room_id: &str,
    user_id: &str,
    action: &str,
    success: bool,
    latency_ms: u64,
    error_kind: Option<&str>,
) {
    let payload = serde_json::json!({
            "action": action,
            "outcome": if success { "success" } else { "failure" },
            "latency_ms": latency_ms,
            "error_kind": error_kind,
    });
    let mut ctx = HookContext::new(HookEvent::HandlerInvoked, payload);
    ctx.organization_id = Some(organization_id.as_str().to_string());
    ctx.room_id = Some(room_id.into());
    ctx.user_id = Some(user_id.into());
    engine.emit(ctx);
}

pub fn proactive_attempted(engine: &HookEngine, organization_id: &OrganizationId, user_id: &str, dropped: bool, reason: Option<&str>) {
    let payload = serde_json::json!({
            "dropped": dropped,
            "reason": reason,
    });
    let mut ctx = HookContext::new(HookEvent::ProactiveAttempted, payload);
    ctx.organization_id = Some(organization_id.as_str().to_string());
    ctx.user_id = Some(user_id.into());
    engine.emit(ctx);
}
