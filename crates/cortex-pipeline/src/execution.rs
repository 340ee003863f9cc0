//! Execution.
//!
//! Dispatches the chosen action to its handler behind a per-call timeout,
//! with zero internal retries — retries, if any, are the handler's own
//! business.

use cortex_capabilities::{CapabilityRegistry, HandlerResult};
use cortex_core::config::HANDLER_DEADLINE_MS;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::idempotency::IdempotencyGuard;
use crate::types::{Context, DecisionResult};

/// Well-known PII keys stripped from `params` before any audit emission.
const PII_KEYS: &[&str] = &["message", "body", "content", "text"];

/// Runs the handler selected by `decision.action`. Never panics and never
/// retries — a handler timeout or an unknown action both degrade to a
/// failed `HandlerResult` the orchestrator/response layer can still render.
///
/// Checks `guard` first: a second call with the same organization, room,
/// user, action and params within the dedup window replays the prior
/// `HandlerResult` instead of invoking the handler again, so a retried or
/// double-submitted message can't double-apply a durable side effect.
pub async fn execute(registry: &CapabilityRegistry, decision: &DecisionResult, ctx: &Context, guard: &IdempotencyGuard) -> HandlerResult {
    let Some(capability) = registry.get(&decision.action) else {
        warn!(action = %decision.action, "no capability registered for action, falling back to general_conversation");
        return HandlerResult::ok("I'm not sure how to do that yet.");
    };

    let Some(handler) = registry.handler_for(&capability.handler_ref) else {
        error!(action = %decision.action, handler_ref = %capability.handler_ref, "capability has no bound handler");
        return HandlerResult::failed("that capability isn't wired up correctly.");
    };

    let params = decision.params.clone();

    if let Some(cached) = guard.check(ctx.organization_id.as_str(), &ctx.room_id, &ctx.user_id, &decision.action, &params) {
        info!(action = %decision.action, room_id = %ctx.room_id, "replaying cached result for duplicate request");
        return cached;
    }

    let deadline = std::time::Duration::from_millis(HANDLER_DEADLINE_MS);
    let fut = handler.handle(params.clone(), &ctx.room_id, &ctx.user_id, &ctx.sender_name, &ctx.all);

    let result = match tokio::time::timeout(deadline, fut).await {
        Ok(result) => result,
        Err(_) => {
            warn!(action = %decision.action, timeout_ms = HANDLER_DEADLINE_MS, "handler timed out");
            HandlerResult::failed("that took too long, please try again.")
        }
    };

    guard.record(ctx.organization_id.as_str(), &ctx.room_id, &ctx.user_id, &decision.action, &params, result.clone());
    result
}

/// Strips well-known PII keys from a params object before it's attached to
/// an audit event. Non-object values pass through untouched — there is
/// nothing to redact in a scalar.
pub fn redact_pii(params: &Value) -> Value {
    match params {
        Value::Object(map) => {
            let cleaned: serde_json::Map<String, Value> = map
                .iter()
                .filter(|(k, _)| !PII_KEYS.contains(&k.as_str()))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            Value::Object(cleaned)
        }
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redact_pii_strips_known_keys_but_keeps_others() {
        let params = serde_json::json!({
                "message": "secret text",
                "room": "room-1",
                "content": "also secret",
        });
        let redacted = redact_pii(&params);
        assert!(redacted.get("message").is_none());
        assert!(redacted.get("content").is_none());
        assert_eq!(redacted.get("room").unwrap(), "room-1");
    }

    #[test]
    fn redact_pii_passes_through_non_object_values() {
        assert_eq!(redact_pii(&Value::Null), Value::Null);
    }
}
