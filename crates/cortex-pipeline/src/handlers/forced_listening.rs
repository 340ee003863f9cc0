use async_trait::async_trait;
use cortex_capabilities::{CapabilityHandler, HandlerResult};
use cortex_memory::AllContext;
use serde_json::Value;

/// Invoked when the Authorization Gate raises `FORCE_LISTENING` —
/// distress patterns override whatever capability Decision picked.
/// Deliberately does nothing but acknowledge and redirect; no tool call,
/// no data write, no suggestions beyond a safe off-ramp.
pub struct ForcedListeningHandler;

#[async_trait]
impl CapabilityHandler for ForcedListeningHandler {
    async fn handle(&self, _params: Value, _room_id: &str, _user_id: &str, sender_name: &str, _context: &AllContext) -> HandlerResult {
        HandlerResult::ok(format!(
                "{sender_name}, I hear you, and I want to make sure you're safe. \
                If you're in immediate danger please contact local emergency services \
                or a crisis line. I'm here to listen."
        ))
            .with_suggestions(vec!["talk to someone you trust".to_string(), "contact a crisis line".to_string()])
    }
}
