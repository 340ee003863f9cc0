use async_trait::async_trait;
use cortex_capabilities::{CapabilityHandler, HandlerResult};
use cortex_memory::AllContext;
use serde_json::Value;

/// Fallback handler for anything Decision didn't route to a more
/// specific capability. No durable writes — just acknowledges the turn.
pub struct GeneralConversationHandler;

#[async_trait]
impl CapabilityHandler for GeneralConversationHandler {
    async fn handle(&self, _params: Value, _room_id: &str, _user_id: &str, sender_name: &str, _context: &AllContext) -> HandlerResult {
        HandlerResult::ok(format!("Hi {sender_name}, I'm listening — what would you like to do?"))
    }
}
