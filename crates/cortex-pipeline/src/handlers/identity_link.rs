use async_trait::async_trait;
use cortex_capabilities::{CapabilityHandler, HandlerResult};
use cortex_memory::AllContext;
use cortex_users::UserResolver;
use serde_json::Value;

/// Links a channel identity to a user account. Two paths, chosen by whether
/// `admin_id` is present: an admin explicitly linking someone, or a
/// self-service link after the verification-code flow already validated the
/// requester (no admin check in that branch — see `UserResolver::self_link`).
pub struct LinkIdentityHandler {
    resolver: UserResolver,
}

impl LinkIdentityHandler {
    pub fn new(resolver: UserResolver) -> Self {
        Self { resolver }
    }
}

#[async_trait]
impl CapabilityHandler for LinkIdentityHandler {
    async fn handle(&self, params: Value, _room_id: &str, _user_id: &str, _sender_name: &str, _context: &AllContext) -> HandlerResult {
        let Some(channel) = params.get("channel").and_then(|v| v.as_str()) else {
            return HandlerResult::failed("missing channel");
        };
        let Some(identifier) = params.get("identifier").and_then(|v| v.as_str()) else {
            return HandlerResult::failed("missing identifier");
        };
        let Some(target_user_id) = params.get("target_user_id").and_then(|v| v.as_str()) else {
            return HandlerResult::failed("missing target_user_id");
        };

        let result = match params.get("admin_id").and_then(|v| v.as_str()) {
            Some(admin_id) => self.resolver.link_identity(admin_id, channel, identifier, target_user_id),
            None => self.resolver.self_link(channel, identifier, target_user_id),
        };

        match result {
            Ok(()) => HandlerResult::ok("Identity linked."),
            Err(err) => HandlerResult::failed(format!("couldn't link that identity: {err}")),
        }
    }
}
