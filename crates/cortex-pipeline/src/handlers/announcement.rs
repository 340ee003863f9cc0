use std::sync::Arc;

use async_trait::async_trait;
use cortex_capabilities::{CapabilityHandler, HandlerResult};
use cortex_channels::{ChannelManager, MessageFormat, OutboundMessage};
use cortex_memory::AllContext;
use serde_json::Value;

/// Broadcasts an announcement to a channel. The multi-step elicitation of
/// the announcement text lives in the orchestrator's `ANNOUNCEMENT` state —
/// this handler fires once the text and target channel are both known.
pub struct CreateAnnouncementHandler {
    channels: Arc<ChannelManager>,
}

impl CreateAnnouncementHandler {
    pub fn new(channels: Arc<ChannelManager>) -> Self {
        Self { channels }
    }
}

#[async_trait]
impl CapabilityHandler for CreateAnnouncementHandler {
    async fn handle(&self, params: Value, room_id: &str, _user_id: &str, _sender_name: &str, _context: &AllContext) -> HandlerResult {
        let Some(text) = params.get("text").and_then(|v| v.as_str()) else {
            return HandlerResult::failed("missing announcement text");
        };
        let channel_name = params.get("channel").and_then(|v| v.as_str()).unwrap_or("webchat");

        let Some(channel) = self.channels.get(channel_name) else {
            return HandlerResult::failed(format!("channel '{channel_name}' is not registered"));
        };

        let outbound = OutboundMessage {
            channel: channel_name.to_string(),
            recipient_id: room_id.to_string(),
            content: text.to_string(),
            format: MessageFormat::PlainText,
        };

        match channel.send(&outbound).await {
            Ok(()) => HandlerResult::ok("Announcement sent."),
            Err(err) => HandlerResult::failed(format!("couldn't send the announcement: {err}")),
        }
    }
}
