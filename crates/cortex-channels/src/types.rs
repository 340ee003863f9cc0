//! Transport contract only: the shapes that cross the boundary between an
//! external chat platform and the cognitive core. No wire format,
//! no OAuth, no platform-specific payload shape lives here — those are the
//! transport collaborator's problem.

use serde::{Deserialize, Serialize};

use cortex_core::types::OrganizationId;

/// An opaque handle to an attachment (image, file, voice note, …) carried by
/// an inbound message. The core never reads attachment bytes — it only ever
/// sees this handle and may pass it back to a capability handler unexamined.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub id: String,
    pub content_type: String,
    pub uri: String,
}

/// Transport → Core inbound contract, field-for-field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    pub tenant_id: OrganizationId,
    pub room_id: String,
    pub user_id: String,
    pub sender_name: String,
    pub text: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

/// A message to be delivered to an external channel. Not part of the core's
/// inbound entry contracts — this is the generic shape a real adapter would
/// implement on top of `Channel::send`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub channel: String,
    pub recipient_id: String,
    pub content: String,
    pub format: MessageFormat,
}

/// Formatting hint for outbound message content.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageFormat {
    #[default]
    PlainText,
    Markdown,
    Html,
}

/// Runtime connection state of a channel adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelStatus {
    Connected,
    Connecting,
    Disconnected,
    Error(String),
}
