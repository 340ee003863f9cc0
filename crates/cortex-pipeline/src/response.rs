//! External interface shapes: the two entry contracts the pipeline exposes
//! to its transport collaborators.

use cortex_core::types::OrganizationId;
use serde::{Deserialize, Serialize};

/// Transport → Core inbound message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRequest {
    pub tenant_id: OrganizationId,
    pub room_id: String,
    pub user_id: String,
    pub sender_name: String,
    pub text: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

/// An opaque attachment handle. The core never reads attachment bytes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub id: String,
    pub content_type: String,
    pub uri: String,
}

/// Core → Transport structured reply.
///
/// `message` is never empty — constructing one with an empty string is a
/// programmer error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResponse {
    pub message: String,
    pub state_changed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_state: Option<String>,
    pub action_taken: String,
    pub success: bool,
    #[serde(default)]
    pub suggestions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub awaiting_confirmation: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub awaiting_input: Option<bool>,
    pub latency_ms: u64,
}

impl PipelineResponse {
    /// Builds a response, falling back to a safe placeholder if `message`
    /// is empty — callers upstream should never construct an empty message,
    /// but this keeps the external contract's never-empty guarantee true.
    pub fn new(message: impl Into<String>, action_taken: impl Into<String>, success: bool, latency_ms: u64) -> Self {
        let message = message.into();
        let message = if message.is_empty() {
            "I'm not sure how to respond to that.".to_string()
        } else {
            message
        };
        Self {
            message,
            state_changed: false,
            new_state: None,
            action_taken: action_taken.into(),
            success,
            suggestions: Vec::new(),
            awaiting_confirmation: None,
            awaiting_input: None,
            latency_ms,
        }
    }

    pub fn with_state_change(mut self, new_state: impl Into<String>) -> Self {
        self.state_changed = true;
        self.new_state = Some(new_state.into());
        self
    }

    pub fn with_suggestions(mut self, suggestions: Vec<String>) -> Self {
        self.suggestions = suggestions;
        self
    }

    pub fn awaiting(mut self, confirmation: Option<bool>, input: Option<bool>) -> Self {
        self.awaiting_confirmation = confirmation;
        self.awaiting_input = input;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_message_falls_back_to_placeholder() {
        let resp = PipelineResponse::new("", "general_conversation", true, 10);
        assert!(!resp.message.is_empty());
    }

    #[test]
    fn builder_methods_compose() {
        let resp = PipelineResponse::new("hi", "general_conversation", true, 5)
            .with_state_change("GOAL_SETTING")
            .with_suggestions(vec!["a".to_string()])
            .awaiting(Some(true), None);
        assert!(resp.state_changed);
        assert_eq!(resp.new_state.as_deref(), Some("GOAL_SETTING"));
        assert_eq!(resp.awaiting_confirmation, Some(true));
    }
}
