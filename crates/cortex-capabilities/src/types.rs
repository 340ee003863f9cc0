//! Capability Registry data model.

use std::collections::HashMap;

use cortex_core::types::RiskLevel;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Static, declarative description of one thing the assistant can do.
///
/// Entirely data — adding a capability means adding a row here, never
/// touching Understanding or Decision code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Capability {
    pub name: String,
    pub enabled: bool,
    pub primary_keywords: Vec<String>,
    pub secondary_keywords: Vec<String>,
    pub negative_keywords: Vec<String>,
    pub risk_level: RiskLevel,
    pub requires_confirmation: bool,
    pub dangerous: bool,
    /// Name resolved to a handler at registration time via
    /// `CapabilityRegistry::handler_for` — never a direct function pointer,
    /// so the registry stays a pure data table.
    pub handler_ref: String,
    pub intent_hints: Vec<String>,
}

/// What a capability's `metadata` field signals back to the orchestrator:
/// handlers may request more input or confirmation, but never write
/// `ConversationState` directly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HandlerMetadata {
    pub awaiting_input: Option<bool>,
    pub awaiting_confirmation: Option<bool>,
    pub pending_data: Option<HashMap<String, Value>>,
}

/// What a `CapabilityHandler::handle` call returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandlerResult {
    pub success: bool,
    pub message: String,
    pub data: Option<Value>,
    #[serde(default)]
    pub suggestions: Vec<String>,
    #[serde(default)]
    pub metadata: HandlerMetadata,
}

impl HandlerResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
            suggestions: Vec::new(),
            metadata: HandlerMetadata::default(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
            suggestions: Vec::new(),
            metadata: HandlerMetadata::default(),
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_suggestions(mut self, suggestions: Vec<String>) -> Self {
        self.suggestions = suggestions;
        self
    }
}
