//! Shared shapes that flow between pipeline stages.
//!
//! None of these types own I/O — they are passed by value or reference
//! between the pure/near-pure stage functions in this crate.

use std::collections::HashMap;

use cortex_core::types::{OrganizationId, RiskLevel};
use cortex_memory::AllContext;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Per-turn snapshot assembled by the Context Builder.
///
/// `all` holds every Memory Access slice; the remaining fields are the
/// inbound message the turn is about. Lives only for the duration of one
/// pipeline run — never persisted.
#[derive(Debug, Clone)]
pub struct Context {
    pub organization_id: OrganizationId,
    pub room_id: String,
    pub user_id: String,
    pub sender_name: String,
    pub message_text: String,
    pub all: AllContext,
}

/// Urgency bucket assigned by Understanding step 5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Urgency {
    Low,
    Medium,
    High,
    Critical,
}

impl Default for Urgency {
    fn default() -> Self {
        Urgency::Low
    }
}

/// Emotion bucket assigned by Understanding step 6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Positive,
    Negative,
    Neutral,
}

impl Default for Emotion {
    fn default() -> Self {
        Emotion::Neutral
    }
}

/// A pronoun resolved against recent conversation, with the distance-weighted
/// confidence Understanding step 2 produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedPronoun {
    pub pronoun: String,
    pub resolved_to: String,
    pub confidence: f32,
}

/// Output of Understanding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnderstandingResult {
    pub intent: String,
    pub intent_confidence: f32,
    pub entities: HashMap<String, String>,
    pub resolved_pronouns: Vec<ResolvedPronoun>,
    pub urgency: Urgency,
    pub emotion: Emotion,
    pub raw_message: String,
    /// Set when any resolution step fell below its confidence threshold and
    /// the pipeline should prefer asking over guessing.
    pub needs_clarification: bool,
}

impl UnderstandingResult {
    /// The fallback result the intent-resolution fallback / the `< 0.5`
    /// confidence rule produces: `general_conversation` with a
    /// clarification flag.
    pub fn fallback(raw_message: impl Into<String>) -> Self {
        Self {
            intent: "general_conversation".to_string(),
            intent_confidence: 0.0,
            entities: HashMap::new(),
            resolved_pronouns: Vec::new(),
            urgency: Urgency::Low,
            emotion: Emotion::Neutral,
            raw_message: raw_message.into(),
            needs_clarification: true,
        }
    }
}

/// The gate's override instruction to the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnforcementAction {
    ForceListening,
    BlockAndSuggest,
    WarnOnly,
    None,
}

impl Default for EnforcementAction {
    fn default() -> Self {
        EnforcementAction::None
    }
}

/// Three-level risk decision produced by the Authorization Gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GateLevel {
    AutoApprove,
    RequireConfirmation,
    RequireDoubleCheck,
}

/// Full output of the Authorization Gate. Pure — produced from in-memory
/// inputs only, no I/O.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateDecision {
    pub level: GateLevel,
    pub enforcement_action: EnforcementAction,
    pub reason: String,
}

/// One step of a coordinated multi-action plan (multi-action detection).
/// Executed in message order — the declared tiebreak when two
/// candidates score above threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiActionStep {
    pub action: String,
    pub params: Value,
}

/// Output of Decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionResult {
    pub action: String,
    pub params: Value,
    pub confidence: f32,
    pub needs_confirmation: bool,
    pub confirmation_options: Option<Vec<String>>,
    pub risk_level: RiskLevel,
    pub reasoning: String,
    pub enforcement_action: Option<EnforcementAction>,
    /// Populated only when multi-action detection fires. `action`/
    /// `params` above still describe the first step for callers that don't
    /// special-case plans.
    pub multi_action_plan: Option<Vec<MultiActionStep>>,
}
