//! Authorization Gate.
//!
//! Pure three-level decision from capability risk, detected safety patterns,
//! and understanding confidence — no I/O, no async.

use cortex_capabilities::Capability;
use cortex_core::types::RiskLevel;

use crate::types::{EnforcementAction, GateDecision, GateLevel, UnderstandingResult};

const CONFIRMATION_CONFIDENCE_LOW: f32 = 0.5;
const CONFIRMATION_CONFIDENCE_HIGH: f32 = 0.7;

const DISTRESS_PATTERNS: &[&str] = &[
    "kill myself", "want to die", "end it all", "self harm", "死にたい",
];
const SECURITY_LEAK_PATTERNS: &[&str] = &[
    "api key", "password is", "secret key", "access token",
];
const COMPANY_CRITICISM_PATTERNS: &[&str] = &["this company is terrible", "i hate working here"];

/// Evaluates the gate for a single capability candidate. `capability` is
/// `None` for unknown/unregistered capabilities, which default to
/// `REQUIRE_CONFIRMATION`.
pub fn evaluate(capability: Option<&Capability>, message: &str, understanding: &UnderstandingResult) -> GateDecision {
    if let Some(pattern) = detect_safety_pattern(message) {
        return GateDecision {
            level: GateLevel::RequireDoubleCheck,
            enforcement_action: pattern.enforcement_action(),
            reason: format!("safety pattern detected: {}", pattern.label()),
        };
    }

    let capability = match capability {
        Some(c) => c,
        None => {
            return GateDecision {
                level: GateLevel::RequireConfirmation,
                enforcement_action: EnforcementAction::None,
                reason: "unknown capability".to_string(),
            };
        }
    };

    if capability.risk_level == RiskLevel::Critical {
        return GateDecision {
            level: GateLevel::RequireDoubleCheck,
            enforcement_action: EnforcementAction::BlockAndSuggest,
            reason: "capability risk level is CRITICAL".to_string(),
        };
    }

    if capability.risk_level == RiskLevel::High
    || capability.requires_confirmation
    || (understanding.intent_confidence >= CONFIRMATION_CONFIDENCE_LOW
        && understanding.intent_confidence < CONFIRMATION_CONFIDENCE_HIGH)
    {
        return GateDecision {
            level: GateLevel::RequireConfirmation,
            enforcement_action: EnforcementAction::None,
            reason: gate_reason(capability, understanding),
        };
    }

    GateDecision {
        level: GateLevel::AutoApprove,
        enforcement_action: EnforcementAction::None,
        reason: "LOW/MEDIUM risk, no negative pattern".to_string(),
    }
}

fn gate_reason(capability: &Capability, understanding: &UnderstandingResult) -> String {
    if capability.risk_level == RiskLevel::High {
        "capability risk level is HIGH".to_string()
    } else if capability.requires_confirmation {
        "capability requires confirmation".to_string()
    } else {
        format!("understanding confidence {:.2} is in the confirmation band", understanding.intent_confidence)
    }
}

enum SafetyPattern {
    Distress,
    SecurityLeak,
    CompanyCriticism,
}

impl SafetyPattern {
    fn label(&self) -> &'static str {
        match self {
            SafetyPattern::Distress => "distress",
            SafetyPattern::SecurityLeak => "security_leak",
            SafetyPattern::CompanyCriticism => "company_criticism",
        }
    }

    fn enforcement_action(&self) -> EnforcementAction {
        match self {
            SafetyPattern::Distress => EnforcementAction::ForceListening,
            SafetyPattern::SecurityLeak => EnforcementAction::BlockAndSuggest,
            SafetyPattern::CompanyCriticism => EnforcementAction::WarnOnly,
        }
    }
}

fn detect_safety_pattern(message: &str) -> Option<SafetyPattern> {
    let lower = message.to_lowercase();
    if DISTRESS_PATTERNS.iter().any(|p| lower.contains(p)) {
        return Some(SafetyPattern::Distress);
    }
    if SECURITY_LEAK_PATTERNS.iter().any(|p| lower.contains(p)) {
        return Some(SafetyPattern::SecurityLeak);
    }
    if COMPANY_CRITICISM_PATTERNS.iter().any(|p| lower.contains(p)) {
        return Some(SafetyPattern::CompanyCriticism);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capability(risk: RiskLevel, requires_confirmation: bool) -> Capability {
        Capability {
            name: "test_cap".to_string(),
            enabled: true,
            primary_keywords: vec![],
            secondary_keywords: vec![],
            negative_keywords: vec![],
            risk_level: risk,
            requires_confirmation,
            dangerous: false,
            handler_ref: "test_cap".to_string(),
            intent_hints: vec![],
        }
    }

    fn understanding(confidence: f32) -> UnderstandingResult {
        UnderstandingResult {
            intent: "test_cap".to_string(),
            intent_confidence: confidence,
            entities: Default::default(),
            resolved_pronouns: vec![],
            urgency: crate::types::Urgency::Low,
            emotion: crate::types::Emotion::Neutral,
            raw_message: "hi".to_string(),
            needs_clarification: false,
        }
    }

    #[test]
    fn low_risk_no_pattern_auto_approves() {
        let cap = capability(RiskLevel::Low, false);
        let decision = evaluate(Some(&cap), "list my tasks", &understanding(0.9));
        assert_eq!(decision.level, GateLevel::AutoApprove);
    }

    #[test]
    fn high_risk_requires_confirmation() {
        let cap = capability(RiskLevel::High, false);
        let decision = evaluate(Some(&cap), "delete everything", &understanding(0.9));
        assert_eq!(decision.level, GateLevel::RequireConfirmation);
    }

    #[test]
    fn critical_risk_requires_double_check_and_blocks() {
        let cap = capability(RiskLevel::Critical, false);
        let decision = evaluate(Some(&cap), "wire all funds", &understanding(0.9));
        assert_eq!(decision.level, GateLevel::RequireDoubleCheck);
        assert_eq!(decision.enforcement_action, EnforcementAction::BlockAndSuggest);
    }

    #[test]
    fn distress_pattern_forces_listening_regardless_of_capability() {
        let cap = capability(RiskLevel::Low, false);
        let decision = evaluate(Some(&cap), "I just want to die", &understanding(0.9));
        assert_eq!(decision.level, GateLevel::RequireDoubleCheck);
        assert_eq!(decision.enforcement_action, EnforcementAction::ForceListening);
    }

    #[test]
    fn unknown_capability_defaults_to_require_confirmation() {
        let decision = evaluate(None, "do the unknown thing", &understanding(0.9));
        assert_eq!(decision.level, GateLevel::RequireConfirmation);
    }

    #[test]
    fn mid_confidence_requires_confirmation() {
        let cap = capability(RiskLevel::Low, false);
        let decision = evaluate(Some(&cap), "list my tasks", &understanding(0.6));
        assert_eq!(decision.level, GateLevel::RequireConfirmation);
    }
}
