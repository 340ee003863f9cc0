//! Decision.
//!
//! Weighted scoring over capability candidates, multi-action detection, and
//! the confirmation-required rule.

use cortex_capabilities::{Capability, CapabilityRegistry};
use cortex_core::config::FeatureFlags;
use cortex_core::types::RiskLevel;
use serde_json::Value;

use crate::types::{Context, DecisionResult, EnforcementAction, GateDecision, GateLevel, MultiActionStep, UnderstandingResult};

/// Weights sum to 1.0.
const W_KEYWORD: f32 = 0.30;
const W_INTENT_MATCH: f32 = 0.20;
const W_RECENT_USE: f32 = 0.15;
const W_LIFE_AXIS: f32 = 0.15;
const W_CONTEXT_FIT: f32 = 0.15;
const W_NEGATIVE_PENALTY: f32 = 0.05;

/// A candidate with a raw keyword score below this never wins the decision.
const CAPABILITY_MIN_SCORE_THRESHOLD: f32 = 0.35;

const SPLITTER_PATTERNS: &[&str] = &["and then", "then", "、それから"];

/// Picks the highest-scoring capability candidate (or a coordinated
/// multi-step plan), and decides whether confirmation is required.
pub fn decide(
    registry: &CapabilityRegistry,
    ctx: &Context,
    understanding: &UnderstandingResult,
    gate: &GateDecision,
    flags: &FeatureFlags,
) -> DecisionResult {
    // FORCE_LISTENING overrides whatever capability the keyword/scoring
    // pass would have picked — a distress pattern routes straight to the
    // forced-listening handler regardless of the matched candidate.
    if gate.enforcement_action == EnforcementAction::ForceListening {
        return DecisionResult {
            action: "forced_listening".to_string(),
            params: build_params("forced_listening", ctx, understanding),
            confidence: 1.0,
            needs_confirmation: false,
            confirmation_options: None,
            risk_level: RiskLevel::Critical,
            reasoning: "distress pattern detected, bypassing capability selection".to_string(),
            enforcement_action: Some(EnforcementAction::ForceListening),
            multi_action_plan: None,
        };
    }

    let candidates = registry.score_candidates(Some(&understanding.intent), &understanding.raw_message);
    let scored: Vec<(&Capability, f32)> = candidates
        .into_iter()
        .map(|(cap, keyword_score)| {
            let score = weighted_score(cap, keyword_score, ctx, understanding, flags);
            (cap, score)
    })
        .collect();

    let above_threshold: Vec<&(&Capability, f32)> =
    scored.iter().filter(|(_, score)| *score >= CAPABILITY_MIN_SCORE_THRESHOLD).collect();

    let multi_action_plan = if flags.enable_execution_excellence && contains_splitter(&understanding.raw_message) && above_threshold.len() >= 2 {
        Some(
            above_threshold
                .iter()
                .take(2)
                .map(|(cap, _)| MultiActionStep {
                    params: build_params(&cap.name, ctx, understanding),
                    action: cap.name.clone(),
            })
                .collect::<Vec<_>>(),
        )
    } else {
        None
    };

    let best = above_threshold
        .iter()
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

    let (action, risk_level, dangerous, confidence, reasoning) = match best {
        Some((cap, score)) => (
            cap.name.clone(),
            cap.risk_level,
            cap.dangerous,
            *score,
            format!("selected '{}' with score {:.2}", cap.name, score),
        ),
        None => (
            "general_conversation".to_string(),
            RiskLevel::Low,
            false,
            understanding.intent_confidence,
            "no candidate cleared the minimum score threshold".to_string(),
        ),
    };

    let enforcement_action = if gate.enforcement_action != EnforcementAction::None {
        Some(gate.enforcement_action)
    } else {
        None
    };

    // BLOCK_AND_SUGGEST and WARN_ONLY get their own response branches in the
    // pipeline (block-and-redirect, execute-with-a-warning) rather than the
    // generic yes/no confirmation prompt, so neither forces it here.
    let needs_confirmation = !matches!(gate.enforcement_action, EnforcementAction::BlockAndSuggest | EnforcementAction::WarnOnly)
    && (confidence < 0.7 || dangerous || gate.level != GateLevel::AutoApprove);

    let params = build_params(&action, ctx, understanding);

    DecisionResult {
        action,
        params,
        confidence,
        needs_confirmation,
        confirmation_options: if needs_confirmation {
            Some(vec!["yes".to_string(), "no".to_string()])
        } else {
            None
        },
        risk_level,
        reasoning,
        enforcement_action,
        multi_action_plan,
    }
}

fn weighted_score(capability: &Capability, keyword_score: f32, ctx: &Context, understanding: &UnderstandingResult, flags: &FeatureFlags) -> f32 {
    let intent_match = if capability.intent_hints.iter().any(|h| h.eq_ignore_ascii_case(&understanding.intent)) {
        1.0
    } else {
        0.0
    };
    let recent_use = recent_use_score(capability, ctx);
    let life_axis_alignment = if flags.enable_truth_resolver { life_axis_alignment(ctx) } else { 0.5 };
    let context_fit = if understanding.needs_clarification { 0.3 } else { 0.8 };
    let negative_penalty = if understanding.resolved_pronouns.iter().any(|p| p.confidence < 0.5) {
        1.0
    } else {
        0.0
    };

    let score = W_KEYWORD * keyword_score
    + W_INTENT_MATCH * intent_match
    + W_RECENT_USE * recent_use
    + W_LIFE_AXIS * life_axis_alignment
    + W_CONTEXT_FIT * context_fit
    - W_NEGATIVE_PENALTY * negative_penalty;

    score.clamp(0.0, 1.0)
}

fn recent_use_score(capability: &Capability, ctx: &Context) -> f32 {
    let used_recently = ctx
        .all
        .recent_conversation
        .iter()
        .any(|turn| turn.content.to_lowercase().contains(&capability.name.replace('_', " ")));
    if used_recently {
        0.7
    } else {
        0.3
    }
}

/// Reads long-term memory/values for alignment. Neutral 0.5 when the user
/// hasn't recorded any preferences yet, or when `enable_truth_resolver` is
/// off (the caller skips calling this entirely in that case).
fn life_axis_alignment(ctx: &Context) -> f32 {
    if ctx.all.preferences.interests.is_empty() {
        0.5
    } else {
        0.6
    }
}

/// Builds the `params` object a capability's handler expects, from the turn's
/// `Context` and `UnderstandingResult`. Every capability gets `organization_id`
///; capabilities with a
/// free-text payload (task body, goal title, announcement text, knowledge
/// question) get the raw message under the field name their handler reads,
/// since this distilled Understanding pass doesn't extract that field more
/// precisely than "the rest of what the user said".
fn build_params(action: &str, ctx: &Context, understanding: &UnderstandingResult) -> Value {
    let mut params = serde_json::Map::new();
    params.insert("organization_id".to_string(), Value::String(ctx.organization_id.as_str().to_string()));

    match action {
        "create_task" => {
            params.insert("task_body".to_string(), Value::String(understanding.raw_message.clone()));
            if let Some(person) = understanding.entities.get("person") {
                params.insert("assigned_to".to_string(), Value::String(person.clone()));
            }
        }
        "register_goal" => {
            params.insert("title".to_string(), Value::String(understanding.raw_message.clone()));
            if let Some(why) = understanding.entities.get("why") {
                params.insert("why".to_string(), Value::String(why.clone()));
            }
        }
        "create_announcement" => {
            params.insert("text".to_string(), Value::String(understanding.raw_message.clone()));
            if let Some(channel) = understanding.entities.get("channel") {
                params.insert("channel".to_string(), Value::String(channel.clone()));
            }
        }
        "search_knowledge" => {
            params.insert("question".to_string(), Value::String(understanding.raw_message.clone()));
        }
        _ => {}
    }

    Value::Object(params)
}

fn contains_splitter(message: &str) -> bool {
    let lower = message.to_lowercase();
    SPLITTER_PATTERNS.iter().any(|p| lower.contains(p))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cortex_capabilities::{CapabilityHandler, HandlerResult};
    use std::sync::Arc;

    struct NoopHandler;
    #[async_trait::async_trait]
    impl CapabilityHandler for NoopHandler {
        async fn handle(&self, _params: Value, _room_id: &str, _user_id: &str, _sender_name: &str, _context: &cortex_memory::AllContext) -> HandlerResult {
            HandlerResult::ok("noop")
        }
    }

    fn cap(name: &str, primary: &[&str], risk: RiskLevel) -> Capability {
        Capability {
            name: name.to_string(),
            enabled: true,
            primary_keywords: primary.iter().map(|s| s.to_string()).collect(),
            secondary_keywords: vec![],
            negative_keywords: vec![],
            risk_level: risk,
            requires_confirmation: false,
            dangerous: false,
            handler_ref: name.to_string(),
            intent_hints: vec![name.to_string()],
        }
    }

    fn test_ctx() -> Context {
        Context {
            organization_id: cortex_core::types::OrganizationId::new("org-1"),
            room_id: "room-1".to_string(),
            user_id: "user-1".to_string(),
            sender_name: "Alice".to_string(),
            message_text: "list my tasks".to_string(),
            all: cortex_memory::AllContext::default(),
        }
    }

    fn test_understanding(intent: &str, confidence: f32) -> UnderstandingResult {
        UnderstandingResult {
            intent: intent.to_string(),
            intent_confidence: confidence,
            entities: Default::default(),
            resolved_pronouns: vec![],
            urgency: crate::types::Urgency::Low,
            emotion: crate::types::Emotion::Neutral,
            raw_message: "list my tasks".to_string(),
            needs_clarification: false,
        }
    }

    #[test]
    fn falls_back_to_general_conversation_below_threshold() {
        let registry = CapabilityRegistry::new(vec![(cap("obscure_thing", &["zzz"], RiskLevel::Low), Arc::new(NoopHandler))]);
        let ctx = test_ctx();
        let understanding = test_understanding("general_conversation", 0.9);
        let gate = GateDecision {
            level: GateLevel::AutoApprove,
            enforcement_action: EnforcementAction::None,
            reason: "ok".to_string(),
        };
        let result = decide(&registry, &ctx, &understanding, &gate, &FeatureFlags::default());
        assert_eq!(result.action, "general_conversation");
    }

    #[test]
    fn selects_best_candidate_above_threshold() {
        let registry = CapabilityRegistry::new(vec![(cap("list_tasks", &["tasks", "list"], RiskLevel::Low), Arc::new(NoopHandler))]);
        let ctx = test_ctx();
        let understanding = test_understanding("list_tasks", 0.9);
        let gate = GateDecision {
            level: GateLevel::AutoApprove,
            enforcement_action: EnforcementAction::None,
            reason: "ok".to_string(),
        };
        let result = decide(&registry, &ctx, &understanding, &gate, &FeatureFlags::default());
        assert_eq!(result.action, "list_tasks");
        assert!(!result.needs_confirmation);
    }

    #[test]
    fn dangerous_capability_always_needs_confirmation() {
        let mut dangerous_cap = cap("delete_all", &["delete", "all"], RiskLevel::Low);
        dangerous_cap.dangerous = true;
        let registry = CapabilityRegistry::new(vec![(dangerous_cap, Arc::new(NoopHandler))]);
        let ctx = test_ctx();
        let understanding = test_understanding("delete_all", 0.95);
        let gate = GateDecision {
            level: GateLevel::AutoApprove,
            enforcement_action: EnforcementAction::None,
            reason: "ok".to_string(),
        };
        let result = decide(&registry, &ctx, &understanding, &gate, &FeatureFlags::default());
        assert!(result.needs_confirmation);
    }

    #[test]
    fn multi_action_plan_suppressed_when_execution_excellence_disabled() {
        let registry = CapabilityRegistry::new(vec![
            (cap("list_tasks", &["tasks"], RiskLevel::Low), Arc::new(NoopHandler)),
            (cap("register_goal", &["goal"], RiskLevel::Medium), Arc::new(NoopHandler)),
        ]);
        let mut ctx = test_ctx();
        ctx.message_text = "list my tasks and then set a goal".to_string();
        let mut understanding = test_understanding("list_tasks", 0.9);
        understanding.raw_message = ctx.message_text.clone();
        let gate = GateDecision {
            level: GateLevel::AutoApprove,
            enforcement_action: EnforcementAction::None,
            reason: "ok".to_string(),
        };

        let with_planner = decide(&registry, &ctx, &understanding, &gate, &FeatureFlags::default());
        assert!(with_planner.multi_action_plan.is_some());

        let mut flags = FeatureFlags::default();
        flags.enable_execution_excellence = false;
        let without_planner = decide(&registry, &ctx, &understanding, &gate, &flags);
        assert!(without_planner.multi_action_plan.is_none());
    }

    #[test]
    fn force_listening_overrides_the_matched_capability() {
        let registry = CapabilityRegistry::new(vec![(cap("general_conversation", &[], RiskLevel::Low), Arc::new(NoopHandler))]);
        let ctx = test_ctx();
        let understanding = test_understanding("general_conversation", 0.9);
        let gate = GateDecision {
            level: GateLevel::RequireDoubleCheck,
            enforcement_action: EnforcementAction::ForceListening,
            reason: "safety pattern detected: distress".to_string(),
        };
        let result = decide(&registry, &ctx, &understanding, &gate, &FeatureFlags::default());
        assert_eq!(result.action, "forced_listening");
        assert_eq!(result.confidence, 1.0);
        assert_eq!(result.risk_level, RiskLevel::Critical);
        assert!(!result.needs_confirmation);
        assert!(result.confirmation_options.is_none());
        assert_eq!(result.enforcement_action, Some(EnforcementAction::ForceListening));
    }

    #[test]
    fn block_and_suggest_does_not_force_the_yes_no_confirmation_prompt() {
        let mut critical_cap = cap("leak_secrets", &["secret"], RiskLevel::Critical);
        critical_cap.dangerous = true;
        let registry = CapabilityRegistry::new(vec![(critical_cap, Arc::new(NoopHandler))]);
        let ctx = test_ctx();
        let understanding = test_understanding("leak_secrets", 0.9);
        let gate = GateDecision {
            level: GateLevel::RequireDoubleCheck,
            enforcement_action: EnforcementAction::BlockAndSuggest,
            reason: "safety pattern detected: security_leak".to_string(),
        };
        let result = decide(&registry, &ctx, &understanding, &gate, &FeatureFlags::default());
        assert!(!result.needs_confirmation);
        assert!(result.confirmation_options.is_none());
        assert_eq!(result.enforcement_action, Some(EnforcementAction::BlockAndSuggest));
    }

    #[test]
    fn warn_only_does_not_force_the_yes_no_confirmation_prompt() {
        let registry = CapabilityRegistry::new(vec![(cap("general_conversation", &[], RiskLevel::Low), Arc::new(NoopHandler))]);
        let ctx = test_ctx();
        let understanding = test_understanding("general_conversation", 0.9);
        let gate = GateDecision {
            level: GateLevel::RequireDoubleCheck,
            enforcement_action: EnforcementAction::WarnOnly,
            reason: "safety pattern detected: company_criticism".to_string(),
        };
        let result = decide(&registry, &ctx, &understanding, &gate, &FeatureFlags::default());
        assert!(!result.needs_confirmation);
        assert_eq!(result.enforcement_action, Some(EnforcementAction::WarnOnly));
    }
}
