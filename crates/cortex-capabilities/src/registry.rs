//! The capability registry itself: a one-method async `CapabilityHandler`
//! contract bound to each `Capability.handler_ref` at registration time.
//! Handlers take the full pipeline `Context` and return a structured
//! `HandlerResult` instead of plain text.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use cortex_memory::AllContext;
use serde_json::Value;

use crate::types::{Capability, HandlerResult};

/// One capability's executable side. Bound to a `Capability.handler_ref` by
/// name at registration time — the registry never holds a raw function
/// pointer, keeping the table itself pure data.
#[async_trait]
pub trait CapabilityHandler: Send + Sync {
    async fn handle(
        &self,
        params: Value,
        room_id: &str,
        user_id: &str,
        sender_name: &str,
        context: &AllContext,
    ) -> HandlerResult;
}

/// Relative contribution of each keyword tier to a candidate's score.
const PRIMARY_WEIGHT: f32 = 0.6;
const SECONDARY_WEIGHT: f32 = 0.25;
const INTENT_HINT_BONUS: f32 = 0.15;

/// Process-wide immutable table, built once at startup and never mutated
/// afterward. Cloning is cheap — every handler is behind an `Arc`.
#[derive(Clone)]
pub struct CapabilityRegistry {
    capabilities: Vec<Capability>,
    handlers: HashMap<String, Arc<dyn CapabilityHandler>>,
}

impl CapabilityRegistry {
    pub fn new(entries: Vec<(Capability, Arc<dyn CapabilityHandler>)>) -> Self {
        let mut capabilities = Vec::with_capacity(entries.len());
        let mut handlers = HashMap::with_capacity(entries.len());
        for (capability, handler) in entries {
            handlers.insert(capability.handler_ref.clone(), handler);
            capabilities.push(capability);
        }
        Self {
            capabilities,
            handlers,
        }
    }

    pub fn get(&self, name: &str) -> Option<&Capability> {
        self.capabilities.iter().find(|c| c.name == name)
    }

    pub fn handler_for(&self, handler_ref: &str) -> Option<Arc<dyn CapabilityHandler>> {
        self.handlers.get(handler_ref).cloned()
    }

    pub fn all(&self) -> &[Capability] {
        &self.capabilities
    }

    /// Score every enabled capability against a message, highest first.
    /// Disabled capabilities and zero-score candidates are omitted — callers
    /// treat an empty result as "no capability matched", falling
    /// back to `general_conversation`.
    pub fn score_candidates(&self, intent_hint: Option<&str>, message: &str) -> Vec<(&Capability, f32)> {
        let message_lower = message.to_lowercase();
        let mut scored: Vec<(&Capability, f32)> = self
            .capabilities
            .iter()
            .filter(|c| c.enabled)
            .map(|c| (c, score_one(c, intent_hint, &message_lower)))
            .filter(|(_, score)| *score > 0.0)
            .collect();

        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored
    }
}

fn score_one(capability: &Capability, intent_hint: Option<&str>, message_lower: &str) -> f32 {
    if capability
        .negative_keywords
        .iter()
        .any(|k| message_lower.contains(&k.to_lowercase()))
    {
        return 0.0;
    }

    let mut score = 0.0f32;

    if !capability.primary_keywords.is_empty() {
        let hits = capability
            .primary_keywords
            .iter()
            .filter(|k| message_lower.contains(&k.to_lowercase()))
            .count();
        if hits > 0 {
            score += PRIMARY_WEIGHT * (hits as f32 / capability.primary_keywords.len() as f32).min(1.0);
        }
    }

    if !capability.secondary_keywords.is_empty() {
        let hits = capability
            .secondary_keywords
            .iter()
            .filter(|k| message_lower.contains(&k.to_lowercase()))
            .count();
        if hits > 0 {
            score += SECONDARY_WEIGHT * (hits as f32 / capability.secondary_keywords.len() as f32).min(1.0);
        }
    }

    if let Some(hint) = intent_hint {
        if capability.intent_hints.iter().any(|h| h.eq_ignore_ascii_case(hint)) {
            score += INTENT_HINT_BONUS;
        }
    }

    score.min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cortex_core::types::RiskLevel;

    fn capability(name: &str, primary: &[&str], negative: &[&str]) -> Capability {
        Capability {
            name: name.to_string(),
            enabled: true,
            primary_keywords: primary.iter().map(|s| s.to_string()).collect(),
            secondary_keywords: vec![],
            negative_keywords: negative.iter().map(|s| s.to_string()).collect(),
            risk_level: RiskLevel::Low,
            requires_confirmation: false,
            dangerous: false,
            handler_ref: format!("{name}_handler"),
            intent_hints: vec![],
        }
    }

    struct NoopHandler;

    #[async_trait]
    impl CapabilityHandler for NoopHandler {
        async fn handle(
            &self,
            _params: Value,
            _room_id: &str,
            _user_id: &str,
            _sender_name: &str,
            _context: &AllContext,
        ) -> HandlerResult {
            HandlerResult::ok("noop")
        }
    }

    #[test]
    fn score_candidates_ranks_by_keyword_match_and_skips_negative_hits() {
        let registry = CapabilityRegistry::new(vec![
                (capability("list_tasks", &["tasks", "todo"], &[]), Arc::new(NoopHandler)),
                (capability("create_goal", &["goal"], &["cancel goal"]), Arc::new(NoopHandler)),
        ]);

        let scored = registry.score_candidates(None, "show me my tasks for today");
        assert_eq!(scored[0].0.name, "list_tasks");

        let scored = registry.score_candidates(None, "cancel goal please");
        assert!(scored.iter().all(|(c, _)| c.name != "create_goal"));
    }

    #[test]
    fn disabled_capability_never_surfaces() {
        let mut cap = capability("archived", &["archived"], &[]);
        cap.enabled = false;
        let registry = CapabilityRegistry::new(vec![(cap, Arc::new(NoopHandler))]);
        assert!(registry.score_candidates(None, "archived thing").is_empty());
    }

    #[test]
    fn intent_hint_adds_bonus_but_does_not_match_alone() {
        let mut cap = capability("create_task", &["task"], &[]);
        cap.intent_hints = vec!["task_management".to_string()];
        let registry = CapabilityRegistry::new(vec![(cap, Arc::new(NoopHandler))]);

        let with_hint = registry.score_candidates(Some("task_management"), "add a task");
        let without_hint = registry.score_candidates(None, "add a task");
        assert!(with_hint[0].1 > without_hint[0].1);
    }

    #[test]
    fn handler_for_resolves_by_handler_ref() {
        let registry = CapabilityRegistry::new(vec![(capability("list_tasks", &["tasks"], &[]), Arc::new(NoopHandler))]);
        assert!(registry.handler_for("list_tasks_handler").is_some());
        assert!(registry.handler_for("missing").is_none());
    }
}
