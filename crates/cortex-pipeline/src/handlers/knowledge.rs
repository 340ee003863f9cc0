use std::sync::Arc;

use async_trait::async_trait;
use cortex_capabilities::{CapabilityHandler, HandlerResult};
use cortex_knowledge::{AccessProfile, KnowledgeEngine};
use cortex_memory::AllContext;
use serde_json::Value;

/// Wraps Knowledge Retrieval + Synthesis. Access is computed from the
/// caller's department membership, never from the question text — a
/// question can't ask its way into a wider `AccessProfile`.
pub struct SearchKnowledgeHandler {
    engine: Arc<KnowledgeEngine>,
    synthesis_enabled: bool,
}

impl SearchKnowledgeHandler {
    /// `synthesis_enabled` mirrors `enable_knowledge_synthesis` — read once
    /// at registry assembly, the same boot-time treatment the capability
    /// registry itself gets (spec.md §5: "capability registry is read-only
    /// after boot").
    pub fn new(engine: Arc<KnowledgeEngine>, synthesis_enabled: bool) -> Self {
        Self { engine, synthesis_enabled }
    }
}

#[async_trait]
impl CapabilityHandler for SearchKnowledgeHandler {
    async fn handle(&self, params: Value, _room_id: &str, _user_id: &str, _sender_name: &str, _context: &AllContext) -> HandlerResult {
        let Some(question) = params.get("question").and_then(|v| v.as_str()) else {
            return HandlerResult::failed("missing question");
        };

        let access = match params.get("department_ids").and_then(|v| v.as_array()) {
            Some(ids) if !ids.is_empty() => {
                let ids: Vec<String> = ids.iter().filter_map(|v| v.as_str().map(|s| s.to_string())).collect();
                AccessProfile::confidential_for_departments(ids)
            }
            _ => AccessProfile::non_confidential(),
        };

        match self.engine.answer(question, &access, self.synthesis_enabled).await {
            Ok(answer) if answer.answer_refused => {
                HandlerResult::ok(answer.message).with_suggestions(vec!["try rephrasing the question".to_string()])
            }
            Ok(answer) => HandlerResult::ok(answer.message).with_data(serde_json::json!({"citations": answer.citations})),
            Err(err) => HandlerResult::failed(format!("knowledge lookup failed: {err}")),
        }
    }
}
