use axum::{extract::State, Json};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::app::AppState;

/// `GET /health` — liveness probe. Reports whether the cognitive core is
/// enabled (the `enable_brain_architecture` kill switch) alongside the other
/// feature flags.
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
                "status": "ok",
                "brain_architecture_enabled": state.config.features.enable_brain_architecture,
                "proactive_enabled": state.config.features.enable_proactive,
                "knowledge_synthesis_enabled": state.config.features.enable_knowledge_synthesis,
                "execution_excellence_enabled": state.config.features.enable_execution_excellence,
                "truth_resolver_enabled": state.config.features.enable_truth_resolver,
                "long_term_memory_enabled": state.config.features.long_term_memory_enabled,
                "bot_persona_memory_enabled": state.config.features.bot_persona_memory_enabled,
    }))
}
