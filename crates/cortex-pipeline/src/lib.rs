//! The cognitive pipeline: Context → Understanding → Authorization →
//! Decision → (Orchestrator) → Execution → Response → Learning.
//!
//! [`Pipeline::run_turn`] is the single entry point every inbound message
//! must traverse. [`Pipeline::run_proactive`] is the scheduler-triggered
//! side channel, which re-enters the same Authorization Gate before
//! anything is emitted.

pub mod anthropic;
pub mod audit;
pub mod authorization;
pub mod context;
pub mod decision;
pub mod execution;
pub mod handlers;
pub mod idempotency;
pub mod learning;
pub mod openai;
pub mod orchestrator;
pub mod proactive;
pub mod provider;
pub mod response;
pub mod thinking;
pub mod types;
pub mod understanding;

use std::sync::Arc;
use std::time::Instant;

use cortex_capabilities::CapabilityRegistry;
use cortex_core::config::{FeatureFlags, MESSAGE_DEADLINE_MS};
use cortex_core::types::OrganizationId;
use cortex_hooks::HookEngine;
use cortex_memory::MemoryManager;
use cortex_scheduler::ProactiveTrigger;
use cortex_state::{ClearReason, StateManager, StateType};
use tracing::{info, warn};
use uuid::Uuid;

use crate::idempotency::IdempotencyGuard;
use crate::orchestrator::{Orchestrator, Route};
use crate::provider::LlmProvider;
use crate::response::{PipelineRequest, PipelineResponse};
use crate::types::{DecisionResult, EnforcementAction};
use crate::understanding::Understanding;

/// Everything one running instance of the cognitive core needs to process
/// turns. Cheap to clone — every field is itself an `Arc`/`Clone`-over-`Arc`
/// handle shared across the process (cortex-memory's `MemoryManager`
/// convention, see its module docs).
#[derive(Clone)]
pub struct Pipeline {
    memory: MemoryManager,
    state: Arc<StateManager>,
    registry: CapabilityRegistry,
    hooks: Arc<HookEngine>,
    llm_model: String,
    llm: Option<Arc<dyn LlmProvider>>,
    features: FeatureFlags,
    idempotency: Arc<IdempotencyGuard>,
}

impl Pipeline {
    pub fn new(
        memory: MemoryManager,
        state: StateManager,
        registry: CapabilityRegistry,
        hooks: Arc<HookEngine>,
        llm: Option<Arc<dyn LlmProvider>>,
        llm_model: impl Into<String>,
        features: FeatureFlags,
    ) -> Self {
        Self {
            memory,
            state: Arc::new(state),
            registry,
            hooks,
            llm,
            llm_model: llm_model.into(),
            features,
            idempotency: Arc::new(IdempotencyGuard::new()),
        }
    }

    /// Runs one inbound message through the full pipeline. Never panics;
    /// any internal failure degrades to a well-formed apologetic response
    /// rather than propagating — the external contract is that `message`
    /// is never empty and the caller always gets a reply.
    pub async fn run_turn(&self, request: PipelineRequest) -> PipelineResponse {
        let start = Instant::now();
        let deadline = std::time::Duration::from_millis(MESSAGE_DEADLINE_MS);

        match tokio::time::timeout(deadline, self.run_turn_inner(&request, start)).await {
            Ok(response) => response,
            Err(_) => {
                warn!(
                    organization_id = request.tenant_id.as_str(),
                    room_id = %request.room_id,
                    "message exceeded overall deadline"
                );
                PipelineResponse::new(
                    "That took longer than expected — please try again.",
                    "timeout",
                    false,
                    start.elapsed().as_millis() as u64,
                )
            }
        }
    }

    async fn run_turn_inner(&self, request: &PipelineRequest, start: Instant) -> PipelineResponse {
        let organization_id = &request.tenant_id;

        let ctx = context::build(
            &self.memory,
            organization_id,
            &request.room_id,
            &request.user_id,
            &request.sender_name,
            &request.text,
            &self.features,
        )
            .await;
        audit::context_built(&self.hooks, organization_id, &request.room_id, &request.user_id);

        let understanding_engine = Understanding::new(self.registry.clone(), self.llm.clone(), self.llm_model.clone());
        let understanding = understanding_engine.understand(&request.text, &ctx).await;
        audit::understanding_done(&self.hooks, organization_id, &request.room_id, &request.user_id, &understanding);

        let capability = self.registry.get(&understanding.intent);
        let gate = authorization::evaluate(capability, &request.text, &understanding);
        audit::gate_decided(&self.hooks, organization_id, &request.room_id, &request.user_id, &gate);

        let decision = decision::decide(&self.registry, &ctx, &understanding, &gate, &self.features);
        audit::decision_made(&self.hooks, organization_id, &request.room_id, &request.user_id, &decision);

        let orchestrator = Orchestrator::new(&self.state);
        let route = orchestrator.route(
            organization_id,
            &request.room_id,
            &request.user_id,
            &request.text,
            &understanding,
            &decision,
        );

        let (decision, reminder_suffix) = match route {
            Ok(Route::Normal) => (decision, None),
            Ok(Route::Continue(synthesized)) => (synthesized, None),
            Ok(Route::Interrupted { reminder_suffix, .. }) => (decision, Some(reminder_suffix)),
            Ok(Route::Respond {
                    message,
                    awaiting_confirmation,
                    awaiting_input,
            }) => {
                return PipelineResponse::new(message, "state_continuation", true, start.elapsed().as_millis() as u64)
                    .awaiting(awaiting_confirmation.then_some(true), awaiting_input.then_some(true));
            }
            Err(err) => {
                warn!(error = %err, "state orchestrator failed, responding with safe fallback");
                return PipelineResponse::new("Please try that again in a moment.", "state_error", false, start.elapsed().as_millis() as u64);
            }
        };

        // BLOCK_AND_SUGGEST is a block-and-redirect, not a yes/no prompt —
        // no handler runs and no confirmation state is installed.
        if decision.enforcement_action == Some(EnforcementAction::BlockAndSuggest) {
            audit::handler_invoked(&self.hooks, organization_id, &request.room_id, &request.user_id, &decision.action, false, 0, Some("blocked_and_suggest"));
            self.spawn_learning(organization_id.clone(), &decision, false, Some("blocked_and_suggest".to_string()));
            let message = "I can't help with that one directly. Let's find a different way forward, or I can point you to someone who can help.".to_string();
            return PipelineResponse::new(message, "blocked_and_suggest", false, start.elapsed().as_millis() as u64);
        }

        if decision.needs_confirmation && decision.confirmation_options.is_some() {
            if let Err(err) = self.install_confirmation_state(organization_id, &request.room_id, &request.user_id, &decision) {
                warn!(error = %err, "failed to install confirmation state");
            }
            let options = decision.confirmation_options.clone().unwrap_or_default();
            let message = format!("{} ({})", decision.reasoning, options.join("/"));
            self.spawn_learning(organization_id.clone(), &decision, true, None);
            return PipelineResponse::new(message, decision.action, true, start.elapsed().as_millis() as u64)
                .with_state_change(StateType::Confirmation.to_string())
                .awaiting(Some(true), None);
        }

        let handler_start = Instant::now();
        let result = execution::execute(&self.registry, &decision, &ctx, &self.idempotency).await;
        let latency_ms = handler_start.elapsed().as_millis() as u64;
        audit::handler_invoked(
            &self.hooks,
            organization_id,
            &request.room_id,
            &request.user_id,
            &decision.action,
            result.success,
            latency_ms,
            if result.success { None } else { Some("handler_failure") },
        );

        let mut message = result.message.clone();
        if let Some(suffix) = reminder_suffix {
            message = format!("{message} {suffix}");
        }
        // WARN_ONLY lets the handler run as normal but surfaces a heads-up
        // alongside its result instead of silently dropping the turn.
        if decision.enforcement_action == Some(EnforcementAction::WarnOnly) {
            message = format!("{message}\n\n(a heads up: let's keep things constructive.)");
        }

        let response = PipelineResponse::new(message, decision.action.clone(), result.success, start.elapsed().as_millis() as u64)
            .with_suggestions(result.suggestions.clone())
            .awaiting(result.metadata.awaiting_confirmation, result.metadata.awaiting_input);

        self.spawn_learning(organization_id.clone(), &decision, result.success, None);

        response
    }

    fn install_confirmation_state(
        &self,
        organization_id: &OrganizationId,
        room_id: &str,
        user_id: &str,
        decision: &DecisionResult,
    ) -> Result<(), cortex_state::StateError> {
        let mut data = std::collections::HashMap::new();
        data.insert("pending_action".to_string(), serde_json::Value::String(decision.action.clone()));
        data.insert("pending_params".to_string(), decision.params.clone());
        data.insert(
            "confirmation_options".to_string(),
            serde_json::Value::Array(
                decision
                    .confirmation_options
                    .clone()
                    .unwrap_or_default()
                    .into_iter()
                    .map(serde_json::Value::String)
                    .collect(),
            ),
        );
        data.insert("confirmation_retry_count".to_string(), serde_json::Value::from(0));

        self.state.transition_to(
            organization_id,
            room_id,
            user_id,
            None,
            StateType::Confirmation,
            "awaiting_response",
            data,
            None,
            None,
            cortex_core::config::DEFAULT_STATE_TIMEOUT_SECS,
        )?;
        Ok(())
    }

    fn spawn_learning(&self, organization_id: OrganizationId, decision: &DecisionResult, success: bool, reason_code: Option<String>) {
        let decision_id = Uuid::now_v7().to_string();
        learning::record_outcome(self.memory.clone(), organization_id.clone(), decision_id.clone(), decision, success, reason_code);

        if self.features.long_term_memory_enabled && decision.confidence < 0.5 {
            learning::seed_review_episode(self.memory.clone(), organization_id, decision_id, decision);
        }
    }

    /// Runs a scheduler-originated trigger through Proactive Generation.
    /// Returns `None` when the gate dropped the message — callers
    /// must not forward that to any transport.
    pub async fn run_proactive(&self, trigger: &ProactiveTrigger) -> Option<PipelineResponse> {
        proactive::generate(&self.memory, &self.registry, &self.hooks, trigger, &self.features).await
    }

    /// Clears any state entries that have expired. Intended to be driven by
    /// a periodic maintenance task, not the per-message path.
    pub fn cleanup_expired_state(&self) -> Result<usize, cortex_state::StateError> {
        self.state.cleanup_expired()
    }
}

/// Forces the current conversation out of whatever multi-step session it's
/// in. Exposed for transports that want an explicit "/cancel" command in
/// addition to the stop-word detection the orchestrator already runs.
pub fn force_clear_state(state: &StateManager, organization_id: &OrganizationId, room_id: &str, user_id: &str) -> Result<(), cortex_state::StateError> {
    state.clear(organization_id, room_id, user_id, ClearReason::UserCancel)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn force_clear_state_is_a_noop_when_nothing_is_active() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        cortex_state::db::init_db(&conn).unwrap();
        let state = StateManager::new(conn);
        let org = OrganizationId::new("org-1");
        assert!(force_clear_state(&state, &org, "room-1", "user-1").is_ok());
    }
}
