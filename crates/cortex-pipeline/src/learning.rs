//! Learning.
//!
//! Fire-and-forget outcome/feedback writes, spawned only after the response
//! has been composed — must never block the reply.

use cortex_core::types::{Episode, OrganizationId};
use cortex_memory::MemoryManager;
use tracing::warn;
use uuid::Uuid;

use crate::types::DecisionResult;

/// Records the outcome of a completed decision on a detached task. Never
/// awaited by the caller — content is never part of the payload, only the
/// shape `{action, confidence, success, risk_level, reason_code}`.
pub fn record_outcome(
    memory: MemoryManager,
    organization_id: OrganizationId,
    decision_id: String,
    decision: &DecisionResult,
    success: bool,
    reason_code: Option<String>,
) {
    let action = decision.action.clone();
    let confidence = decision.confidence;
    let risk_level = decision.risk_level.to_string();
    tokio::spawn(async move {
            if let Err(err) = memory
                .record_outcome(
                &organization_id,
                &decision_id,
                &action,
                confidence,
                success,
                &risk_level,
                reason_code.as_deref(),
            )
                .await
            {
                warn!(error = %err, "failed to record decision outcome");
            }
    });
}

/// Seeds the low-confidence review queue: every decision below the `0.5`
/// confidence floor gets a PII-safe episode recorded against it so a human
/// reviewer (or a future Understanding pass) can revisit it later. The
/// episode summary names only the action and confidence band, never the
/// user's text.
pub fn seed_review_episode(memory: MemoryManager, organization_id: OrganizationId, decision_id: String, decision: &DecisionResult) {
    let episode = Episode {
        episode_id: Uuid::now_v7().to_string(),
        organization_id,
        user_id: None,
        episode_type: "low_confidence_review".to_string(),
        summary: format!("decision '{}' (ref {decision_id}) fell below the confidence floor at {:.2}", decision.action, decision.confidence),
        entities: vec![decision.action.clone()],
        keywords: vec!["low_confidence".to_string(), decision.risk_level.to_string()],
        importance: 1.0 - decision.confidence,
        created_at: chrono::Utc::now().to_rfc3339(),
    };

    tokio::spawn(async move {
            if let Err(err) = memory.record_episode(episode).await {
                warn!(error = %err, "failed to seed low-confidence review episode");
            }
    });
}

/// Records explicit user feedback ("helpful", "wrong", "incomplete") against
/// a prior decision id, detached from the response path.
pub fn record_feedback(memory: MemoryManager, decision_id: String, feedback: String) {
    tokio::spawn(async move {
            if let Err(err) = memory.record_feedback(&decision_id, &feedback).await {
                warn!(error = %err, "failed to record decision feedback");
            }
    });
}
