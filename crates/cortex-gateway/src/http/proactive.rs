//! `POST /proactive/trigger` — the internal entry point for the proactive
//! generator. Invoked by `cortex-scheduler`'s fired-job consumer, or directly
//! by an external scheduler that knows a trigger should fire right now.
//!
//! A generated message that the Authorization Gate drops is never surfaced
//! here either — the handler reports `204 No Content`, and the caller must
//! not retry it as if it were a delivery failure.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};

use cortex_pipeline::response::PipelineResponse;
use cortex_scheduler::ProactiveTrigger;

use crate::app::AppState;

pub async fn trigger_handler(
    State(state): State<Arc<AppState>>,
    Json(trigger): Json<ProactiveTrigger>,
) -> Result<Json<PipelineResponse>, StatusCode> {
    if !state.config.features.enable_proactive {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }

    match state.pipeline.run_proactive(&trigger).await {
        Some(response) => Ok(Json(response)),
        None => Err(StatusCode::NO_CONTENT),
    }
}
