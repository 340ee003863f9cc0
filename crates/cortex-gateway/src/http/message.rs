//! `POST /message` — Transport → Core, the primary inbound entry contract.
//!
//! Every inbound chat message, regardless of which platform adapter produced
//! it, arrives here as the same shape and is handed straight to
//! [`cortex_pipeline::Pipeline::run_turn`] — the single decision-core
//! traversal every reply must come from.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};

use cortex_channels::InboundMessage;
use cortex_pipeline::response::{Attachment as PipelineAttachment, PipelineRequest, PipelineResponse};

use crate::app::AppState;

/// Maps the transport contract onto the pipeline's own request shape. Kept
/// as a separate conversion (rather than reusing one type for both) so
/// `cortex-channels`' transport contract can evolve independently of the
/// pipeline's internal request shape.
fn to_pipeline_request(inbound: InboundMessage) -> PipelineRequest {
    PipelineRequest {
        tenant_id: inbound.tenant_id,
        room_id: inbound.room_id,
        user_id: inbound.user_id,
        sender_name: inbound.sender_name,
        text: inbound.text,
        attachments: inbound
            .attachments
            .into_iter()
            .map(|a| PipelineAttachment {
                id: a.id,
                content_type: a.content_type,
                uri: a.uri,
        })
            .collect(),
    }
}

pub async fn message_handler(
    State(state): State<Arc<AppState>>,
    Json(inbound): Json<InboundMessage>,
) -> Result<Json<PipelineResponse>, (StatusCode, Json<serde_json::Value>)> {
    if !state.config.features.enable_brain_architecture {
        return Err((
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({"error": "system unavailable"})),
        ));
    }

    if inbound.text.trim().is_empty() {
        return Err((
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({"error": "text must not be empty"})),
        ));
    }

    let request = to_pipeline_request(inbound);
    let response = state.pipeline.run_turn(request).await;
    Ok(Json(response))
}
