use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use cortex_core::config::CortexConfig;
use cortex_hooks::HookEngine;
use cortex_pipeline::Pipeline;
use cortex_scheduler::SchedulerHandle;
use cortex_users::UserResolver;

/// Central shared state — passed as `Arc<AppState>` to every Axum handler.
///
/// Every field is already internally `Arc`/`Clone`-over-`Arc` (see each
/// crate's own module docs), so cloning `AppState` itself is never needed —
/// handlers only ever see it behind `State(Arc<AppState>)`.
pub struct AppState {
    pub config: CortexConfig,
    pub pipeline: Pipeline,
    pub users: UserResolver,
    pub scheduler: SchedulerHandle,
    pub hooks: Arc<HookEngine>,
}

/// Assemble the full Axum router: the two entry contracts (inbound message,
/// proactive trigger) plus a liveness probe. No WS, no chat UI, no
/// OpenAI-compat facade, no MCP bridge — those surfaces belonged to the
/// teacher's chat-platform/IDE adapters, which are out of scope here (see
/// DESIGN.md's Drops table).
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(crate::http::health::health_handler))
        .route("/message", post(crate::http::message::message_handler))
        .route("/proactive/trigger", post(crate::http::proactive::trigger_handler))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
