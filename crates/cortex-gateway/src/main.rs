use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

mod app;
mod capabilities;
mod http;

use cortex_capabilities::CapabilityRegistry;
use cortex_core::config::{AnthropicConfig, CortexConfig};
use cortex_hooks::HookEngine;
use cortex_knowledge::KnowledgeEngine;
use cortex_memory::MemoryManager;
use cortex_pipeline::anthropic::AnthropicProvider;
use cortex_pipeline::provider::LlmProvider;
use cortex_pipeline::Pipeline;
use cortex_scheduler::SchedulerEngine;
use cortex_state::StateManager;
use cortex_users::UserResolver;

/// A usable `AnthropicConfig` regardless of whether one was configured —
/// understanding's LLM refinement step and knowledge synthesis both degrade
/// gracefully (keyword result kept / synthesis simply never called) when the
/// key is empty.
fn anthropic_config(config: &CortexConfig) -> AnthropicConfig {
    config.providers.anthropic.clone().unwrap_or(AnthropicConfig {
            api_key: String::new(),
            base_url: "https://api.anthropic.com".to_string(),
            model: "claude-sonnet-4-6".to_string(),
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "cortex_gateway=info,tower_http=debug".into()),
    )
        .init();

    let config_path = std::env::var("CORTEX_CONFIG").ok();
    let config = CortexConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
            warn!("config load failed ({e}), using defaults");
            CortexConfig::default()
    });

    // Every subsystem gets its own `rusqlite::Connection` onto the same
    // on-disk file (mirrors `skynet-*`'s one-db-many-managers convention);
    // each owning manager serializes its own access behind a `Mutex`.
    std::fs::create_dir_all(
        std::path::Path::new(&config.database.path)
            .parent()
            .unwrap_or_else(|| std::path::Path::new(".")),
    )?;

    let memory_conn = rusqlite::Connection::open(&config.database.path)?;
    cortex_memory::db::init_db(&memory_conn)?;
    let memory = MemoryManager::new(memory_conn);

    let state_conn = rusqlite::Connection::open(&config.database.path)?;
    cortex_state::db::init_db(&state_conn)?;
    let state = StateManager::new(state_conn);

    let users_conn = rusqlite::Connection::open(&config.database.path)?;
    cortex_users::db::init_db(&users_conn)?;
    let users = UserResolver::new(Arc::new(std::sync::Mutex::new(users_conn)));

    let anthropic = anthropic_config(&config);
    let knowledge = Arc::new(KnowledgeEngine::new(&config.knowledge, anthropic.clone())?);
    let channels = Arc::new(cortex_channels::ChannelManager::new());

    let registry = CapabilityRegistry::new(capabilities::default_registry(capabilities::Deps {
                memory: memory.clone(),
                channels,
                users: users.clone(),
                knowledge,
                knowledge_synthesis_enabled: config.features.enable_knowledge_synthesis,
    }));

    let hooks = Arc::new(HookEngine::new());

    let llm: Option<Arc<dyn LlmProvider>> = if anthropic.api_key.is_empty() {
        None
    } else {
        Some(Arc::new(AnthropicProvider::new(anthropic.api_key.clone(), Some(anthropic.base_url.clone()))))
    };

    let pipeline = Pipeline::new(memory, state, registry, hooks.clone(), llm, anthropic.model.clone(), config.features.clone());

    // Scheduler: polls its own SQLite connection once a second and forwards
    // every fired job over `fired_tx`. The consumer below re-enters the
    // pipeline's proactive path for each one — dropped-by-gate triggers are
    // simply never forwarded anywhere.
    let scheduler_conn = rusqlite::Connection::open(&config.database.path)?;
    let (fired_tx, mut fired_rx) = tokio::sync::mpsc::channel(64);
    let scheduler_handle = cortex_scheduler::SchedulerHandle::new(rusqlite::Connection::open(&config.database.path)?)?;
    let scheduler_engine = SchedulerEngine::new(scheduler_conn, Some(fired_tx))?;
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(scheduler_engine.run(shutdown_rx));

    let proactive_pipeline = pipeline.clone();
    tokio::spawn(async move {
            while let Some(job) = fired_rx.recv().await {
                match proactive_pipeline.run_proactive(&job.action).await {
                    Some(response) => info!(job_id = %job.id, action = %response.action_taken, "proactive message generated"),
                    None => info!(job_id = %job.id, "proactive message dropped by authorization gate"),
                }
            }
    });

    // Periodic state cleanup — driven off the maintenance loop, never the
    // per-message path.
    let cleanup_pipeline = pipeline.clone();
    tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(60));
            loop {
                ticker.tick().await;
                if let Err(e) = cleanup_pipeline.cleanup_expired_state() {
                    error!("state cleanup failed: {e}");
                }
            }
    });

    let bind = config.gateway.bind.clone();
    let port = config.gateway.port;

    let app_state = Arc::new(app::AppState {
            config,
            pipeline,
            users,
            scheduler: scheduler_handle,
            hooks,
    });
    let router = app::build_router(app_state);

    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    info!("cortex gateway listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    // Dropping the sender would end the engine loop anyway on shutdown; this
    // keeps the watch channel's intent explicit for a future graceful-stop.
    let _ = shutdown_tx;

    Ok(())
}
