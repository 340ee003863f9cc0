//! Configuration loading — `cortex.toml` plus `CORTEX_*` env overrides.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 8787;
pub const DEFAULT_BIND: &str = "127.0.0.1";

/// Per-message wall-clock deadline.
pub const MESSAGE_DEADLINE_MS: u64 = 60_000;
/// Context build deadline — fan-out across memory sources.
pub const CONTEXT_BUILD_DEADLINE_MS: u64 = 300;
/// Understanding LLM refinement step deadline.
pub const UNDERSTANDING_LLM_DEADLINE_MS: u64 = 10_000;
/// Per-handler execution deadline.
pub const HANDLER_DEADLINE_MS: u64 = 30_000;
/// Vector-store query deadline.
pub const VECTOR_QUERY_DEADLINE_MS: u64 = 5_000;

/// Idempotency window: two runs of the same `(user, room, text)` within this
/// window produce at most one durable side effect per handler.
pub const IDEMPOTENCY_WINDOW_SECS: i64 = 5;

/// Heuristic threshold for "short message = continue the active state"
/// rather than treat it as a fresh intent. A heuristic, not a tunable —
/// per-locale adjustment is left as a follow-up.
pub const SHORT_MESSAGE_CHARS: usize = 20;
/// `LIST_CONTEXT` state auto-expires after 5 minutes.
pub const LIST_CONTEXT_TIMEOUT_SECS: i64 = 300;
/// Default state timeout for all other conversation states.
pub const DEFAULT_STATE_TIMEOUT_SECS: i64 = 1800;

/// Top-level config (`cortex.toml` + `CORTEX_*` env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CortexConfig {
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub knowledge: KnowledgeConfig,
    #[serde(default)]
    pub features: FeatureFlags,
}

impl Default for CortexConfig {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig {
                port: DEFAULT_PORT,
                bind: DEFAULT_BIND.to_string(),
            },
            database: DatabaseConfig::default(),
            providers: ProvidersConfig::default(),
            knowledge: KnowledgeConfig::default(),
            features: FeatureFlags::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// LLM providers used by Understanding refinement, Decision tie-breaks,
/// and Knowledge synthesis. Only Anthropic and one OpenAI-compatible
/// slot are modeled — the pipeline needs a provider trait, not a catalog.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProvidersConfig {
    pub anthropic: Option<AnthropicConfig>,
    pub openai_compat: Option<OpenAiCompatConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicConfig {
    pub api_key: String,
    #[serde(default = "default_anthropic_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiCompatConfig {
    pub api_key: String,
    pub base_url: String,
    #[serde(default = "default_openai_chat_path")]
    pub chat_path: String,
    pub model: String,
}

/// Knowledge Retrieval + Synthesis configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeConfig {
    pub qdrant_url: String,
    pub collection: String,
    pub embedding_url: String,
    pub embedding_api_key: Option<String>,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_quality_floor")]
    pub quality_floor: f32,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            qdrant_url: "http://localhost:6334".to_string(),
            collection: "cortex_knowledge".to_string(),
            embedding_url: String::new(),
            embedding_api_key: None,
            top_k: default_top_k(),
            quality_floor: default_quality_floor(),
        }
    }
}

/// Boolean feature flags gating whole subsystems. Checked once at the top of
/// the pipeline entry point; when a flag a request depends on is off the
/// gateway returns 503 mapped to `ConfigurationError`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureFlags {
    #[serde(default = "bool_true")]
    pub enable_brain_architecture: bool,
    #[serde(default = "bool_true")]
    pub enable_proactive: bool,
    #[serde(default = "bool_true")]
    pub enable_knowledge_synthesis: bool,
    /// Gates Decision's multi-step planner: splitter-pattern detection
    /// ("and then", "、それから") never produces a `multi_action_plan` when off,
    /// even if two candidates clear the score threshold.
    #[serde(default = "bool_true")]
    pub enable_execution_excellence: bool,
    /// Gates Decision's use of a user's long-term memory/values when scoring
    /// `life_axis_alignment` — the priority-based data source selection from
    /// the truth-priority order (realtime > durable store > spec > memory >
    /// no guessing). Off means every candidate gets the neutral 0.5.
    #[serde(default = "bool_true")]
    pub enable_truth_resolver: bool,
    /// Gates recalled-episode retrieval and episode recording. Off means
    /// `Context.recalled_episodes` is always empty and Learning never writes
    /// a new episode.
    #[serde(default = "bool_true")]
    pub long_term_memory_enabled: bool,
    /// Gates user-preference retrieval (the bot's "persona memory" of a
    /// user's stated preferences). Off means `Context.preferences` is always
    /// the empty default.
    #[serde(default = "bool_true")]
    pub bot_persona_memory_enabled: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            enable_brain_architecture: true,
            enable_proactive: true,
            enable_knowledge_synthesis: true,
            enable_execution_excellence: true,
            enable_truth_resolver: true,
            long_term_memory_enabled: true,
            bot_persona_memory_enabled: true,
        }
    }
}

fn bool_true() -> bool {
    true
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_model() -> String {
    "claude-sonnet-4-6".to_string()
}
fn default_anthropic_base_url() -> String {
    "https://api.anthropic.com".to_string()
}
fn default_openai_chat_path() -> String {
    "/v1/chat/completions".to_string()
}
fn default_top_k() -> usize {
    5
}
fn default_quality_floor() -> f32 {
    0.4
}
fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.cortex/cortex.db", home)
}

impl CortexConfig {
    /// Load config from a TOML file with `CORTEX_*` env var overrides.
    /// Checks the explicit path argument, else `~/.cortex/cortex.toml`.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: CortexConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("CORTEX_").split("_"))
            .extract()
            .map_err(|e| crate::error::CortexError::Configuration(e.to_string()))?;

        Ok(config)
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.cortex/cortex.toml", home)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_port() {
        let cfg = CortexConfig::default();
        assert_eq!(cfg.gateway.port, DEFAULT_PORT);
    }

    #[test]
    fn default_feature_flags_are_all_on() {
        let flags = FeatureFlags::default();
        assert!(flags.enable_brain_architecture);
        assert!(flags.enable_proactive);
        assert!(flags.enable_knowledge_synthesis);
        assert!(flags.enable_execution_excellence);
        assert!(flags.enable_truth_resolver);
        assert!(flags.long_term_memory_enabled);
        assert!(flags.bot_persona_memory_enabled);
    }
}
