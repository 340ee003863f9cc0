//! Canonical shapes returned by every Memory Access operation.
//!
//! Every struct below is tenant-scoped: the `organization_id` that produced
//! it travels with the row so a caller folding several slices together
//! can never silently mix tenants. None of these types carry a `Result` —
//! by the time a row reaches here, the context builder has already folded
//! any fetch failure into an empty collection.

use cortex_core::types::{Episode, KnowledgeChunk, OrganizationId};
use serde::{Deserialize, Serialize};

/// One turn in the recent conversation window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub organization_id: OrganizationId,
    pub room_id: String,
    pub user_id: Option<String>,
    pub sender_name: String,
    pub role: String,
    pub content: String,
    pub channel: String,
    pub created_at: String,
}

/// Rolled-up summary of older history beyond the bounded recent window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub room_id: String,
    pub summary: String,
    pub covers_through: String,
}

/// A durable, learned fact about a user: `category`/`key`/`value`/
/// `confidence`/`source`, confidence-wins-on-conflict, scoped to
/// `(organization_id, user_id)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserMemory {
    pub id: i64,
    pub organization_id: OrganizationId,
    pub user_id: String,
    pub category: MemoryCategory,
    pub key: String,
    pub value: String,
    pub confidence: f64,
    pub source: MemorySource,
    pub expires_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// What kind of memory this is. Priority order for prompt/context injection:
/// instruction > preference > fact > context (higher = included first).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryCategory {
    Instruction,
    Preference,
    Fact,
    Context,
}

impl std::fmt::Display for MemoryCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Instruction => write!(f, "instruction"),
            Self::Preference => write!(f, "preference"),
            Self::Fact => write!(f, "fact"),
            Self::Context => write!(f, "context"),
        }
    }
}

impl std::str::FromStr for MemoryCategory {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "instruction" => Ok(Self::Instruction),
            "preference" => Ok(Self::Preference),
            "fact" => Ok(Self::Fact),
            "context" => Ok(Self::Context),
            other => Err(format!("unknown memory category: {other}")),
        }
    }
}

/// How a `UserMemory` row was acquired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemorySource {
    UserSaid,
    Inferred,
    AdminSet,
}

impl std::fmt::Display for MemorySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UserSaid => write!(f, "user_said"),
            Self::Inferred => write!(f, "inferred"),
            Self::AdminSet => write!(f, "admin_set"),
        }
    }
}

impl std::str::FromStr for MemorySource {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user_said" => Ok(Self::UserSaid),
            "inferred" => Ok(Self::Inferred),
            "admin_set" => Ok(Self::AdminSet),
            other => Err(format!("unknown memory source: {other}")),
        }
    }
}

/// `get_user_preferences` result: the narrow named fields, folded together
/// with whatever learned `UserMemory` rows exist for the user.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UserPreferences {
    pub language: Option<String>,
    pub tone: Option<String>,
    pub interests: Vec<String>,
    pub timezone: Option<String>,
    pub learned: Vec<UserMemory>,
}

/// `get_person_info` result — a known person the user has referred to
/// before (consumed by Understanding's alias-resolution step).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonInfo {
    pub person_id: String,
    pub organization_id: OrganizationId,
    pub display_name: String,
    pub aliases: Vec<String>,
    pub relation: Option<String>,
}

/// `get_recent_tasks` result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSummary {
    pub task_id: String,
    pub organization_id: OrganizationId,
    pub body: String,
    pub assigned_to: Option<String>,
    pub status: String,
    pub limit_date: Option<String>,
    pub created_at: String,
}

/// `get_active_goals` result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalSummary {
    pub goal_id: String,
    pub organization_id: OrganizationId,
    pub user_id: String,
    pub title: String,
    pub why: Option<String>,
    pub status: String,
    pub created_at: String,
}

/// `get_recent_insights` result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsightSummary {
    pub insight_id: String,
    pub organization_id: OrganizationId,
    pub user_id: String,
    pub content: String,
    pub created_at: String,
}

/// A single conversation message persisted for history/cost tracking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub id: i64,
    pub organization_id: OrganizationId,
    pub room_id: String,
    pub user_id: Option<String>,
    pub sender_name: String,
    pub channel: String,
    pub role: String,
    pub content: String,
    pub created_at: String,
}

/// Every slice Memory Access can produce, fanned out and folded together by
/// `get_all_context`. Every field is a plain collection/Option — a failed
/// sub-query becomes an empty value here, never a `Result`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AllContext {
    pub recent_conversation: Vec<ConversationTurn>,
    pub conversation_summary: Option<ConversationSummary>,
    pub preferences: UserPreferences,
    pub persons: Vec<PersonInfo>,
    pub recent_tasks: Vec<TaskSummary>,
    pub active_goals: Vec<GoalSummary>,
    pub recent_insights: Vec<InsightSummary>,
    pub recalled_episodes: Vec<Episode>,
    /// Always empty from the context builder — candidate knowledge chunks
    /// are filled lazily once a knowledge capability is actually selected.
    pub knowledge_chunks: Vec<KnowledgeChunk>,
}
