//! State Store data model.

use std::collections::HashMap;

use cortex_core::types::OrganizationId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Which multi-step conversation the user is currently inside.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StateType {
    Normal,
    GoalSetting,
    Announcement,
    Confirmation,
    TaskPending,
    ListContext,
    MultiAction,
}

impl std::fmt::Display for StateType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StateType::Normal => "NORMAL",
            StateType::GoalSetting => "GOAL_SETTING",
            StateType::Announcement => "ANNOUNCEMENT",
            StateType::Confirmation => "CONFIRMATION",
            StateType::TaskPending => "TASK_PENDING",
            StateType::ListContext => "LIST_CONTEXT",
            StateType::MultiAction => "MULTI_ACTION",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for StateType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NORMAL" => Ok(Self::Normal),
            "GOAL_SETTING" => Ok(Self::GoalSetting),
            "ANNOUNCEMENT" => Ok(Self::Announcement),
            "CONFIRMATION" => Ok(Self::Confirmation),
            "TASK_PENDING" => Ok(Self::TaskPending),
            "LIST_CONTEXT" => Ok(Self::ListContext),
            "MULTI_ACTION" => Ok(Self::MultiAction),
            other => Err(format!("unknown state type: {other}")),
        }
    }
}

/// Why a `ConversationState` was cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClearReason {
    Completed,
    UserCancel,
    Timeout,
    Error,
    Interrupted,
}

impl std::fmt::Display for ClearReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ClearReason::Completed => "completed",
            ClearReason::UserCancel => "user_cancel",
            ClearReason::Timeout => "timeout",
            ClearReason::Error => "error",
            ClearReason::Interrupted => "interrupted",
        };
        f.write_str(s)
    }
}

/// A multi-step conversation's pinned state.
///
/// Unique key is `(organization_id, room_id, user_id)` — at most one active
/// row per triple. `data` is an opaque map the capability/handler populates
/// and reads back; the state store never interprets its contents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationState {
    pub state_id: String,
    pub organization_id: OrganizationId,
    pub room_id: String,
    pub user_id: String,
    pub state_type: StateType,
    pub step: String,
    pub data: HashMap<String, Value>,
    pub reference_type: Option<String>,
    pub reference_id: Option<String>,
    /// Configured lifetime in seconds, re-applied by `update_step` each time
    /// it extends `expires_at`.
    pub timeout_secs: i64,
    pub expires_at: String,
    pub version: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// One row of the append-only `state_transitions` audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub state_id: String,
    pub from_type: Option<StateType>,
    pub from_step: Option<String>,
    pub to_type: StateType,
    pub to_step: String,
    pub reason: Option<String>,
    pub at: String,
}
