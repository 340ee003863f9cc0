//! The default capability catalog wired at startup.
//!
//! Adding a capability here is the only change needed to teach the assistant
//! something new — Understanding and Decision never special-case a
//! capability by name, they only consume whatever this table publishes.

use std::sync::Arc;

use cortex_capabilities::{Capability, CapabilityHandler};
use cortex_core::types::RiskLevel;

use cortex_pipeline::handlers::{
    CreateAnnouncementHandler, CreateTaskHandler, ForcedListeningHandler, GeneralConversationHandler, LinkIdentityHandler,
    ListTasksHandler, RegisterGoalHandler, SearchKnowledgeHandler,
};

fn capability(
    name: &str,
    primary: &[&str],
    secondary: &[&str],
    negative: &[&str],
    risk_level: RiskLevel,
    requires_confirmation: bool,
    dangerous: bool,
    intent_hints: &[&str],
) -> Capability {
    Capability {
        name: name.to_string(),
        enabled: true,
        primary_keywords: primary.iter().map(|s| s.to_string()).collect(),
        secondary_keywords: secondary.iter().map(|s| s.to_string()).collect(),
        negative_keywords: negative.iter().map(|s| s.to_string()).collect(),
        risk_level,
        requires_confirmation,
        dangerous,
        handler_ref: name.to_string(),
        intent_hints: intent_hints.iter().map(|s| s.to_string()).collect(),
    }
}

/// The default, built-in capability set. `forced_listening` is never matched
/// by keyword score — the Authorization Gate selects it directly as an
/// override when a safety pattern fires — but it still needs a registry
/// entry so Execution can dispatch to it.
pub struct Deps {
    pub memory: cortex_memory::MemoryManager,
    pub channels: Arc<cortex_channels::ChannelManager>,
    pub users: cortex_users::UserResolver,
    pub knowledge: Arc<cortex_knowledge::KnowledgeEngine>,
    pub knowledge_synthesis_enabled: bool,
}

pub fn default_registry(deps: Deps) -> Vec<(Capability, Arc<dyn CapabilityHandler>)> {
    vec![
        (
            capability(
                "general_conversation",
                &[],
                &[],
                &[],
                RiskLevel::Low,
                false,
                false,
                &["general_conversation"],
            ),
            Arc::new(GeneralConversationHandler) as Arc<dyn CapabilityHandler>,
        ),
        (
            capability(
                "list_tasks",
                &["list tasks", "show tasks", "my tasks", "タスクを見せて", "タスク一覧"],
                &["what do i need to do", "to-do"],
                &["delete", "cancel"],
                RiskLevel::Low,
                false,
                false,
                &["list_tasks"],
            ),
            Arc::new(ListTasksHandler::new(deps.memory.clone())),
        ),
        (
            capability(
                "create_task",
                &["create task", "add task", "remind me to", "タスクを追加"],
                &["new task", "todo"],
                &["list", "show"],
                RiskLevel::Low,
                false,
                false,
                &["create_task"],
            ),
            Arc::new(CreateTaskHandler::new(deps.memory.clone())),
        ),
        (
            capability(
                "register_goal",
                &["set a goal", "my goal is", "目標を設定"],
                &["i want to achieve", "aiming for"],
                &[],
                RiskLevel::Medium,
                false,
                false,
                &["register_goal", "goal_setting"],
            ),
            Arc::new(RegisterGoalHandler::new(deps.memory.clone())),
        ),
        (
            capability(
                "create_announcement",
                &["announce", "send an announcement", "告知して"],
                &["tell everyone", "broadcast"],
                &[],
                RiskLevel::High,
                true,
                true,
                &["create_announcement", "announcement"],
            ),
            Arc::new(CreateAnnouncementHandler::new(deps.channels)),
        ),
        (
            capability(
                "search_knowledge",
                &["what is", "how do i", "find documentation", "search for", "教えて"],
                &["lookup", "where can i find"],
                &[],
                RiskLevel::Low,
                false,
                false,
                &["search_knowledge", "knowledge_query"],
            ),
            Arc::new(SearchKnowledgeHandler::new(deps.knowledge, deps.knowledge_synthesis_enabled)),
        ),
        (
            capability(
                "link_identity",
                &["link my account", "connect my", "アカウントを連携"],
                &[],
                &[],
                RiskLevel::Medium,
                true,
                false,
                &["link_identity"],
            ),
            Arc::new(LinkIdentityHandler::new(deps.users)),
        ),
        (
            capability(
                "forced_listening",
                &[],
                &[],
                &[],
                RiskLevel::Critical,
                true,
                true,
                &["forced_listening"],
            ),
            Arc::new(ForcedListeningHandler) as Arc<dyn CapabilityHandler>,
        ),
    ]
}
