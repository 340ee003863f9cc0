//! Context Builder.
//!
//! Fans out to every Memory Access read in parallel and assembles the
//! per-turn [`Context`](crate::types::Context). `MemoryManager::get_all_context`
//! already races each sub-fetch against `CONTEXT_BUILD_DEADLINE_MS` and
//! degrades to empty defaults on timeout (see its module docs) — the gate
//! in this module exists only to bound total wall time if the whole fan-out
//! itself stalls, so a turn never blocks indefinitely waiting on memory.

use cortex_core::config::{FeatureFlags, CONTEXT_BUILD_DEADLINE_MS};
use cortex_core::types::OrganizationId;
use cortex_memory::MemoryManager;
use tracing::warn;

use crate::types::Context;

/// Build the per-turn context. Never fails — a slow or erroring memory
/// layer still yields a `Context` with empty slices; context building
/// always returns a context.
///
/// `flags.bot_persona_memory_enabled` and `flags.long_term_memory_enabled`
/// strip the corresponding slices after the fan-out completes rather than
/// skipping their queries — `MemoryManager::get_all_context` always fetches
/// everything in one `tokio::join!`, so gating here is cheaper than teaching
/// the memory layer about feature flags it has no other reason to know.
pub async fn build(
    memory: &MemoryManager,
    organization_id: &OrganizationId,
    room_id: &str,
    user_id: &str,
    sender_name: &str,
    message_text: &str,
    flags: &FeatureFlags,
) -> Context {
    let deadline = std::time::Duration::from_millis(CONTEXT_BUILD_DEADLINE_MS * 4);
    let mut all = match tokio::time::timeout(
        deadline,
        memory.get_all_context(organization_id, room_id, user_id),
    )
        .await
    {
        Ok(all) => all,
        Err(_) => {
            warn!(
                organization_id = organization_id.as_str(),
                room_id, user_id, "context fan-out exceeded overall deadline, using empty context"
            );
            Default::default()
        }
    };

    if !flags.bot_persona_memory_enabled {
        all.preferences = Default::default();
    }
    if !flags.long_term_memory_enabled {
        all.recalled_episodes = Vec::new();
    }

    Context {
        organization_id: organization_id.clone(),
        room_id: room_id.to_string(),
        user_id: user_id.to_string(),
        sender_name: sender_name.to_string(),
        message_text: message_text.to_string(),
        all,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    fn setup_manager() -> MemoryManager {
        let conn = Connection::open_in_memory().unwrap();
        cortex_memory::db::init_db(&conn).unwrap();
        MemoryManager::new(conn)
    }

    #[tokio::test]
    async fn build_always_returns_context_even_with_empty_db() {
        let memory = setup_manager();
        let org = OrganizationId::new("org-1".to_string());
        let ctx = build(&memory, &org, "room-1", "user-1", "Alice", "hello", &FeatureFlags::default()).await;
        assert_eq!(ctx.organization_id, org);
        assert_eq!(ctx.room_id, "room-1");
        assert_eq!(ctx.message_text, "hello");
        assert!(ctx.all.recent_conversation.is_empty());
    }

    #[tokio::test]
    async fn persona_memory_flag_strips_preferences() {
        let memory = setup_manager();
        let org = OrganizationId::new("org-1".to_string());
        memory
            .learn(&org, "user-1", cortex_memory::types::MemoryCategory::Preference, "likes", "coffee", 0.9, cortex_memory::types::MemorySource::UserSaid)
            .await
            .unwrap();

        let mut flags = FeatureFlags::default();
        flags.bot_persona_memory_enabled = false;
        let ctx = build(&memory, &org, "room-1", "user-1", "Alice", "hello", &flags).await;
        assert!(ctx.all.preferences.interests.is_empty() && ctx.all.preferences.learned.is_empty());
    }
}
