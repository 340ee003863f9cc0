//! Execution-layer request deduplication.
//!
//! `IdempotencyGuard` remembers the outcome of a `(room, user, action, params)`
//! tuple for `IDEMPOTENCY_WINDOW_SECS` after it last ran, so a retried or
//! double-submitted message replays the cached `HandlerResult` instead of
//! triggering the handler's side effect a second time. Same rolling-window
//! `DashMap` shape as `skynet-agent`'s provider `HealthTracker`: one entry per
//! key, pruned lazily on the next call that would touch it.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Instant;

use cortex_capabilities::HandlerResult;
use cortex_core::config::IDEMPOTENCY_WINDOW_SECS;
use dashmap::DashMap;
use serde_json::Value;

struct CachedResult {
    recorded_at: Instant,
    result: HandlerResult,
}

/// Keyed on `(organization_id, room_id, user_id, action, params)` — identical
/// text from two different rooms/users, or two different actions from the
/// same message, are distinct requests and both run.
pub struct IdempotencyGuard {
    window: std::time::Duration,
    entries: DashMap<u64, CachedResult>,
}

impl IdempotencyGuard {
    pub fn new() -> Self {
        Self {
            window: std::time::Duration::from_secs(IDEMPOTENCY_WINDOW_SECS.max(0) as u64),
            entries: DashMap::new(),
        }
    }

    fn key(organization_id: &str, room_id: &str, user_id: &str, action: &str, params: &Value) -> u64 {
        let mut hasher = DefaultHasher::new();
        organization_id.hash(&mut hasher);
        room_id.hash(&mut hasher);
        user_id.hash(&mut hasher);
        action.hash(&mut hasher);
        params.to_string().hash(&mut hasher);
        hasher.finish()
    }

    /// Returns the cached result for this exact call if it last ran within
    /// the window, pruning the entry first if it has aged out.
    pub fn check(&self, organization_id: &str, room_id: &str, user_id: &str, action: &str, params: &Value) -> Option<HandlerResult> {
        let key = Self::key(organization_id, room_id, user_id, action, params);
        let cached = self.entries.get(&key)?;
        if cached.recorded_at.elapsed() < self.window {
            Some(cached.result.clone())
        } else {
            None
        }
    }

    /// Records the outcome of a call that actually ran its handler.
    pub fn record(&self, organization_id: &str, room_id: &str, user_id: &str, action: &str, params: &Value, result: HandlerResult) {
        let key = Self::key(organization_id, room_id, user_id, action, params);
        self.entries.insert(
            key,
            CachedResult {
                recorded_at: Instant::now(),
                result,
            },
        );
        self.prune();
    }

    /// Drops entries past the window so the map doesn't grow unbounded over
    /// a long-running gateway process.
    fn prune(&self) {
        self.entries.retain(|_, v| v.recorded_at.elapsed() < self.window);
    }
}

impl Default for IdempotencyGuard {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replays_cached_result_within_window() {
        let guard = IdempotencyGuard::new();
        let params = serde_json::json!({"title": "buy milk"});
        assert!(guard.check("org-1", "room-1", "user-1", "create_task", &params).is_none());

        guard.record("org-1", "room-1", "user-1", "create_task", &params, HandlerResult::ok("created"));

        let replayed = guard.check("org-1", "room-1", "user-1", "create_task", &params);
        assert_eq!(replayed.unwrap().message, "created");
    }

    #[test]
    fn distinguishes_different_rooms_users_and_actions() {
        let guard = IdempotencyGuard::new();
        let params = serde_json::json!({"title": "buy milk"});
        guard.record("org-1", "room-1", "user-1", "create_task", &params, HandlerResult::ok("created"));

        assert!(guard.check("org-1", "room-2", "user-1", "create_task", &params).is_none());
        assert!(guard.check("org-1", "room-1", "user-2", "create_task", &params).is_none());
        assert!(guard.check("org-1", "room-1", "user-1", "list_tasks", &params).is_none());
    }

    #[test]
    fn expired_entry_is_not_replayed() {
        let guard = IdempotencyGuard {
            window: std::time::Duration::from_millis(0),
            entries: DashMap::new(),
        };
        let params = serde_json::json!({});
        guard.record("org-1", "room-1", "user-1", "create_task", &params, HandlerResult::ok("created"));
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert!(guard.check("org-1", "room-1", "user-1", "create_task", &params).is_none());
    }
}
