use thiserror::Error;

/// Errors that can occur during state-store operations.
#[derive(Debug, Error)]
pub enum StateError {
    /// No active state for `(organization_id, room_id, user_id)`, or the
    /// caller attempted to mutate a state that already expired.
    #[error("no active state for room {room_id}/user {user_id}")]
    NotFound { room_id: String, user_id: String },

    /// `transition_to`/`update_step` lost an optimistic-concurrency race:
    /// the row's `version` no longer matches what the caller read. The
    /// orchestrator turns this into a "please try again" response.
    #[error("version conflict updating state {state_id}: expected version {expected}")]
    VersionConflict { state_id: String, expected: i64 },

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StateError>;
