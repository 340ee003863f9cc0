use rusqlite::Connection;

use crate::error::Result;

/// Initialise `conversation_states` and its append-only transition log.
///
/// Safe to call on every startup — uses `IF NOT EXISTS` throughout.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS conversation_states (
        state_id TEXT PRIMARY KEY,
        organization_id TEXT NOT NULL,
        room_id TEXT NOT NULL,
        user_id TEXT NOT NULL,
        state_type TEXT NOT NULL,
        step TEXT NOT NULL,
        data TEXT NOT NULL DEFAULT '{}',
        reference_type TEXT,
        reference_id TEXT,
        timeout_secs INTEGER NOT NULL,
        expires_at TEXT NOT NULL,
        version INTEGER NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        UNIQUE(organization_id, room_id, user_id)
        );
        CREATE INDEX IF NOT EXISTS idx_state_lookup
        ON conversation_states(organization_id, room_id, user_id);
        CREATE INDEX IF NOT EXISTS idx_state_expiry
        ON conversation_states(expires_at);

        CREATE TABLE IF NOT EXISTS state_transitions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        state_id TEXT NOT NULL,
        organization_id TEXT NOT NULL,
        from_type TEXT,
        from_step TEXT,
        to_type TEXT NOT NULL,
        to_step TEXT NOT NULL,
        reason TEXT,
        at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_transitions_state
        ON state_transitions(state_id, at DESC);",
    )?;
    Ok(())
}
