use std::collections::HashMap;
use std::sync::Mutex;

use cortex_core::types::OrganizationId;
use rusqlite::Connection;
use serde_json::Value;
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::error::{Result, StateError};
use crate::types::{ClearReason, ConversationState, StateType};

/// Thread-safe manager for the State Store.
///
/// Wraps a single SQLite connection in a `Mutex`. Every mutation re-reads
/// the row it is about to touch and guards its `UPDATE` with
/// `WHERE version = <the version just read>`, giving compare-and-swap
/// semantics without a separate locking layer.
pub struct StateManager {
    db: Mutex<Connection>,
}

impl StateManager {
    /// Wrap an already-open (and `init_db`-initialised) connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            db: Mutex::new(conn),
        }
    }

    /// Returns `None` when no row exists, or when the row has expired —
    /// an expired row is deleted opportunistically before returning `None`.
    #[instrument(skip(self), fields(organization_id = %organization_id, room_id, user_id))]
    pub fn get_current(
        &self,
        organization_id: &OrganizationId,
        room_id: &str,
        user_id: &str,
    ) -> Result<Option<ConversationState>> {
        let db = self.db.lock().unwrap();
        let row = match db.query_row(
            "SELECT state_id, organization_id, room_id, user_id, state_type, step, data,
            reference_type, reference_id, timeout_secs, expires_at, version,
            created_at, updated_at
            FROM conversation_states
            WHERE organization_id = ?1 AND room_id = ?2 AND user_id = ?3",
            rusqlite::params![organization_id.as_str(), room_id, user_id],
            row_to_state,
        ) {
            Ok(s) => s,
            Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
            Err(e) => return Err(StateError::Database(e)),
        };

        let now = chrono::Utc::now();
        let expires_at = chrono::DateTime::parse_from_rfc3339(&row.expires_at)
            .map(|dt| dt.with_timezone(&chrono::Utc))
            .unwrap_or(now);

        if now > expires_at {
            db.execute(
                "DELETE FROM conversation_states WHERE state_id = ?1",
                rusqlite::params![row.state_id],
            )?;
            return Ok(None);
        }

        Ok(Some(row))
    }

    /// UPSERT keyed by `(organization_id, room_id, user_id)`. If a row
    /// already exists, `expected_version` (when supplied) must match its
    /// current `version` or the update is rejected with
    /// `StateError::VersionConflict` — regardless of whether the caller
    /// passed an expectation, the `UPDATE` itself is always guarded by
    /// `WHERE version = <version just read>` so a concurrent writer can
    /// never be silently overwritten.
    #[allow(clippy::too_many_arguments)]
    #[instrument(skip(self, data), fields(organization_id = %organization_id, room_id, user_id, to_type = %to_type))]
    pub fn transition_to(
        &self,
        organization_id: &OrganizationId,
        room_id: &str,
        user_id: &str,
        expected_version: Option<i64>,
        to_type: StateType,
        to_step: &str,
        data: HashMap<String, Value>,
        reference_type: Option<&str>,
        reference_id: Option<&str>,
        timeout_secs: i64,
    ) -> Result<ConversationState> {
        let db = self.db.lock().unwrap();
        let now = chrono::Utc::now();
        let expires_at = (now + chrono::Duration::seconds(timeout_secs)).to_rfc3339();
        let now_str = now.to_rfc3339();
        let data_json = serde_json::to_string(&data)?;

        let existing = db
            .query_row(
            "SELECT state_id, state_type, step, version FROM conversation_states
            WHERE organization_id = ?1 AND room_id = ?2 AND user_id = ?3",
            rusqlite::params![organization_id.as_str(), room_id, user_id],
            |row| {
                Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, i64>(3)?,
                ))
            },
        )
            .ok();

        let (state_id, from_type, from_step) = match existing {
            Some((state_id, from_type_str, from_step, current_version)) => {
                if let Some(expected) = expected_version {
                    if expected != current_version {
                        return Err(StateError::VersionConflict {
                                state_id,
                                expected,
                        });
                    }
                }
                let changed = db.execute(
                    "UPDATE conversation_states
                    SET state_type = ?1, step = ?2, data = ?3, reference_type = ?4,
                    reference_id = ?5, timeout_secs = ?6, expires_at = ?7,
                    version = version + 1, updated_at = ?8
                    WHERE state_id = ?9 AND version = ?10",
                    rusqlite::params![
                        to_type.to_string(),
                        to_step,
                        data_json,
                        reference_type,
                        reference_id,
                        timeout_secs,
                        expires_at,
                        now_str,
                        state_id,
                        current_version,
                    ],
                )?;
                if changed == 0 {
                    return Err(StateError::VersionConflict {
                            state_id,
                            expected: current_version,
                    });
                }
                (state_id, Some(from_type_str), Some(from_step))
            }
            None => {
                let state_id = Uuid::now_v7().to_string();
                db.execute(
                    "INSERT INTO conversation_states
                    (state_id, organization_id, room_id, user_id, state_type, step, data,
                    reference_type, reference_id, timeout_secs, expires_at, version,
                    created_at, updated_at)
                    VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,1,?12,?12)",
                    rusqlite::params![
                        state_id,
                        organization_id.as_str(),
                        room_id,
                        user_id,
                        to_type.to_string(),
                        to_step,
                        data_json,
                        reference_type,
                        reference_id,
                        timeout_secs,
                        expires_at,
                        now_str,
                    ],
                )?;
                (state_id, None, None)
            }
        };

        db.execute(
            "INSERT INTO state_transitions
            (state_id, organization_id, from_type, from_step, to_type, to_step, reason, at)
            VALUES (?1,?2,?3,?4,?5,?6,NULL,?7)",
            rusqlite::params![
                state_id,
                organization_id.as_str(),
                from_type,
                from_step,
                to_type.to_string(),
                to_step,
                now_str,
            ],
        )?;

        db.query_row(
            "SELECT state_id, organization_id, room_id, user_id, state_type, step, data,
            reference_type, reference_id, timeout_secs, expires_at, version,
            created_at, updated_at
            FROM conversation_states WHERE state_id = ?1",
            rusqlite::params![state_id],
            row_to_state,
        )
            .map_err(StateError::Database)
    }

    /// Merges `data_delta` into the existing `data` map (shallow — top-level
    /// keys overwrite, nested structures are replaced wholesale) and extends
    /// `expires_at` by the state's original `timeout_secs`. Guarded by the
    /// same read-then-CAS pattern as `transition_to`.
    #[instrument(skip(self, data_delta), fields(organization_id = %organization_id, room_id, user_id, step))]
    pub fn update_step(
        &self,
        organization_id: &OrganizationId,
        room_id: &str,
        user_id: &str,
        step: &str,
        data_delta: HashMap<String, Value>,
    ) -> Result<ConversationState> {
        let db = self.db.lock().unwrap();
        let current = db
            .query_row(
            "SELECT state_id, data, timeout_secs, version FROM conversation_states
            WHERE organization_id = ?1 AND room_id = ?2 AND user_id = ?3",
            rusqlite::params![organization_id.as_str(), room_id, user_id],
            |row| {
                Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, i64>(3)?,
                ))
            },
        )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StateError::NotFound {
                    room_id: room_id.to_string(),
                    user_id: user_id.to_string(),
                },
                other => StateError::Database(other),
        })?;

        let (state_id, data_str, timeout_secs, version) = current;
        let mut data: HashMap<String, Value> = serde_json::from_str(&data_str)?;
        for (k, v) in data_delta {
            data.insert(k, v);
        }
        let data_json = serde_json::to_string(&data)?;

        let now = chrono::Utc::now();
        let expires_at = (now + chrono::Duration::seconds(timeout_secs)).to_rfc3339();
        let now_str = now.to_rfc3339();

        let changed = db.execute(
            "UPDATE conversation_states
            SET step = ?1, data = ?2, expires_at = ?3, version = version + 1, updated_at = ?4
            WHERE state_id = ?5 AND version = ?6",
            rusqlite::params![step, data_json, expires_at, now_str, state_id, version],
        )?;
        if changed == 0 {
            return Err(StateError::VersionConflict {
                    state_id,
                    expected: version,
            });
        }

        db.query_row(
            "SELECT state_id, organization_id, room_id, user_id, state_type, step, data,
            reference_type, reference_id, timeout_secs, expires_at, version,
            created_at, updated_at
            FROM conversation_states WHERE state_id = ?1",
            rusqlite::params![state_id],
            row_to_state,
        )
            .map_err(StateError::Database)
    }

    /// Destroys the active state. A no-op (not an error) if no row exists —
    /// the state may already have been auto-purged by a concurrent read,
    /// and `clear` is meant to guarantee absence, not existence.
    #[instrument(skip(self), fields(organization_id = %organization_id, room_id, user_id, reason = %reason))]
    pub fn clear(
        &self,
        organization_id: &OrganizationId,
        room_id: &str,
        user_id: &str,
        reason: ClearReason,
    ) -> Result<()> {
        let db = self.db.lock().unwrap();
        let existing = db
            .query_row(
            "SELECT state_id, state_type, step FROM conversation_states
            WHERE organization_id = ?1 AND room_id = ?2 AND user_id = ?3",
            rusqlite::params![organization_id.as_str(), room_id, user_id],
            |row| {
                Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                ))
            },
        )
            .ok();

        let Some((state_id, from_type, from_step)) = existing else {
            return Ok(());
        };

        db.execute(
            "DELETE FROM conversation_states WHERE state_id = ?1",
            rusqlite::params![state_id],
        )?;

        let now_str = chrono::Utc::now().to_rfc3339();
        db.execute(
            "INSERT INTO state_transitions
            (state_id, organization_id, from_type, from_step, to_type, to_step, reason, at)
            VALUES (?1,?2,?3,?4,?5,'cleared',?6,?7)",
            rusqlite::params![
                state_id,
                organization_id.as_str(),
                from_type.clone(),
                from_step,
                from_type,
                reason.to_string(),
                now_str,
            ],
        )?;
        Ok(())
    }

    /// Sweeps every expired row regardless of tenant — a periodic
    /// maintenance pass, not a per-request path. Returns the number of rows
    /// removed.
    #[instrument(skip(self))]
    pub fn cleanup_expired(&self) -> Result<usize> {
        let db = self.db.lock().unwrap();
        let now = chrono::Utc::now().to_rfc3339();
        let n = db.execute(
            "DELETE FROM conversation_states WHERE expires_at <= ?1",
            rusqlite::params![now],
        )?;
        if n > 0 {
            warn!(count = n, "purged expired conversation states");
        }
        Ok(n)
    }
}

fn row_to_state(row: &rusqlite::Row<'_>) -> rusqlite::Result<ConversationState> {
    let state_type_str: String = row.get(4)?;
    let data_str: String = row.get(6)?;
    Ok(ConversationState {
            state_id: row.get(0)?,
            organization_id: OrganizationId::new(row.get::<_, String>(1)?),
            room_id: row.get(2)?,
            user_id: row.get(3)?,
            state_type: state_type_str.parse().unwrap_or(StateType::Normal),
            step: row.get(5)?,
            data: serde_json::from_str(&data_str).unwrap_or_default(),
            reference_type: row.get(7)?,
            reference_id: row.get(8)?,
            timeout_secs: row.get(9)?,
            expires_at: row.get(10)?,
            version: row.get(11)?,
            created_at: row.get(12)?,
            updated_at: row.get(13)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;

    fn manager() -> StateManager {
        let conn = Connection::open_in_memory().unwrap();
        init_db(&conn).unwrap();
        StateManager::new(conn)
    }

    fn org() -> OrganizationId {
        OrganizationId::new("org_acme")
    }

    #[test]
    fn get_current_is_none_when_no_row_exists() {
        let mgr = manager();
        assert!(mgr.get_current(&org(), "room1", "u1").unwrap().is_none());
    }

    #[test]
    fn transition_to_creates_then_updates_with_version_bump() {
        let mgr = manager();
        let s1 = mgr
            .transition_to(
            &org(),
            "room1",
            "u1",
            None,
            StateType::GoalSetting,
            "what",
            HashMap::new(),
            None,
            None,
            1800,
        )
            .unwrap();
        assert_eq!(s1.version, 1);

        let s2 = mgr
            .transition_to(
            &org(),
            "room1",
            "u1",
            Some(1),
            StateType::GoalSetting,
            "why",
            HashMap::new(),
            None,
            None,
            1800,
        )
            .unwrap();
        assert_eq!(s2.version, 2);
        assert_eq!(s2.step, "why");
    }

    #[test]
    fn transition_to_with_stale_expected_version_is_conflict() {
        let mgr = manager();
        mgr.transition_to(
            &org(),
            "room1",
            "u1",
            None,
            StateType::Confirmation,
            "ask",
            HashMap::new(),
            None,
            None,
            1800,
        )
            .unwrap();

        let err = mgr
            .transition_to(
            &org(),
            "room1",
            "u1",
            Some(99),
            StateType::Confirmation,
            "confirmed",
            HashMap::new(),
            None,
            None,
            1800,
        )
            .unwrap_err();
        assert!(matches!(err, StateError::VersionConflict { .. }));
    }

    #[test]
    fn update_step_merges_data_delta_and_extends_expiry() {
        let mgr = manager();
        let mut initial = HashMap::new();
        initial.insert("why_answer".to_string(), Value::String("grow".to_string()));
        let s1 = mgr
            .transition_to(
            &org(),
            "room1",
            "u1",
            None,
            StateType::GoalSetting,
            "what",
            initial,
            None,
            None,
            1800,
        )
            .unwrap();

        let mut delta = HashMap::new();
        delta.insert("what_answer".to_string(), Value::String("run a marathon".to_string()));
        let s2 = mgr.update_step(&org(), "room1", "u1", "confirm", delta).unwrap();

        assert_eq!(s2.version, s1.version + 1);
        assert_eq!(s2.step, "confirm");
        assert_eq!(s2.data.get("why_answer").unwrap(), "grow");
        assert_eq!(s2.data.get("what_answer").unwrap(), "run a marathon");
    }

    #[test]
    fn update_step_on_missing_state_is_not_found() {
        let mgr = manager();
        let err = mgr
            .update_step(&org(), "room1", "u1", "confirm", HashMap::new())
            .unwrap_err();
        assert!(matches!(err, StateError::NotFound { .. }));
    }

    #[test]
    fn clear_removes_the_row_and_is_idempotent() {
        let mgr = manager();
        mgr.transition_to(
            &org(),
            "room1",
            "u1",
            None,
            StateType::TaskPending,
            "ask",
            HashMap::new(),
            None,
            None,
            1800,
        )
            .unwrap();

        mgr.clear(&org(), "room1", "u1", ClearReason::Completed).unwrap();
        assert!(mgr.get_current(&org(), "room1", "u1").unwrap().is_none());
        mgr.clear(&org(), "room1", "u1", ClearReason::Completed).unwrap();
    }

    #[test]
    fn get_current_auto_purges_expired_rows() {
        let mgr = manager();
        mgr.transition_to(
            &org(),
            "room1",
            "u1",
            None,
            StateType::ListContext,
            "show",
            HashMap::new(),
            None,
            None,
            -1,
        )
            .unwrap();

        assert!(mgr.get_current(&org(), "room1", "u1").unwrap().is_none());
    }

    #[test]
    fn cleanup_expired_sweeps_rows_across_tenants() {
        let mgr = manager();
        mgr.transition_to(
            &org(),
            "room1",
            "u1",
            None,
            StateType::Normal,
            "start",
            HashMap::new(),
            None,
            None,
            -1,
        )
            .unwrap();
        mgr.transition_to(
            &OrganizationId::new("org_other"),
            "room2",
            "u2",
            None,
            StateType::Normal,
            "start",
            HashMap::new(),
            None,
            None,
            -1,
        )
            .unwrap();

        let purged = mgr.cleanup_expired().unwrap();
        assert_eq!(purged, 2);
    }

    #[test]
    fn states_are_scoped_per_tenant() {
        let mgr = manager();
        mgr.transition_to(
            &org(),
            "room1",
            "u1",
            None,
            StateType::Normal,
            "start",
            HashMap::new(),
            None,
            None,
            1800,
        )
            .unwrap();

        assert!(mgr
                .get_current(&OrganizationId::new("org_other"), "room1", "u1")
                .unwrap()
                .is_none());
    }
}
