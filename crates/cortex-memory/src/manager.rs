//! Memory Access — uniform read API over tenant-scoped durable stores.
//!
//! Every public accessor is tenant-scoped (`organization_id` is always the
//! first argument) and never returns an `Err` to its caller: a failed
//! sub-query is caught, logged by error *kind* only (never message content),
//! and folded into an empty collection/`None`. `get_all_context`
//! fans the individual accessors out concurrently under a shared budget and
//! tolerates any subset of them failing or timing out.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use cortex_core::config::CONTEXT_BUILD_DEADLINE_MS;
use cortex_core::types::{Episode, KnowledgeChunk, OrganizationId};
use rusqlite::Connection;
use tracing::warn;

use crate::error::{MemoryError, Result};
use crate::types::*;

/// Default bound on the recent-conversation window.
pub const DEFAULT_RECENT_WINDOW: usize = 20;

/// Manages tenant-scoped reads (and the narrow set of core-owned writes —
/// learned facts, episodes, outcomes) over a single SQLite connection.
///
/// Wrapped in `Arc<Mutex<_>>` so it can be cloned cheaply into concurrent
/// `tokio::join!` branches; each branch runs its query on a blocking thread
/// via `spawn_blocking` so the connection mutex is never held across an
/// `.await`.
#[derive(Clone)]
pub struct MemoryManager {
    db: Arc<Mutex<Connection>>,
}

impl MemoryManager {
    pub fn new(conn: Connection) -> Self {
        Self {
            db: Arc::new(Mutex::new(conn)),
        }
    }

    async fn with_budget<T, F>(&self, label: &'static str, f: F) -> T
    where
    T: Default + Send + 'static,
    F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        let budget = Duration::from_millis(CONTEXT_BUILD_DEADLINE_MS);
        let fut = tokio::task::spawn_blocking(move || {
                let conn = db.lock().unwrap_or_else(|p| p.into_inner());
                f(&conn)
        });
        match tokio::time::timeout(budget, fut).await {
            Ok(Ok(Ok(value))) => value,
            Ok(Ok(Err(e))) => {
                warn!(source = label, error = %e, "memory access error, slice replaced with empty");
                T::default()
            }
            Ok(Err(join_err)) => {
                warn!(source = label, error = %join_err, "memory access task panicked");
                T::default()
            }
            Err(_) => {
                warn!(source = label, budget_ms = CONTEXT_BUILD_DEADLINE_MS, "memory access timed out");
                T::default()
            }
        }
    }

    // -- recent conversation ------------------------------------------------

    pub async fn get_recent_conversation(
        &self,
        organization_id: &OrganizationId,
        room_id: &str,
        limit: usize,
    ) -> Vec<ConversationTurn> {
        let org = organization_id.as_str().to_string();
        let room = room_id.to_string();
        self.with_budget("get_recent_conversation", move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT organization_id, room_id, user_id, sender_name, role,
                    content, channel, created_at
                    FROM conversations
                    WHERE organization_id = ?1 AND room_id = ?2
                    ORDER BY created_at DESC LIMIT ?3",
                )?;
                let rows = stmt.query_map(rusqlite::params![org, room, limit as i64], |row| {
                        Ok(ConversationTurn {
                                organization_id: OrganizationId::new(row.get::<_, String>(0)?),
                                room_id: row.get(1)?,
                                user_id: row.get(2)?,
                                sender_name: row.get(3)?,
                                role: row.get(4)?,
                                content: row.get(5)?,
                                channel: row.get(6)?,
                                created_at: row.get(7)?,
                        })
                })?;
                let mut turns: Vec<_> = rows.filter_map(|r| r.ok()).collect();
                turns.reverse();
                Ok(turns)
        })
            .await
    }

    pub async fn get_conversation_summary(
        &self,
        organization_id: &OrganizationId,
        room_id: &str,
    ) -> Option<ConversationSummary> {
        let org = organization_id.as_str().to_string();
        let room = room_id.to_string();
        self.with_budget("get_conversation_summary", move |conn| {
                match conn.query_row(
                    "SELECT room_id, summary, covers_through FROM conversation_summaries
                    WHERE organization_id = ?1 AND room_id = ?2",
                    rusqlite::params![org, room],
                    |row| {
                        Ok(ConversationSummary {
                                room_id: row.get(0)?,
                                summary: row.get(1)?,
                                covers_through: row.get(2)?,
                        })
                    },
                ) {
                    Ok(s) => Ok(Some(s)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(MemoryError::Database(e)),
                }
        })
            .await
    }

    pub async fn save_message(&self, msg: ConversationMessage) -> Result<()> {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || {
                let conn = db.lock().unwrap_or_else(|p| p.into_inner());
                conn.execute(
                    "INSERT INTO conversations
                    (organization_id, room_id, user_id, sender_name, channel, role, content, created_at)
                    VALUES (?1,?2,?3,?4,?5,?6,?7,?8)",
                    rusqlite::params![
                        msg.organization_id.as_str(),
                        msg.room_id,
                        msg.user_id,
                        msg.sender_name,
                        msg.channel,
                        msg.role,
                        msg.content,
                        msg.created_at,
                    ],
                )?;
                Ok(())
        })
            .await?
    }

    pub async fn save_conversation_summary(
        &self,
        organization_id: &OrganizationId,
        room_id: &str,
        summary: &str,
        covers_through: &str,
    ) -> Result<()> {
        let org = organization_id.as_str().to_string();
        let room = room_id.to_string();
        let summary = summary.to_string();
        let covers_through = covers_through.to_string();
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || {
                let conn = db.lock().unwrap_or_else(|p| p.into_inner());
                let now = chrono::Utc::now().to_rfc3339();
                conn.execute(
                    "INSERT INTO conversation_summaries (organization_id, room_id, summary, covers_through, updated_at)
                    VALUES (?1,?2,?3,?4,?5)
                    ON CONFLICT(organization_id, room_id)
                    DO UPDATE SET summary = excluded.summary,
                    covers_through = excluded.covers_through,
                    updated_at = excluded.updated_at",
                    rusqlite::params![org, room, summary, covers_through, now],
                )?;
                Ok(())
        })
            .await?
    }

    // -- preferences ----------------------------------------------------------

    pub async fn get_user_preferences(
        &self,
        organization_id: &OrganizationId,
        user_id: &str,
    ) -> UserPreferences {
        let org = organization_id.as_str().to_string();
        let uid = user_id.to_string();
        self.with_budget("get_user_preferences", move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, organization_id, user_id, category, key, value, confidence,
                    source, expires_at, created_at, updated_at
                    FROM user_memory
                    WHERE organization_id = ?1 AND user_id = ?2
                    ORDER BY
                    CASE category
                    WHEN 'instruction' THEN 0
                    WHEN 'preference' THEN 1
                    WHEN 'fact' THEN 2
                    WHEN 'context' THEN 3
                    END, confidence DESC",
                )?;
                let rows = stmt.query_map(rusqlite::params![org, uid], row_to_memory)?;
                let memories: Vec<UserMemory> = rows.filter_map(|r| r.ok()).collect();

                let mut prefs = UserPreferences::default();
                for m in &memories {
                    match m.key.as_str() {
                        "language" => prefs.language = Some(m.value.clone()),
                        "tone" => prefs.tone = Some(m.value.clone()),
                        "timezone" => prefs.timezone = Some(m.value.clone()),
                        "interest" => prefs.interests.push(m.value.clone()),
                        _ => {}
                    }
                }
                prefs.learned = memories;
                Ok(prefs)
        })
            .await
    }

    pub async fn learn(
        &self,
        organization_id: &OrganizationId,
        user_id: &str,
        category: MemoryCategory,
        key: &str,
        value: &str,
        confidence: f64,
        source: MemorySource,
    ) -> Result<()> {
        let org = organization_id.as_str().to_string();
        let uid = user_id.to_string();
        let key = key.to_string();
        let value = value.to_string();
        let cat = category.to_string();
        let src = source.to_string();
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || {
                let conn = db.lock().unwrap_or_else(|p| p.into_inner());
                let now = chrono::Utc::now().to_rfc3339();

                let existing: Option<(i64, f64)> = conn
                    .query_row(
                    "SELECT id, confidence FROM user_memory
                    WHERE organization_id = ?1 AND user_id = ?2 AND category = ?3 AND key = ?4",
                    rusqlite::params![org, uid, cat, key],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                    .ok();

                match existing {
                    Some((_, old_conf)) if confidence < old_conf => Ok(()),
                    Some((id, _)) => {
                        conn.execute(
                            "UPDATE user_memory SET value = ?1, confidence = ?2, source = ?3, updated_at = ?4
                            WHERE id = ?5",
                            rusqlite::params![value, confidence, src, now, id],
                        )?;
                        conn.execute(
                            "INSERT INTO user_memory_fts(user_memory_fts, rowid, key, value) VALUES('delete', ?1, ?2, ?3)",
                            rusqlite::params![id, key, value],
                        )?;
                        conn.execute(
                            "INSERT INTO user_memory_fts(rowid, key, value) VALUES(?1, ?2, ?3)",
                            rusqlite::params![id, key, value],
                        )?;
                        Ok(())
                    }
                    None => {
                        conn.execute(
                            "INSERT INTO user_memory
                            (organization_id, user_id, category, key, value, confidence, source, created_at, updated_at)
                            VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?8)",
                            rusqlite::params![org, uid, cat, key, value, confidence, src, now],
                        )?;
                        let id = conn.last_insert_rowid();
                        conn.execute(
                            "INSERT INTO user_memory_fts(rowid, key, value) VALUES(?1, ?2, ?3)",
                            rusqlite::params![id, key, value],
                        )?;
                        Ok(())
                    }
                }
        })
            .await?
    }

    pub async fn forget(
        &self,
        organization_id: &OrganizationId,
        user_id: &str,
        category: MemoryCategory,
        key: &str,
    ) -> Result<()> {
        let org = organization_id.as_str().to_string();
        let uid = user_id.to_string();
        let cat = category.to_string();
        let key = key.to_string();
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || {
                let conn = db.lock().unwrap_or_else(|p| p.into_inner());
                let row: Option<(i64, String)> = conn
                    .query_row(
                    "SELECT id, value FROM user_memory
                    WHERE organization_id = ?1 AND user_id = ?2 AND category = ?3 AND key = ?4",
                    rusqlite::params![org, uid, cat, key],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                    .ok();
                if let Some((id, value)) = row {
                    conn.execute(
                        "INSERT INTO user_memory_fts(user_memory_fts, rowid, key, value) VALUES('delete', ?1, ?2, ?3)",
                        rusqlite::params![id, key, value],
                    )?;
                    conn.execute("DELETE FROM user_memory WHERE id = ?1", rusqlite::params![id])?;
                    Ok(())
                } else {
                    Err(MemoryError::NotFound { category: cat, key })
                }
        })
            .await?
    }

    // -- persons / tasks / goals / insights ------------------------------------

    pub async fn get_person_info(
        &self,
        organization_id: &OrganizationId,
        limit: usize,
    ) -> Vec<PersonInfo> {
        let org = organization_id.as_str().to_string();
        self.with_budget("get_person_info", move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT person_id, organization_id, display_name, aliases, relation
                    FROM persons WHERE organization_id = ?1
                    ORDER BY created_at DESC LIMIT ?2",
                )?;
                let rows = stmt.query_map(rusqlite::params![org, limit as i64], |row| {
                        let aliases_json: String = row.get(3)?;
                        let aliases: Vec<String> = serde_json::from_str(&aliases_json).unwrap_or_default();
                        Ok(PersonInfo {
                                person_id: row.get(0)?,
                                organization_id: OrganizationId::new(row.get::<_, String>(1)?),
                                display_name: row.get(2)?,
                                aliases,
                                relation: row.get(4)?,
                        })
                })?;
                Ok(rows.filter_map(|r| r.ok()).collect())
        })
            .await
    }

    pub async fn get_recent_tasks(
        &self,
        organization_id: &OrganizationId,
        limit: usize,
    ) -> Vec<TaskSummary> {
        let org = organization_id.as_str().to_string();
        self.with_budget("get_recent_tasks", move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT task_id, organization_id, body, assigned_to, status, limit_date, created_at
                    FROM tasks WHERE organization_id = ?1
                    ORDER BY created_at DESC LIMIT ?2",
                )?;
                let rows = stmt.query_map(rusqlite::params![org, limit as i64], |row| {
                        Ok(TaskSummary {
                                task_id: row.get(0)?,
                                organization_id: OrganizationId::new(row.get::<_, String>(1)?),
                                body: row.get(2)?,
                                assigned_to: row.get(3)?,
                                status: row.get(4)?,
                                limit_date: row.get(5)?,
                                created_at: row.get(6)?,
                        })
                })?;
                Ok(rows.filter_map(|r| r.ok()).collect())
        })
            .await
    }

    pub async fn create_task(
        &self,
        organization_id: &OrganizationId,
        body: &str,
        assigned_to: Option<&str>,
        limit_date: Option<&str>,
    ) -> Result<TaskSummary> {
        let org = organization_id.clone();
        let body = body.to_string();
        let assigned_to = assigned_to.map(|s| s.to_string());
        let limit_date = limit_date.map(|s| s.to_string());
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || {
                let conn = db.lock().unwrap_or_else(|p| p.into_inner());
                let task_id = uuid::Uuid::now_v7().to_string();
                let now = chrono::Utc::now().to_rfc3339();
                conn.execute(
                    "INSERT INTO tasks (task_id, organization_id, body, assigned_to, status, limit_date, created_at)
                    VALUES (?1,?2,?3,?4,'open',?5,?6)",
                    rusqlite::params![task_id, org.as_str(), body, assigned_to, limit_date, now],
                )?;
                Ok(TaskSummary {
                        task_id,
                        organization_id: org,
                        body,
                        assigned_to,
                        status: "open".to_string(),
                        limit_date,
                        created_at: now,
                })
        })
            .await?
    }

    pub async fn get_active_goals(
        &self,
        organization_id: &OrganizationId,
        user_id: &str,
    ) -> Vec<GoalSummary> {
        let org = organization_id.as_str().to_string();
        let uid = user_id.to_string();
        self.with_budget("get_active_goals", move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT goal_id, organization_id, user_id, title, why, status, created_at
                    FROM goals WHERE organization_id = ?1 AND user_id = ?2 AND status = 'active'
                    ORDER BY created_at DESC",
                )?;
                let rows = stmt.query_map(rusqlite::params![org, uid], |row| {
                        Ok(GoalSummary {
                                goal_id: row.get(0)?,
                                organization_id: OrganizationId::new(row.get::<_, String>(1)?),
                                user_id: row.get(2)?,
                                title: row.get(3)?,
                                why: row.get(4)?,
                                status: row.get(5)?,
                                created_at: row.get(6)?,
                        })
                })?;
                Ok(rows.filter_map(|r| r.ok()).collect())
        })
            .await
    }

    pub async fn create_goal(
        &self,
        organization_id: &OrganizationId,
        user_id: &str,
        title: &str,
        why: Option<&str>,
    ) -> Result<GoalSummary> {
        let org = organization_id.clone();
        let uid = user_id.to_string();
        let title = title.to_string();
        let why = why.map(|s| s.to_string());
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || {
                let conn = db.lock().unwrap_or_else(|p| p.into_inner());
                let goal_id = uuid::Uuid::now_v7().to_string();
                let now = chrono::Utc::now().to_rfc3339();
                conn.execute(
                    "INSERT INTO goals (goal_id, organization_id, user_id, title, why, status, created_at)
                    VALUES (?1,?2,?3,?4,?5,'active',?6)",
                    rusqlite::params![goal_id, org.as_str(), uid, title, why, now],
                )?;
                Ok(GoalSummary {
                        goal_id,
                        organization_id: org,
                        user_id: uid,
                        title,
                        why,
                        status: "active".to_string(),
                        created_at: now,
                })
        })
            .await?
    }

    pub async fn get_recent_insights(
        &self,
        organization_id: &OrganizationId,
        user_id: &str,
        limit: usize,
    ) -> Vec<InsightSummary> {
        let org = organization_id.as_str().to_string();
        let uid = user_id.to_string();
        self.with_budget("get_recent_insights", move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT insight_id, organization_id, user_id, content, created_at
                    FROM insights WHERE organization_id = ?1 AND user_id = ?2
                    ORDER BY created_at DESC LIMIT ?3",
                )?;
                let rows = stmt.query_map(rusqlite::params![org, uid, limit as i64], |row| {
                        Ok(InsightSummary {
                                insight_id: row.get(0)?,
                                organization_id: OrganizationId::new(row.get::<_, String>(1)?),
                                user_id: row.get(2)?,
                                content: row.get(3)?,
                                created_at: row.get(4)?,
                        })
                })?;
                Ok(rows.filter_map(|r| r.ok()).collect())
        })
            .await
    }

    /// Always empty: candidate knowledge chunks are filled lazily once
    /// a knowledge capability actually executes. Kept as a method for API
    /// completeness/documentation of the contract.
    pub async fn get_relevant_knowledge(
        &self,
        _organization_id: &OrganizationId,
        _query: &str,
    ) -> Vec<KnowledgeChunk> {
        Vec::new()
    }

    async fn get_recalled_episodes(
        &self,
        organization_id: &OrganizationId,
        user_id: &str,
        limit: usize,
    ) -> Vec<Episode> {
        let org = organization_id.as_str().to_string();
        let uid = user_id.to_string();
        self.with_budget("get_recalled_episodes", move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT episode_id, organization_id, user_id, episode_type, summary,
                    entities, keywords, importance, created_at
                    FROM episodes WHERE organization_id = ?1 AND (user_id = ?2 OR user_id IS NULL)
                    ORDER BY importance DESC, created_at DESC LIMIT ?3",
                )?;
                let rows = stmt.query_map(rusqlite::params![org, uid, limit as i64], row_to_episode)?;
                Ok(rows.filter_map(|r| r.ok()).collect())
        })
            .await
    }

    // -- learning / outcomes ------------------------------------------------

    pub async fn record_episode(&self, episode: Episode) -> Result<()> {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || {
                let conn = db.lock().unwrap_or_else(|p| p.into_inner());
                let entities = serde_json::to_string(&episode.entities).unwrap_or_default();
                let keywords = serde_json::to_string(&episode.keywords).unwrap_or_default();
                let summary: String = episode
                    .summary
                    .chars()
                    .take(cortex_core::types::EPISODE_SUMMARY_MAX_CHARS)
                    .collect();
                conn.execute(
                    "INSERT INTO episodes
                    (episode_id, organization_id, user_id, episode_type, summary, entities, keywords, importance, created_at)
                    VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9)",
                    rusqlite::params![
                        episode.episode_id,
                        episode.organization_id.as_str(),
                        episode.user_id,
                        episode.episode_type,
                        summary,
                        entities,
                        keywords,
                        episode.importance,
                        episode.created_at,
                    ],
                )?;
                Ok(())
        })
            .await?
    }

    /// Fire-and-forget outcome append. Content is never written.
    #[allow(clippy::too_many_arguments)]
    pub async fn record_outcome(
        &self,
        organization_id: &OrganizationId,
        decision_id: &str,
        action: &str,
        confidence: f32,
        success: bool,
        risk_level: &str,
        reason_code: Option<&str>,
    ) -> Result<()> {
        let org = organization_id.as_str().to_string();
        let decision_id = decision_id.to_string();
        let action = action.to_string();
        let risk_level = risk_level.to_string();
        let reason_code = reason_code.map(|s| s.to_string());
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || {
                let conn = db.lock().unwrap_or_else(|p| p.into_inner());
                let now = chrono::Utc::now().to_rfc3339();
                conn.execute(
                    "INSERT INTO outcomes
                    (organization_id, decision_id, action, confidence, success, risk_level, reason_code, created_at)
                    VALUES (?1,?2,?3,?4,?5,?6,?7,?8)",
                    rusqlite::params![org, decision_id, action, confidence as f64, success, risk_level, reason_code, now],
                )?;
                Ok(())
        })
            .await?
    }

    /// Append explicit user feedback ("helpful"/"wrong"/"incomplete") tied to
    /// a prior decision id.
    pub async fn record_feedback(&self, decision_id: &str, feedback: &str) -> Result<()> {
        let decision_id = decision_id.to_string();
        let feedback = feedback.to_string();
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || {
                let conn = db.lock().unwrap_or_else(|p| p.into_inner());
                let n = conn.execute(
                    "UPDATE outcomes SET feedback = ?1 WHERE decision_id = ?2",
                    rusqlite::params![feedback, decision_id],
                )?;
                if n == 0 {
                    return Err(MemoryError::NotFound {
                            category: "outcome".to_string(),
                            key: decision_id,
                    });
                }
                Ok(())
        })
            .await?
    }

    // -- fan-out ----------------------------------------------------------------

    /// `get_all_context`: fans every slice out concurrently under the
    /// context-build budget and merges whatever comes back, tolerating
    /// partial failure of any subset.
    pub async fn get_all_context(
        &self,
        organization_id: &OrganizationId,
        room_id: &str,
        user_id: &str,
    ) -> AllContext {
        let (
            recent_conversation,
            conversation_summary,
            preferences,
            persons,
            recent_tasks,
            active_goals,
            recent_insights,
            recalled_episodes,
        ) = tokio::join!(
            self.get_recent_conversation(organization_id, room_id, DEFAULT_RECENT_WINDOW),
            self.get_conversation_summary(organization_id, room_id),
            self.get_user_preferences(organization_id, user_id),
            self.get_person_info(organization_id, 50),
            self.get_recent_tasks(organization_id, 20),
            self.get_active_goals(organization_id, user_id),
            self.get_recent_insights(organization_id, user_id, 10),
            self.get_recalled_episodes(organization_id, user_id, 10),
        );

        AllContext {
            recent_conversation,
            conversation_summary,
            preferences,
            persons,
            recent_tasks,
            active_goals,
            recent_insights,
            recalled_episodes,
            knowledge_chunks: Vec::new(),
        }
    }
}

fn row_to_memory(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserMemory> {
    let cat_str: String = row.get(3)?;
    let src_str: String = row.get(7)?;
    Ok(UserMemory {
            id: row.get(0)?,
            organization_id: OrganizationId::new(row.get::<_, String>(1)?),
            user_id: row.get(2)?,
            category: cat_str.parse().unwrap_or(MemoryCategory::Context),
            key: row.get(4)?,
            value: row.get(5)?,
            confidence: row.get(6)?,
            source: src_str.parse().unwrap_or(MemorySource::Inferred),
            expires_at: row.get(8)?,
            created_at: row.get(9)?,
            updated_at: row.get(10)?,
    })
}

fn row_to_episode(row: &rusqlite::Row<'_>) -> rusqlite::Result<Episode> {
    let entities_json: String = row.get(5)?;
    let keywords_json: String = row.get(6)?;
    Ok(Episode {
            episode_id: row.get(0)?,
            organization_id: OrganizationId::new(row.get::<_, String>(1)?),
            user_id: row.get(2)?,
            episode_type: row.get(3)?,
            summary: row.get(4)?,
            entities: serde_json::from_str(&entities_json).unwrap_or_default(),
            keywords: serde_json::from_str(&keywords_json).unwrap_or_default(),
            importance: row.get(7)?,
            created_at: row.get(8)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;

    fn manager() -> MemoryManager {
        let conn = Connection::open_in_memory().unwrap();
        init_db(&conn).unwrap();
        MemoryManager::new(conn)
    }

    fn org() -> OrganizationId {
        OrganizationId::new("org_acme")
    }

    #[tokio::test]
    async fn learn_then_get_user_preferences_surfaces_known_keys() {
        let mgr = manager();
        mgr.learn(&org(), "u1", MemoryCategory::Preference, "language", "pt-BR", 0.9, MemorySource::UserSaid)
            .await
            .unwrap();
        mgr.learn(&org(), "u1", MemoryCategory::Preference, "interest", "hiking", 0.7, MemorySource::Inferred)
            .await
            .unwrap();

        let prefs = mgr.get_user_preferences(&org(), "u1").await;
        assert_eq!(prefs.language.as_deref(), Some("pt-BR"));
        assert_eq!(prefs.interests, vec!["hiking".to_string()]);
        assert_eq!(prefs.learned.len(), 2);
    }

    #[tokio::test]
    async fn learn_does_not_downgrade_higher_confidence_value() {
        let mgr = manager();
        mgr.learn(&org(), "u1", MemoryCategory::Fact, "favorite_color", "blue", 0.9, MemorySource::UserSaid)
            .await
            .unwrap();
        mgr.learn(&org(), "u1", MemoryCategory::Fact, "favorite_color", "green", 0.3, MemorySource::Inferred)
            .await
            .unwrap();

        let prefs = mgr.get_user_preferences(&org(), "u1").await;
        let fact = prefs.learned.iter().find(|m| m.key == "favorite_color").unwrap();
        assert_eq!(fact.value, "blue");
    }

    #[tokio::test]
    async fn forget_removes_the_row() {
        let mgr = manager();
        mgr.learn(&org(), "u1", MemoryCategory::Fact, "pet", "dog", 0.9, MemorySource::UserSaid)
            .await
            .unwrap();
        mgr.forget(&org(), "u1", MemoryCategory::Fact, "pet").await.unwrap();
        let prefs = mgr.get_user_preferences(&org(), "u1").await;
        assert!(prefs.learned.is_empty());
    }

    #[tokio::test]
    async fn forget_unknown_key_is_not_found() {
        let mgr = manager();
        let err = mgr.forget(&org(), "u1", MemoryCategory::Fact, "nope").await.unwrap_err();
        assert!(matches!(err, MemoryError::NotFound { .. }));
    }

    #[tokio::test]
    async fn tenants_never_see_each_others_memory() {
        let mgr = manager();
        mgr.learn(&org(), "u1", MemoryCategory::Fact, "k", "v1", 0.9, MemorySource::UserSaid)
            .await
            .unwrap();
        mgr.learn(&OrganizationId::new("org_other"), "u1", MemoryCategory::Fact, "k", "v2", 0.9, MemorySource::UserSaid)
            .await
            .unwrap();

        let prefs = mgr.get_user_preferences(&org(), "u1").await;
        assert_eq!(prefs.learned.len(), 1);
        assert_eq!(prefs.learned[0].value, "v1");
    }

    #[tokio::test]
    async fn save_message_then_get_recent_conversation_returns_chronological_order() {
        let mgr = manager();
        for i in 0..3 {
            mgr.save_message(ConversationMessage {
                    id: 0,
                    organization_id: org(),
                    room_id: "room1".to_string(),
                    user_id: Some("u1".to_string()),
                    sender_name: "u1".to_string(),
                    channel: "webchat".to_string(),
                    role: "user".to_string(),
                    content: format!("msg{i}"),
                    created_at: format!("2026-01-01T00:00:0{i}Z"),
            })
                .await
                .unwrap();
        }

        let turns = mgr.get_recent_conversation(&org(), "room1", 20).await;
        assert_eq!(turns.len(), 3);
        assert_eq!(turns[0].content, "msg0");
        assert_eq!(turns[2].content, "msg2");
    }

    #[tokio::test]
    async fn get_all_context_fans_out_and_always_returns_empty_knowledge_chunks() {
        let mgr = manager();
        mgr.learn(&org(), "u1", MemoryCategory::Preference, "tone", "warm", 0.8, MemorySource::UserSaid)
            .await
            .unwrap();

        let ctx = mgr.get_all_context(&org(), "room1", "u1").await;
        assert_eq!(ctx.preferences.tone.as_deref(), Some("warm"));
        assert!(ctx.knowledge_chunks.is_empty());
    }

    #[tokio::test]
    async fn record_outcome_then_feedback_updates_row() {
        let mgr = manager();
        mgr.record_outcome(&org(), "dec1", "send_reply", 0.95, true, "LOW", None)
            .await
            .unwrap();
        mgr.record_feedback("dec1", "helpful").await.unwrap();
    }

    #[tokio::test]
    async fn record_feedback_unknown_decision_is_not_found() {
        let mgr = manager();
        let err = mgr.record_feedback("missing", "helpful").await.unwrap_err();
        assert!(matches!(err, MemoryError::NotFound { .. }));
    }
}
