use rusqlite::{Connection, Result};

/// Initialise every Memory Access table. Safe to call on every startup
/// (idempotent — `IF NOT EXISTS` throughout). Every table is tenant-scoped
/// via an `organization_id` column and every index leads with it, matching
/// the invariant that every query filters by tenant.
pub fn init_db(conn: &Connection) -> Result<()> {
    create_conversations_table(conn)?;
    create_conversation_summaries_table(conn)?;
    create_user_memory_table(conn)?;
    create_fts_index(conn)?;
    create_persons_table(conn)?;
    create_tasks_table(conn)?;
    create_goals_table(conn)?;
    create_insights_table(conn)?;
    create_episodes_table(conn)?;
    create_outcomes_table(conn)?;
    Ok(())
}

fn create_conversations_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS conversations (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        organization_id TEXT NOT NULL,
        room_id TEXT NOT NULL,
        user_id TEXT,
        sender_name TEXT NOT NULL,
        channel TEXT NOT NULL,
        role TEXT NOT NULL,
        content TEXT NOT NULL,
        created_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_conv_room
        ON conversations(organization_id, room_id, created_at DESC);",
    )
}

fn create_conversation_summaries_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS conversation_summaries (
        organization_id TEXT NOT NULL,
        room_id TEXT NOT NULL,
        summary TEXT NOT NULL,
        covers_through TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        PRIMARY KEY (organization_id, room_id)
        );",
    )
}

fn create_user_memory_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS user_memory (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        organization_id TEXT NOT NULL,
        user_id TEXT NOT NULL,
        category TEXT NOT NULL,
        key TEXT NOT NULL,
        value TEXT NOT NULL,
        confidence REAL NOT NULL DEFAULT 0.8,
        source TEXT NOT NULL DEFAULT 'inferred',
        expires_at TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        UNIQUE(organization_id, user_id, category, key)
        );
        CREATE INDEX IF NOT EXISTS idx_memory_user
        ON user_memory(organization_id, user_id);",
    )
}

/// FTS5 virtual table for full-text search across memory keys/values.
/// `content='user_memory'` makes it an external-content table — writers
/// sync it manually on insert/update/delete.
fn create_fts_index(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE VIRTUAL TABLE IF NOT EXISTS user_memory_fts
        USING fts5(key, value, content='user_memory', content_rowid='id');",
    )
}

fn create_persons_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS persons (
        person_id TEXT PRIMARY KEY,
        organization_id TEXT NOT NULL,
        display_name TEXT NOT NULL,
        aliases TEXT NOT NULL DEFAULT '[]',
        relation TEXT,
        created_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_persons_org
        ON persons(organization_id);",
    )
}

fn create_tasks_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS tasks (
        task_id TEXT PRIMARY KEY,
        organization_id TEXT NOT NULL,
        body TEXT NOT NULL,
        assigned_to TEXT,
        status TEXT NOT NULL DEFAULT 'open',
        limit_date TEXT,
        created_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_tasks_org
        ON tasks(organization_id, created_at DESC);",
    )
}

fn create_goals_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS goals (
        goal_id TEXT PRIMARY KEY,
        organization_id TEXT NOT NULL,
        user_id TEXT NOT NULL,
        title TEXT NOT NULL,
        why TEXT,
        status TEXT NOT NULL DEFAULT 'active',
        created_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_goals_org_user
        ON goals(organization_id, user_id, created_at DESC);",
    )
}

fn create_insights_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS insights (
        insight_id TEXT PRIMARY KEY,
        organization_id TEXT NOT NULL,
        user_id TEXT NOT NULL,
        content TEXT NOT NULL,
        created_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_insights_org_user
        ON insights(organization_id, user_id, created_at DESC);",
    )
}

/// Episodic long-term memory — append-only. The body of user content is
/// never stored; only PII-safe summary/entities/keywords.
fn create_episodes_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS episodes (
        episode_id TEXT PRIMARY KEY,
        organization_id TEXT NOT NULL,
        user_id TEXT,
        episode_type TEXT NOT NULL,
        summary TEXT NOT NULL,
        entities TEXT NOT NULL DEFAULT '[]',
        keywords TEXT NOT NULL DEFAULT '[]',
        importance REAL NOT NULL DEFAULT 0.5,
        created_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_episodes_org_user
        ON episodes(organization_id, user_id, created_at DESC);",
    )
}

/// Learning outcome log — fire-and-forget appends, never content.
fn create_outcomes_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS outcomes (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        organization_id TEXT NOT NULL,
        decision_id TEXT NOT NULL,
        action TEXT NOT NULL,
        confidence REAL NOT NULL,
        success INTEGER NOT NULL,
        risk_level TEXT NOT NULL,
        reason_code TEXT,
        feedback TEXT,
        created_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_outcomes_org
        ON outcomes(organization_id, created_at DESC);
        CREATE INDEX IF NOT EXISTS idx_outcomes_decision
        ON outcomes(decision_id);",
    )
}
