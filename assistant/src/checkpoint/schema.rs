//! Checkpoint schema definitions

use rusqlite::Connection;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// Create all tables if they don't exist
pub fn create_tables(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        -- One row per conversation thread
        CREATE TABLE IF NOT EXISTS threads (
            id TEXT PRIMARY KEY,
            pending TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        -- Append-only message log, ordered by seq within a thread
        CREATE TABLE IF NOT EXISTS thread_messages (
            thread_id TEXT NOT NULL,
            seq INTEGER NOT NULL,
            kind TEXT NOT NULL,
            body TEXT NOT NULL,
            created_at TEXT NOT NULL,
            PRIMARY KEY (thread_id, seq),
            FOREIGN KEY (thread_id) REFERENCES threads(id) ON DELETE CASCADE
        );

        -- Index for listing threads by update time
        CREATE INDEX IF NOT EXISTS idx_threads_updated
        ON threads(updated_at DESC);

        -- Schema version tracking
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );

        INSERT OR IGNORE INTO schema_version (version) VALUES (1);
        "#,
    )
}

/// Get the current schema version
pub fn get_version(conn: &Connection) -> rusqlite::Result<i32> {
    conn.query_row(
        "SELECT version FROM schema_version ORDER BY version DESC LIMIT 1",
        [],
        |row| row.get(0),
    )
}
