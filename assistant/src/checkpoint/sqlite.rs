//! SQLite-backed checkpoint store
//!
//! Stores checkpoints in `~/.sql-assistant/checkpoints.db` by default. Every
//! commit runs in a single transaction, so a crash mid-commit leaves the
//! thread at its previous checkpoint.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension};

use super::{schema, Checkpoint, CheckpointStore, StoreError, ThreadSummary};
use crate::messages::Message;
use crate::workflow::Node;

/// Checkpoint store with thread-safe access to one SQLite connection
#[derive(Clone)]
pub struct SqliteCheckpointStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteCheckpointStore {
    /// Open or create the store at a specific path
    pub fn open_at(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        let store = Self::from_connection(conn)?;

        tracing::info!("Checkpoint store opened at {:?}", path);
        Ok(store)
    }

    /// Store backed by a private in-memory database
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    /// Default location: ~/.sql-assistant/checkpoints.db
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".sql-assistant").join("checkpoints.db"))
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        schema::create_tables(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }
}

fn parse_pending(thread_id: &str, raw: Option<String>) -> Result<Option<Node>, StoreError> {
    raw.map(|s| {
        s.parse::<Node>().map_err(|detail| StoreError::Corrupt {
            thread_id: thread_id.to_string(),
            detail,
        })
    })
    .transpose()
}

fn parse_timestamp(thread_id: &str, raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt {
            thread_id: thread_id.to_string(),
            detail: format!("bad timestamp {:?}: {}", raw, e),
        })
}

#[async_trait]
impl CheckpointStore for SqliteCheckpointStore {
    async fn load(&self, thread_id: &str) -> Result<Checkpoint, StoreError> {
        let conn = self.conn()?;

        let pending: Option<Option<String>> = conn
            .query_row(
                "SELECT pending FROM threads WHERE id = ?1",
                [thread_id],
                |row| row.get(0),
            )
            .optional()?;

        let Some(pending) = pending else {
            return Ok(Checkpoint::empty(thread_id));
        };

        let mut stmt = conn.prepare(
            r#"
            SELECT body
            FROM thread_messages
            WHERE thread_id = ?1
            ORDER BY seq ASC
            "#,
        )?;
        let bodies = stmt
            .query_map([thread_id], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        let messages = bodies
            .iter()
            .map(|body| serde_json::from_str::<Message>(body))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Checkpoint {
            thread_id: thread_id.to_string(),
            messages,
            pending: parse_pending(thread_id, pending)?,
        })
    }

    async fn commit(
        &self,
        thread_id: &str,
        messages: &[Message],
        pending: Option<Node>,
    ) -> Result<(), StoreError> {
        // Serialize before touching the database so a bad message aborts cleanly
        let bodies = messages
            .iter()
            .map(|m| serde_json::to_string(m).map(|body| (m.kind(), body)))
            .collect::<Result<Vec<_>, _>>()?;

        let now = Utc::now().to_rfc3339();
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        tx.execute(
            r#"
            INSERT INTO threads (id, pending, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?3)
            ON CONFLICT(id) DO UPDATE SET pending = excluded.pending, updated_at = excluded.updated_at
            "#,
            (thread_id, pending.map(Node::as_str), &now),
        )?;

        let next_seq: i64 = tx.query_row(
            "SELECT COALESCE(MAX(seq) + 1, 0) FROM thread_messages WHERE thread_id = ?1",
            [thread_id],
            |row| row.get(0),
        )?;

        {
            let mut insert = tx.prepare(
                r#"
                INSERT INTO thread_messages (thread_id, seq, kind, body, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )?;
            for (offset, (kind, body)) in bodies.iter().enumerate() {
                insert.execute((thread_id, next_seq + offset as i64, kind, body, &now))?;
            }
        }

        tx.commit()?;

        tracing::debug!(
            thread_id,
            appended = messages.len(),
            pending = ?pending,
            "Committed checkpoint"
        );
        Ok(())
    }

    async fn list_threads(&self) -> Result<Vec<ThreadSummary>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT t.id, t.pending, t.updated_at, COUNT(m.seq)
            FROM threads t
            LEFT JOIN thread_messages m ON m.thread_id = t.id
            GROUP BY t.id
            ORDER BY t.updated_at DESC
            "#,
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(thread_id, pending, updated_at, count)| {
                Ok(ThreadSummary {
                    pending: parse_pending(&thread_id, pending)?,
                    updated_at: parse_timestamp(&thread_id, &updated_at)?,
                    message_count: count as usize,
                    thread_id,
                })
            })
            .collect()
    }
}
