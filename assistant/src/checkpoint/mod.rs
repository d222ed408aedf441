//! Checkpoint persistence
//!
//! Each thread has one checkpoint: its ordered message log plus the node the
//! workflow is suspended in front of, if any. The store is the only owner of
//! persisted state; a run works on a copy and commits it back in one step.
//!
//! Two backends implement [`CheckpointStore`]:
//! - [`InMemoryCheckpointStore`] for tests and throwaway sessions
//! - [`SqliteCheckpointStore`] for durable state in a SQLite file

mod memory;
mod schema;
mod sqlite;

pub use memory::InMemoryCheckpointStore;
pub use sqlite::SqliteCheckpointStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::messages::Message;
use crate::workflow::Node;

/// Snapshot of one thread
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Checkpoint {
    pub thread_id: String,
    pub messages: Vec<Message>,
    pub pending: Option<Node>,
}

impl Checkpoint {
    /// Checkpoint of a thread that has never been committed
    pub fn empty(thread_id: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
            messages: Vec::new(),
            pending: None,
        }
    }

    pub fn is_waiting_for_approval(&self) -> bool {
        self.pending == Some(Node::HumanApproval)
    }
}

/// Listing entry for a stored thread
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThreadSummary {
    pub thread_id: String,
    pub message_count: usize,
    pub pending: Option<Node>,
    pub updated_at: DateTime<Utc>,
}

/// Errors raised by checkpoint backends
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt checkpoint for thread {thread_id}: {detail}")]
    Corrupt { thread_id: String, detail: String },

    #[error("Checkpoint store lock poisoned")]
    Poisoned,
}

/// Durable per-thread state behind one interface
///
/// Commits are atomic: either every message and the pending marker land, or
/// nothing does. Callers hold the thread's run lock while committing, so a
/// store never sees two writers for the same thread.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Last committed checkpoint, or an empty one for a new thread
    async fn load(&self, thread_id: &str) -> Result<Checkpoint, StoreError>;

    /// Append `messages` and set the pending marker in one step
    async fn commit(
        &self,
        thread_id: &str,
        messages: &[Message],
        pending: Option<Node>,
    ) -> Result<(), StoreError>;

    /// Append `messages` and clear the pending marker
    async fn append_and_clear_pending(
        &self,
        thread_id: &str,
        messages: &[Message],
    ) -> Result<(), StoreError> {
        self.commit(thread_id, messages, None).await
    }

    /// All known threads, most recently updated first
    async fn list_threads(&self) -> Result<Vec<ThreadSummary>, StoreError>;
}
