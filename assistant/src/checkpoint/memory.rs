//! In-process checkpoint store

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{Checkpoint, CheckpointStore, StoreError, ThreadSummary};
use crate::messages::Message;
use crate::workflow::Node;

struct Entry {
    messages: Vec<Message>,
    pending: Option<Node>,
    updated_at: DateTime<Utc>,
}

/// Checkpoints kept in a map; lost when the process exits
#[derive(Default)]
pub struct InMemoryCheckpointStore {
    threads: RwLock<HashMap<String, Entry>>,
}

impl InMemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CheckpointStore for InMemoryCheckpointStore {
    async fn load(&self, thread_id: &str) -> Result<Checkpoint, StoreError> {
        let threads = self.threads.read().await;
        Ok(match threads.get(thread_id) {
            Some(entry) => Checkpoint {
                thread_id: thread_id.to_string(),
                messages: entry.messages.clone(),
                pending: entry.pending,
            },
            None => Checkpoint::empty(thread_id),
        })
    }

    async fn commit(
        &self,
        thread_id: &str,
        messages: &[Message],
        pending: Option<Node>,
    ) -> Result<(), StoreError> {
        let mut threads = self.threads.write().await;
        let entry = threads.entry(thread_id.to_string()).or_insert_with(|| Entry {
            messages: Vec::new(),
            pending: None,
            updated_at: Utc::now(),
        });
        entry.messages.extend_from_slice(messages);
        entry.pending = pending;
        entry.updated_at = Utc::now();

        tracing::debug!(
            thread_id,
            appended = messages.len(),
            pending = ?pending,
            "Committed in-memory checkpoint"
        );
        Ok(())
    }

    async fn list_threads(&self) -> Result<Vec<ThreadSummary>, StoreError> {
        let threads = self.threads.read().await;
        let mut summaries: Vec<ThreadSummary> = threads
            .iter()
            .map(|(id, entry)| ThreadSummary {
                thread_id: id.clone(),
                message_count: entry.messages.len(),
                pending: entry.pending,
                updated_at: entry.updated_at,
            })
            .collect();
        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(summaries)
    }
}
