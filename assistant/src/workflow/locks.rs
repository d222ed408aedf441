//! Per-thread run exclusion
//!
//! At most one run may hold a thread at a time. Distinct threads never
//! contend: each id gets its own lock.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use serde::Deserialize;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use super::error::WorkflowError;

/// What to do when a thread already has a run in flight
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BusyPolicy {
    /// Fail fast with [`WorkflowError::ThreadBusy`]
    #[default]
    Reject,
    /// Queue behind the active run
    Wait,
}

type LockMap = Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>;

/// Exclusive hold on one thread, released on drop
pub struct ThreadLease {
    thread_id: String,
    locks: LockMap,
    guard: Option<OwnedMutexGuard<()>>,
}

impl ThreadLease {
    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }
}

impl fmt::Debug for ThreadLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadLease")
            .field("thread_id", &self.thread_id)
            .finish_non_exhaustive()
    }
}

impl Drop for ThreadLease {
    fn drop(&mut self) {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        // Only the map and our guard reference the lock: nobody is waiting
        let idle = locks
            .get(&self.thread_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 2);
        if idle {
            locks.remove(&self.thread_id);
        }
        self.guard.take();
    }
}

/// Registry of per-thread locks
///
/// Entries live only while a thread is leased or has waiters.
#[derive(Default)]
pub struct ThreadLocks {
    locks: LockMap,
    policy: BusyPolicy,
}

impl ThreadLocks {
    pub fn new(policy: BusyPolicy) -> Self {
        Self {
            locks: LockMap::default(),
            policy,
        }
    }

    /// Acquire exclusive access to `thread_id` according to the busy policy
    pub async fn acquire(&self, thread_id: &str) -> Result<ThreadLease, WorkflowError> {
        let lock = self.lock_for(thread_id);

        let guard = match self.policy {
            BusyPolicy::Reject => lock.try_lock_owned().map_err(|_| {
                tracing::warn!(thread_id, "Rejected run: thread already has a run in flight");
                WorkflowError::ThreadBusy(thread_id.to_string())
            })?,
            BusyPolicy::Wait => lock.lock_owned().await,
        };

        Ok(ThreadLease {
            thread_id: thread_id.to_string(),
            locks: self.locks.clone(),
            guard: Some(guard),
        })
    }

    fn lock_for(&self, thread_id: &str) -> Arc<AsyncMutex<()>> {
        // The map only hands out Arcs; a poisoned map is still consistent
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks
            .entry(thread_id.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.locks.lock().map(|locks| locks.len()).unwrap_or_default()
    }
}
