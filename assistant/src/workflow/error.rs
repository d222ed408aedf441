//! Workflow errors
//!
//! Only protocol misuse and infrastructure failures surface here. Model and
//! tool failures are recorded as messages in the thread log instead.

use crate::checkpoint::StoreError;

/// Errors that can occur while running the workflow
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// Resume on a thread with nothing to resume, or a bad resume payload
    #[error("Invalid resume: {0}")]
    InvalidResume(String),

    /// Another run holds this thread
    #[error("Thread is busy: {0}")]
    ThreadBusy(String),

    /// Checkpoint store failure; the thread stays at its last commit
    #[error("Persistence failure: {0}")]
    Persistence(#[from] StoreError),
}
