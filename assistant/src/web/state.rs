//! Shared application state

use std::sync::Arc;

use crate::orchestrator::TurnOrchestrator;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<TurnOrchestrator>,
    /// Ollama URL
    pub llm_url: String,
    /// Model name
    pub model: String,
}

impl AppState {
    pub fn new(orchestrator: Arc<TurnOrchestrator>, llm_url: String, model: String) -> Self {
        Self {
            orchestrator,
            llm_url,
            model,
        }
    }
}
