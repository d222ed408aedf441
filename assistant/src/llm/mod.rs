//! LLM abstraction layer
//!
//! The workflow only needs one capability from a model: given the system
//! prompt, the thread's message history and the tool catalog, return either
//! text or a set of tool requests.

mod ollama;
mod types;

pub use ollama::OllamaChatModel;

use anyhow::Result;
use async_trait::async_trait;

use crate::messages::{Message, ToolRequest};
use crate::tools::ToolSpec;

/// One model turn
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelReply {
    pub text: String,
    pub tool_requests: Vec<ToolRequest>,
}

impl ModelReply {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tool_requests: Vec::new(),
        }
    }

    pub fn into_message(self) -> Message {
        Message::agent_with_tools(self.text, self.tool_requests)
    }
}

/// Trait for chat model backends
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Produce the next agent message for `history`
    async fn complete(
        &self,
        system_prompt: &str,
        history: &[Message],
        tools: &[ToolSpec],
    ) -> Result<ModelReply>;

    /// Get the model name
    fn model(&self) -> &str;
}
