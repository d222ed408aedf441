//! Conversation messages
//!
//! A thread's log is an append-only sequence of [`Message`]s. Each variant is
//! one message kind; persistence stores them kind-tagged so the log can be
//! replayed exactly as it was committed.

use serde::{Deserialize, Serialize};

/// Prefix of a user message that closes a turn after out-of-band execution
pub const CONTROL_PREFIX: &str = "<SYSTEM:";

/// Control message injected after an approved query ran outside the engine
pub const EXECUTION_COMPLETED: &str = "<SYSTEM: Execution Completed Locally>";

/// One entry in a thread's message log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "body", rename_all = "snake_case")]
pub enum Message {
    /// Text from the human
    User(UserMessage),
    /// Model output: text and zero or more tool requests
    Agent(AgentMessage),
    /// Output of one tool request
    ToolResult(ToolResult),
    /// Internal control message, never produced by the model
    System(SystemSignal),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMessage {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentMessage {
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_requests: Vec<ToolRequest>,
}

/// A tool invocation requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolRequest {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub arguments: serde_json::Value,
}

/// Tool output linked to the request that produced it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResult {
    pub request_id: String,
    pub tool_name: String,
    pub content: String,
    #[serde(default)]
    pub is_error: bool,
}

/// Control signals appended by the engine or the orchestrator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "signal", rename_all = "snake_case")]
pub enum SystemSignal {
    /// The proposed action was executed outside the engine
    ActionCompleted,
    /// The model call failed or timed out
    AgentFailure { error: String },
    /// The run hit the configured agent step limit
    StepLimitReached { limit: usize },
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Message::User(UserMessage { text: text.into() })
    }

    pub fn agent(text: impl Into<String>) -> Self {
        Message::Agent(AgentMessage {
            text: text.into(),
            tool_requests: Vec::new(),
        })
    }

    pub fn agent_with_tools(text: impl Into<String>, tool_requests: Vec<ToolRequest>) -> Self {
        Message::Agent(AgentMessage {
            text: text.into(),
            tool_requests,
        })
    }

    /// Short kind label, used for persistence and logs
    pub fn kind(&self) -> &'static str {
        match self {
            Message::User(_) => "user",
            Message::Agent(_) => "agent",
            Message::ToolResult(_) => "tool_result",
            Message::System(_) => "system",
        }
    }

    /// Human-readable text of the message
    pub fn text(&self) -> String {
        match self {
            Message::User(m) => m.text.clone(),
            Message::Agent(m) => m.text.clone(),
            Message::ToolResult(r) => r.content.clone(),
            Message::System(signal) => signal.to_string(),
        }
    }

    /// True for messages that only close out a turn after out-of-band execution
    pub fn is_control(&self) -> bool {
        match self {
            Message::User(m) => is_control_text(&m.text),
            Message::System(SystemSignal::ActionCompleted) => true,
            Message::Agent(_) | Message::ToolResult(_) | Message::System(_) => false,
        }
    }
}

/// Whether user text carries the reserved control prefix
pub fn is_control_text(text: &str) -> bool {
    text.starts_with(CONTROL_PREFIX)
}

impl std::fmt::Display for SystemSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SystemSignal::ActionCompleted => write!(f, "Action completed"),
            SystemSignal::AgentFailure { error } => write!(f, "Agent failed: {}", error),
            SystemSignal::StepLimitReached { limit } => {
                write!(f, "Agent reached maximum steps ({}) without completing", limit)
            }
        }
    }
}

/// Text reported to the caller for a finished or suspended run.
///
/// Walks back from the end of the log, skipping control messages, so a turn
/// closed by a control message reports the agent reply it closed.
pub fn reported_answer(messages: &[Message]) -> String {
    messages
        .iter()
        .rev()
        .find(|m| !m.is_control())
        .map(Message::text)
        .unwrap_or_default()
}
