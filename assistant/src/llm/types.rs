//! Wire format of Ollama's `/api/chat` endpoint

use serde::{Deserialize, Serialize};

/// Non-streaming chat request carrying the tool catalog
#[derive(Debug, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<WireMessage>,
    pub tools: Vec<WireTool>,
    pub stream: bool,
    pub options: SamplingOptions,
}

/// Sampling options
#[derive(Debug, Serialize)]
pub struct SamplingOptions {
    pub temperature: f32,
}

/// One entry of the chat history as sent to the model
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct WireMessage {
    pub role: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<WireToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
}

impl WireMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
            tool_calls: None,
            tool_name: None,
        }
    }
}

/// A tool call as Ollama encodes it
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct WireToolCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub function: WireFunctionCall,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct WireFunctionCall {
    pub name: String,
    #[serde(default)]
    pub arguments: serde_json::Value,
}

/// Catalog entry, always of type `function`
#[derive(Debug, Serialize, Clone)]
pub struct WireTool {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: WireFunction,
}

#[derive(Debug, Serialize, Clone)]
pub struct WireFunction {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// Only the reply message is read; timing fields are ignored
#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    pub message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub tool_calls: Vec<WireToolCall>,
}
