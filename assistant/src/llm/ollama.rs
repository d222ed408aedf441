//! Ollama chat model over direct HTTP
//!
//! Talks to `/api/chat` with native tool calling instead of going through a
//! client library, so tool call ids and arguments come back untouched.

use std::time::Instant;

use anyhow::{Context, Result};
use async_trait::async_trait;

use super::types::{
    ChatRequest, ChatResponse, SamplingOptions, WireFunction, WireFunctionCall, WireMessage,
    WireTool, WireToolCall,
};
use super::{ChatModel, ModelReply};
use crate::messages::{Message, ToolRequest};
use crate::tools::ToolSpec;

/// Ollama client for the workflow's Agent node
pub struct OllamaChatModel {
    base_url: String,
    http_client: reqwest::Client,
    model: String,
}

impl OllamaChatModel {
    /// Create a client for `url` (scheme, host and port are kept)
    pub fn new(url: &str, model: &str) -> Result<Self> {
        let parsed = url::Url::parse(url).with_context(|| format!("Invalid Ollama URL: {}", url))?;

        let host = parsed.host_str().unwrap_or("localhost");
        let port = parsed.port().unwrap_or(11434);
        let base_url = format!("{}://{}:{}", parsed.scheme(), host, port);

        Ok(Self {
            base_url,
            http_client: reqwest::Client::new(),
            model: model.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// Convert the thread log into Ollama messages
pub(crate) fn to_wire_messages(system_prompt: &str, history: &[Message]) -> Vec<WireMessage> {
    let mut messages = Vec::with_capacity(history.len() + 1);
    if !system_prompt.is_empty() {
        messages.push(WireMessage::new("system", system_prompt));
    }

    for message in history {
        match message {
            Message::User(user) => messages.push(WireMessage::new("user", user.text.clone())),
            Message::Agent(agent) => {
                let tool_calls = (!agent.tool_requests.is_empty()).then(|| {
                    agent
                        .tool_requests
                        .iter()
                        .map(|req| WireToolCall {
                            id: Some(req.id.clone()),
                            function: WireFunctionCall {
                                name: req.name.clone(),
                                arguments: req.arguments.clone(),
                            },
                        })
                        .collect()
                });
                messages.push(WireMessage {
                    tool_calls,
                    ..WireMessage::new("assistant", agent.text.clone())
                });
            }
            Message::ToolResult(result) => messages.push(WireMessage {
                tool_name: Some(result.tool_name.clone()),
                ..WireMessage::new("tool", result.content.clone())
            }),
            // Engine bookkeeping, not part of the conversation
            Message::System(_) => {}
        }
    }

    messages
}

/// Convert the tool catalog into Ollama's function format
pub(crate) fn to_wire_tools(tools: &[ToolSpec]) -> Vec<WireTool> {
    tools
        .iter()
        .map(|spec| WireTool {
            tool_type: "function".to_string(),
            function: WireFunction {
                name: spec.name.clone(),
                description: spec.description.clone(),
                parameters: spec.parameters.clone(),
            },
        })
        .collect()
}

fn to_tool_requests(calls: Vec<WireToolCall>) -> Vec<ToolRequest> {
    calls
        .into_iter()
        .map(|call| ToolRequest {
            id: call
                .id
                .unwrap_or_else(|| format!("call_{}", uuid::Uuid::new_v4().simple())),
            name: call.function.name,
            arguments: call.function.arguments,
        })
        .collect()
}

#[async_trait]
impl ChatModel for OllamaChatModel {
    async fn complete(
        &self,
        system_prompt: &str,
        history: &[Message],
        tools: &[ToolSpec],
    ) -> Result<ModelReply> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: to_wire_messages(system_prompt, history),
            tools: to_wire_tools(tools),
            stream: false,
            options: SamplingOptions { temperature: 0.0 },
        };

        tracing::info!(
            model = %self.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "Sending Ollama chat request"
        );

        let url = format!("{}/api/chat", self.base_url);
        let started = Instant::now();
        let response = self
            .http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .context("Failed to send HTTP request to Ollama")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Ollama API error {}: {}", status, body);
        }

        let raw_body = response.text().await.context("Failed to get response text")?;
        let body: ChatResponse =
            serde_json::from_str(&raw_body).context("Failed to parse Ollama response")?;

        tracing::info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            content_len = body.message.content.len(),
            tool_calls = body.message.tool_calls.len(),
            "Ollama response received"
        );

        Ok(ModelReply {
            text: body.message.content,
            tool_requests: to_tool_requests(body.message.tool_calls),
        })
    }

    fn model(&self) -> &str {
        &self.model
    }
}
