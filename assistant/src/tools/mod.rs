//! Tool registry and dispatch
//!
//! Tools are the agent's only way to touch the outside world. The registry is
//! built once at startup and shared read-only across all threads.
//!
//! Dispatch never fails: an unknown tool, bad arguments, a tool error or a
//! timeout all come back as a [`ToolResult`] flagged `is_error`, so the model
//! can react to the failure instead of the run aborting.

mod query;
mod skill;

pub use query::{ExecuteQueryTool, QueryError, QueryRunner, QueryTable, EXECUTE_QUERY_TOOL};
pub use skill::{LoadSkillTool, LOAD_SKILL_TOOL};

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

use crate::messages::{ToolRequest, ToolResult};

/// Default per-call timeout
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(60);

/// A capability the model can invoke
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name the model uses to request this tool
    fn name(&self) -> &str;

    /// One-line description shown to the model
    fn description(&self) -> &str;

    /// JSON schema of the arguments object
    fn parameters(&self) -> serde_json::Value;

    /// Run the tool and return its text output
    async fn call(&self, arguments: serde_json::Value) -> Result<String>;
}

/// Tool description handed to the model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// Fixed set of tools, looked up by name
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
    timeout: Duration,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_TOOL_TIMEOUT)
    }
}

impl ToolRegistry {
    pub fn new(timeout: Duration) -> Self {
        Self {
            tools: BTreeMap::new(),
            timeout,
        }
    }

    /// Add a tool, replacing any tool with the same name
    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.register(tool);
        self
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), tool).is_some() {
            tracing::warn!("Tool {} registered twice, keeping the latest", name);
        }
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    /// Tool catalog for the model, in name order
    pub fn catalog(&self) -> Vec<ToolSpec> {
        self.tools
            .values()
            .map(|tool| ToolSpec {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                parameters: tool.parameters(),
            })
            .collect()
    }

    /// Run one tool request and wrap the outcome as a message payload
    pub async fn dispatch(&self, request: &ToolRequest) -> ToolResult {
        let Some(tool) = self.tools.get(&request.name) else {
            tracing::warn!("Model requested unknown tool: {}", request.name);
            return error_result(
                request,
                format!(
                    "Unknown tool: {}. Available tools: {}",
                    request.name,
                    self.names().join(", ")
                ),
            );
        };

        tracing::info!("Executing tool: {} with args: {}", request.name, request.arguments);

        match tokio::time::timeout(self.timeout, tool.call(request.arguments.clone())).await {
            Ok(Ok(content)) => {
                tracing::debug!(
                    "Tool {} returned: {}...",
                    request.name,
                    content.chars().take(100).collect::<String>()
                );
                ToolResult {
                    request_id: request.id.clone(),
                    tool_name: request.name.clone(),
                    content,
                    is_error: false,
                }
            }
            Ok(Err(e)) => {
                tracing::warn!("Tool {} failed: {:#}", request.name, e);
                error_result(request, format!("Error calling tool {}: {:#}", request.name, e))
            }
            Err(_) => {
                tracing::warn!("Tool {} timed out after {:?}", request.name, self.timeout);
                error_result(
                    request,
                    format!(
                        "Tool {} timed out after {}s",
                        request.name,
                        self.timeout.as_secs()
                    ),
                )
            }
        }
    }
}

fn error_result(request: &ToolRequest, content: String) -> ToolResult {
    ToolResult {
        request_id: request.id.clone(),
        tool_name: request.name.clone(),
        content,
        is_error: true,
    }
}

/// Turn a schemars schema into the plain JSON object the model expects.
///
/// Drops `$schema`, `title` and `additionalProperties`, which confuse some
/// local models.
pub fn clean_schema(schema: &serde_json::Value) -> serde_json::Value {
    match schema {
        serde_json::Value::Object(obj) => {
            let mut cleaned = serde_json::Map::new();
            for (key, value) in obj {
                if key == "$schema" || key == "title" || key == "additionalProperties" {
                    continue;
                }
                cleaned.insert(key.clone(), clean_schema(value));
            }
            serde_json::Value::Object(cleaned)
        }
        serde_json::Value::Array(arr) => {
            serde_json::Value::Array(arr.iter().map(clean_schema).collect())
        }
        other => other.clone(),
    }
}
