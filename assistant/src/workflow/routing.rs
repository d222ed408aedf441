//! Routing policy
//!
//! Pure decisions over the message log: given the node that just ran (or the
//! interrupt being resumed), pick the next node or finish the run.

use crate::actions::ActionExtractor;
use crate::messages::{is_control_text, Message, SystemSignal};

use super::error::WorkflowError;
use super::Node;

/// Outcome of a routing decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Next(Node),
    Terminal,
}

/// Conditional edges of the workflow graph
pub struct RoutingPolicy {
    /// Tool whose result ends the turn without another model call
    execute_tool: String,
    extractor: ActionExtractor,
}

impl RoutingPolicy {
    pub fn new(execute_tool: impl Into<String>) -> Self {
        Self {
            execute_tool: execute_tool.into(),
            extractor: ActionExtractor::new(),
        }
    }

    /// Edge out of a node that has just run
    pub fn route(&self, node: Node, messages: &[Message]) -> Route {
        match node {
            Node::Agent => self.after_agent(messages),
            Node::ToolDispatch => self.after_tool_dispatch(messages),
            // Stays suspended; resumes go through `after_approval`
            Node::HumanApproval => Route::Next(Node::HumanApproval),
        }
    }

    /// After the model replied.
    ///
    /// Tool requests go to dispatch. A reply that directly follows a
    /// successful execute-action result is the turn's summary. A reply
    /// proposing an action waits for approval; anything else ends the turn.
    pub fn after_agent(&self, messages: &[Message]) -> Route {
        let Some(Message::Agent(reply)) = messages.last() else {
            // Agent failure or step limit signal
            return Route::Terminal;
        };

        if !reply.tool_requests.is_empty() {
            return Route::Next(Node::ToolDispatch);
        }

        if messages.len() > 1 {
            if let Message::ToolResult(result) = &messages[messages.len() - 2] {
                if result.tool_name == self.execute_tool && !result.is_error {
                    return Route::Terminal;
                }
            }
        }

        if self.extractor.has_action(&reply.text) {
            Route::Next(Node::HumanApproval)
        } else {
            Route::Terminal
        }
    }

    /// After tool results were appended.
    ///
    /// A successful execute-action result ends the turn immediately. A failed
    /// one goes back to the model like any other tool result.
    pub fn after_tool_dispatch(&self, messages: &[Message]) -> Route {
        match messages.last() {
            Some(Message::ToolResult(result))
                if result.tool_name == self.execute_tool && !result.is_error =>
            {
                Route::Terminal
            }
            _ => Route::Next(Node::Agent),
        }
    }

    /// On resume from the approval interrupt with `message`
    pub fn after_approval(&self, message: &Message) -> Result<Route, WorkflowError> {
        match message {
            Message::User(user) if is_control_text(&user.text) => Ok(Route::Terminal),
            Message::User(_) => Ok(Route::Next(Node::Agent)),
            Message::System(SystemSignal::ActionCompleted) => Ok(Route::Terminal),
            Message::System(_) | Message::Agent(_) | Message::ToolResult(_) => {
                Err(WorkflowError::InvalidResume(format!(
                    "resume message must be a user message, got {}",
                    message.kind()
                )))
            }
        }
    }
}
