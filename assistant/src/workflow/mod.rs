//! Conversation workflow engine
//!
//! A fixed graph of three nodes driven as an explicit state machine:
//!
//! ```text
//! START -> Agent -+-> ToolDispatch -+-> Agent
//!                 |                 +-> Terminal   (execute-action result)
//!                 +-> HumanApproval  (interrupt, resumed by a later call)
//!                 +-> Terminal
//! HumanApproval --resume--> Agent | Terminal
//! ```
//!
//! State lives in a [`CheckpointStore`](crate::checkpoint::CheckpointStore);
//! transitions come from [`routing`]; [`WorkflowEngine`] runs the loop.

pub mod engine;
pub mod error;
pub mod locks;
pub mod routing;

pub use engine::{EngineConfig, RunOutcome, TurnStatus, WorkflowEngine};
pub use error::WorkflowError;
pub use locks::{BusyPolicy, ThreadLease, ThreadLocks};
pub use routing::{Route, RoutingPolicy};

use serde::{Deserialize, Serialize};

/// A node in the workflow graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Node {
    /// Model invocation
    Agent,
    /// Execution of the tool requests in the latest agent message
    ToolDispatch,
    /// Interrupt point: waits for a human decision
    HumanApproval,
}

impl Node {
    /// Nodes the engine suspends in front of instead of executing
    pub fn is_interrupt(self) -> bool {
        matches!(self, Node::HumanApproval)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Node::Agent => "agent",
            Node::ToolDispatch => "tool_dispatch",
            Node::HumanApproval => "human_approval",
        }
    }
}

impl std::fmt::Display for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Node {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "agent" => Ok(Node::Agent),
            "tool_dispatch" => Ok(Node::ToolDispatch),
            "human_approval" => Ok(Node::HumanApproval),
            other => Err(format!("Unknown workflow node: {}", other)),
        }
    }
}
