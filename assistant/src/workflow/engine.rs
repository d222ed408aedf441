//! Workflow engine
//!
//! Drives one run of the graph for one thread: load the checkpoint, apply the
//! input, execute nodes until the run reaches the approval interrupt or a
//! terminal route, then commit everything the run appended in one step.
//!
//! A run never writes partial state. If a node fails with an infrastructure
//! error, or the future is dropped, the thread stays at its last commit.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::checkpoint::{Checkpoint, CheckpointStore};
use crate::llm::ChatModel;
use crate::messages::{reported_answer, Message, SystemSignal};
use crate::tools::{ToolRegistry, ToolSpec, EXECUTE_QUERY_TOOL};

use super::error::WorkflowError;
use super::locks::{BusyPolicy, ThreadLease, ThreadLocks};
use super::routing::{Route, RoutingPolicy};
use super::Node;

/// Default limit on model calls per run
pub const DEFAULT_MAX_AGENT_STEPS: usize = 10;

/// Default timeout for one model call
pub const DEFAULT_MODEL_TIMEOUT: Duration = Duration::from_secs(120);

/// Engine settings
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub system_prompt: String,
    /// Tool whose result ends a turn without another model call
    pub execute_tool: String,
    pub max_agent_steps: usize,
    pub model_timeout: Duration,
    pub busy_policy: BusyPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            system_prompt: String::new(),
            execute_tool: EXECUTE_QUERY_TOOL.to_string(),
            max_agent_steps: DEFAULT_MAX_AGENT_STEPS,
            model_timeout: DEFAULT_MODEL_TIMEOUT,
            busy_policy: BusyPolicy::default(),
        }
    }
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnStatus {
    Done,
    ApprovalRequired,
}

/// Result of one run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunOutcome {
    pub thread_id: String,
    pub status: TurnStatus,
    pub answer: String,
    /// Messages this run appended to the log
    pub appended: usize,
}

/// Working copy of a thread during one run
struct RunState {
    log: Vec<Message>,
    committed: usize,
}

impl RunState {
    fn from_checkpoint(checkpoint: Checkpoint) -> Self {
        let committed = checkpoint.messages.len();
        Self {
            log: checkpoint.messages,
            committed,
        }
    }

    fn appended(&self) -> &[Message] {
        &self.log[self.committed..]
    }
}

/// Runs the agent / tool dispatch / approval graph over checkpointed threads
pub struct WorkflowEngine {
    store: Arc<dyn CheckpointStore>,
    model: Arc<dyn ChatModel>,
    tools: Arc<ToolRegistry>,
    catalog: Vec<ToolSpec>,
    routing: RoutingPolicy,
    locks: ThreadLocks,
    config: EngineConfig,
}

impl WorkflowEngine {
    pub fn new(
        store: Arc<dyn CheckpointStore>,
        model: Arc<dyn ChatModel>,
        tools: Arc<ToolRegistry>,
        config: EngineConfig,
    ) -> Self {
        let catalog = tools.catalog();
        let routing = RoutingPolicy::new(config.execute_tool.clone());
        let locks = ThreadLocks::new(config.busy_policy);

        Self {
            store,
            model,
            tools,
            catalog,
            routing,
            locks,
            config,
        }
    }

    pub fn store(&self) -> &Arc<dyn CheckpointStore> {
        &self.store
    }

    /// Last committed state of a thread
    pub async fn checkpoint(&self, thread_id: &str) -> Result<Checkpoint, WorkflowError> {
        Ok(self.store.load(thread_id).await?)
    }

    /// Take exclusive hold of a thread for a sequence of operations
    pub async fn lease(&self, thread_id: &str) -> Result<ThreadLease, WorkflowError> {
        self.locks.acquire(thread_id).await
    }

    /// Start a turn with new user text
    pub async fn start(&self, thread_id: &str, text: &str) -> Result<RunOutcome, WorkflowError> {
        self.run(thread_id, Some(Message::user(text))).await
    }

    /// Resume a thread suspended at the approval interrupt
    pub async fn resume(&self, thread_id: &str, message: Message) -> Result<RunOutcome, WorkflowError> {
        self.run(thread_id, Some(message)).await
    }

    /// Run `thread_id` with an optional input message
    pub async fn run(
        &self,
        thread_id: &str,
        input: Option<Message>,
    ) -> Result<RunOutcome, WorkflowError> {
        let lease = self.lease(thread_id).await?;
        self.run_leased(&lease, input).await
    }

    /// Run the leased thread; the caller keeps the lease afterwards
    pub async fn run_leased(
        &self,
        lease: &ThreadLease,
        input: Option<Message>,
    ) -> Result<RunOutcome, WorkflowError> {
        let thread_id = lease.thread_id();
        let checkpoint = self.store.load(thread_id).await?;
        let pending = checkpoint.pending;
        let mut state = RunState::from_checkpoint(checkpoint);

        let start = match (pending, input) {
            (None, None) => {
                return Err(WorkflowError::InvalidResume(format!(
                    "thread {} is not suspended and no input was given",
                    thread_id
                )));
            }
            (None, Some(message)) => {
                let Message::User(_) = &message else {
                    return Err(WorkflowError::InvalidResume(format!(
                        "a turn must start with a user message, got {}",
                        message.kind()
                    )));
                };
                if message.is_control() {
                    return Err(WorkflowError::InvalidResume(format!(
                        "thread {} is not waiting for approval",
                        thread_id
                    )));
                }
                state.log.push(message);
                Node::Agent
            }
            (Some(Node::HumanApproval), None) => {
                return Err(WorkflowError::InvalidResume(format!(
                    "thread {} is waiting for approval; resume needs a message",
                    thread_id
                )));
            }
            (Some(Node::HumanApproval), Some(message)) => {
                let route = self.routing.after_approval(&message)?;
                state.log.push(message);
                match route {
                    Route::Terminal => {
                        tracing::info!(thread_id, "Turn closed after out-of-band execution");
                        self.store
                            .append_and_clear_pending(thread_id, state.appended())
                            .await?;
                        return Ok(self.outcome(thread_id, &state, None));
                    }
                    Route::Next(node) => node,
                }
            }
            (Some(node), _) => {
                return Err(WorkflowError::InvalidResume(format!(
                    "thread {} is suspended at {}, which is not an interrupt",
                    thread_id, node
                )));
            }
        };

        self.drive(thread_id, state, start).await
    }

    async fn drive(
        &self,
        thread_id: &str,
        mut state: RunState,
        start: Node,
    ) -> Result<RunOutcome, WorkflowError> {
        let mut node = start;
        let mut agent_steps = 0;

        loop {
            match node {
                Node::HumanApproval => {
                    tracing::info!(thread_id, "Suspending for human approval");
                    self.store
                        .commit(thread_id, state.appended(), Some(Node::HumanApproval))
                        .await?;
                    return Ok(self.outcome(thread_id, &state, Some(Node::HumanApproval)));
                }
                Node::Agent => {
                    agent_steps += 1;
                    let reply = if agent_steps > self.config.max_agent_steps {
                        tracing::warn!(
                            thread_id,
                            "Agent reached max steps ({}), stopping",
                            self.config.max_agent_steps
                        );
                        Message::System(SystemSignal::StepLimitReached {
                            limit: self.config.max_agent_steps,
                        })
                    } else {
                        tracing::debug!(thread_id, "Agent step {}", agent_steps);
                        self.call_model(thread_id, &state.log).await
                    };
                    state.log.push(reply);
                }
                Node::ToolDispatch => {
                    let requests = match state.log.last() {
                        Some(Message::Agent(reply)) => reply.tool_requests.clone(),
                        _ => Vec::new(),
                    };
                    for request in &requests {
                        let result = self.tools.dispatch(request).await;
                        if result.is_error {
                            tracing::warn!(thread_id, "Tool {} failed: {}", result.tool_name, result.content);
                        }
                        state.log.push(Message::ToolResult(result));
                    }
                }
            }

            let route = self.routing.route(node, &state.log);
            tracing::info!(thread_id, from = %node, ?route, "Routing");

            match route {
                Route::Next(next) => node = next,
                Route::Terminal => {
                    self.store.commit(thread_id, state.appended(), None).await?;
                    return Ok(self.outcome(thread_id, &state, None));
                }
            }
        }
    }

    /// Agent node: model failures become a signal message, not an error
    async fn call_model(&self, thread_id: &str, log: &[Message]) -> Message {
        let started = Instant::now();
        let call = self
            .model
            .complete(&self.config.system_prompt, log, &self.catalog);

        match tokio::time::timeout(self.config.model_timeout, call).await {
            Ok(Ok(reply)) => {
                tracing::info!(
                    thread_id,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    tool_requests = reply.tool_requests.len(),
                    "Agent replied"
                );
                reply.into_message()
            }
            Ok(Err(e)) => {
                tracing::warn!(thread_id, "Model call failed: {:#}", e);
                Message::System(SystemSignal::AgentFailure {
                    error: format!("{:#}", e),
                })
            }
            Err(_) => {
                tracing::warn!(thread_id, "Model call timed out");
                Message::System(SystemSignal::AgentFailure {
                    error: format!(
                        "model call timed out after {}s",
                        self.config.model_timeout.as_secs()
                    ),
                })
            }
        }
    }

    fn outcome(&self, thread_id: &str, state: &RunState, pending: Option<Node>) -> RunOutcome {
        let status = if pending.is_some() {
            TurnStatus::ApprovalRequired
        } else {
            TurnStatus::Done
        };

        tracing::info!(
            thread_id,
            status = ?status,
            appended = state.appended().len(),
            "Run committed"
        );

        RunOutcome {
            thread_id: thread_id.to_string(),
            status,
            answer: reported_answer(&state.log),
            appended: state.appended().len(),
        }
    }
}
