//! Turn orchestrator
//!
//! The surface the CLI and HTTP layers talk to. It maps a user turn or an
//! approval decision onto engine runs, and owns the out-of-band execution of
//! an approved query: the query runs outside the workflow, and only the
//! control message closing the turn goes into the log.
//!
//! Every operation holds the thread's lease from the first read to the last
//! commit, so an approved query runs at most once even when two decisions
//! for the same thread race.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::actions::ActionExtractor;
use crate::checkpoint::ThreadSummary;
use crate::messages::{Message, EXECUTION_COMPLETED};
use crate::tools::{QueryRunner, QueryTable};
use crate::workflow::{RunOutcome, ThreadLease, TurnStatus, WorkflowEngine, WorkflowError};

/// Text used when a rejection carries no feedback
pub const DEFAULT_REJECTION: &str = "Rejected.";

/// A user turn
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TurnRequest {
    /// Existing thread, or `None` to start a new one
    #[serde(default)]
    pub thread_id: Option<String>,
    #[serde(alias = "message")]
    pub text: String,
    /// Run a proposed query immediately instead of waiting for approval
    #[serde(default)]
    pub auto_execute: bool,
}

impl TurnRequest {
    pub fn new(thread_id: Option<String>, text: impl Into<String>) -> Self {
        Self {
            thread_id,
            text: text.into(),
            auto_execute: false,
        }
    }
}

/// Human decision on a proposed query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Approve,
    Reject,
}

/// Result of a turn or an approval decision
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnResponse {
    pub thread_id: String,
    pub status: TurnStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<QueryTable>,
}

impl From<RunOutcome> for TurnResponse {
    fn from(outcome: RunOutcome) -> Self {
        Self {
            thread_id: outcome.thread_id,
            status: outcome.status,
            message: outcome.answer,
            query: None,
            table: None,
        }
    }
}

/// Facade over the workflow engine and the query runner
pub struct TurnOrchestrator {
    engine: Arc<WorkflowEngine>,
    runner: Arc<QueryRunner>,
    extractor: ActionExtractor,
}

impl TurnOrchestrator {
    pub fn new(engine: Arc<WorkflowEngine>, runner: Arc<QueryRunner>) -> Self {
        Self {
            engine,
            runner,
            extractor: ActionExtractor::new(),
        }
    }

    pub fn engine(&self) -> &Arc<WorkflowEngine> {
        &self.engine
    }

    /// Start a new turn, or continue the thread named in the request.
    ///
    /// Text sent to a thread that is waiting for approval counts as
    /// rejection feedback for the pending proposal.
    pub async fn start_or_continue(&self, request: TurnRequest) -> Result<TurnResponse, WorkflowError> {
        let thread_id = request
            .thread_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        tracing::info!(
            thread_id = %thread_id,
            auto_execute = request.auto_execute,
            "Received turn: {}",
            request.text
        );

        let lease = self.engine.lease(&thread_id).await?;
        let checkpoint = self.engine.checkpoint(&thread_id).await?;

        let input = if checkpoint.is_waiting_for_approval() {
            tracing::info!(thread_id = %thread_id, "Thread awaiting approval, treating turn as rejection");
            Message::user(rejection_text(Some(&request.text)))
        } else {
            Message::user(request.text)
        };

        let outcome = self.engine.run_leased(&lease, Some(input)).await?;

        if request.auto_execute && outcome.status == TurnStatus::ApprovalRequired {
            tracing::info!(thread_id = %thread_id, "Auto-executing proposed query");
            return self
                .execute_proposal(&lease, &outcome.answer, "Auto Execution Result")
                .await;
        }

        Ok(outcome.into())
    }

    /// Apply a human decision to a thread waiting for approval
    pub async fn resolve_approval(
        &self,
        thread_id: &str,
        decision: Decision,
        feedback: Option<&str>,
    ) -> Result<TurnResponse, WorkflowError> {
        tracing::info!(thread_id, ?decision, "Received approval decision");

        let lease = self.engine.lease(thread_id).await?;
        let checkpoint = self.engine.checkpoint(thread_id).await?;

        if !checkpoint.is_waiting_for_approval() {
            return Err(WorkflowError::InvalidResume(
                "Conversation is not waiting for approval.".to_string(),
            ));
        }

        match decision {
            Decision::Approve => {
                let Some(Message::Agent(proposal)) = checkpoint.messages.last() else {
                    return Err(WorkflowError::InvalidResume(format!(
                        "thread {} has no pending proposal",
                        thread_id
                    )));
                };
                self.execute_proposal(&lease, &proposal.text, "Execution Result")
                    .await
            }
            Decision::Reject => {
                let outcome = self
                    .engine
                    .run_leased(&lease, Some(Message::user(rejection_text(feedback))))
                    .await?;
                Ok(outcome.into())
            }
        }
    }

    /// The query a waiting thread proposes, if any
    pub async fn pending_query(&self, thread_id: &str) -> Result<Option<String>, WorkflowError> {
        let checkpoint = self.engine.checkpoint(thread_id).await?;
        if !checkpoint.is_waiting_for_approval() {
            return Ok(None);
        }
        Ok(match checkpoint.messages.last() {
            Some(Message::Agent(proposal)) => self.extractor.extract(&proposal.text),
            _ => None,
        })
    }

    /// Full message log of a thread
    pub async fn history(&self, thread_id: &str) -> Result<Vec<Message>, WorkflowError> {
        Ok(self.engine.checkpoint(thread_id).await?.messages)
    }

    pub async fn threads(&self) -> Result<Vec<ThreadSummary>, WorkflowError> {
        Ok(self.engine.store().list_threads().await?)
    }

    /// Run the proposed query outside the workflow, then close the turn.
    ///
    /// A failed query leaves the thread waiting so the human can retry or
    /// reject with feedback.
    async fn execute_proposal(
        &self,
        lease: &ThreadLease,
        proposal: &str,
        heading: &str,
    ) -> Result<TurnResponse, WorkflowError> {
        let thread_id = lease.thread_id().to_string();
        let Some(query) = self.extractor.extract(proposal) else {
            return Err(WorkflowError::InvalidResume(format!(
                "thread {} has no proposed query",
                thread_id
            )));
        };
        tracing::info!(thread_id = %thread_id, "Executing approved query: {}", query);

        let table = match self.runner.run(&query).await {
            Ok(table) => table,
            Err(e) => {
                tracing::warn!(thread_id = %thread_id, "Query execution failed: {}", e);
                return Ok(TurnResponse {
                    thread_id,
                    status: TurnStatus::ApprovalRequired,
                    message: format!("Error executing query: {}", e),
                    query: Some(query),
                    table: None,
                });
            }
        };

        tracing::info!(thread_id = %thread_id, rows = table.row_count(), "Query executed");

        let outcome = self
            .engine
            .run_leased(lease, Some(Message::user(EXECUTION_COMPLETED)))
            .await?;

        let rendered = if table.is_empty() {
            "No results found.".to_string()
        } else {
            table.to_markdown(None)
        };

        Ok(TurnResponse {
            thread_id,
            status: outcome.status,
            message: format!("**{}**:\n\n{}", heading, rendered),
            query: Some(query),
            table: Some(table),
        })
    }
}

/// Resume text for a rejected proposal
pub fn rejection_text(feedback: Option<&str>) -> String {
    let feedback = feedback
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .unwrap_or(DEFAULT_REJECTION);
    format!("Rejected. Feedback: {}", feedback)
}
