//! REST API handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use super::state::AppState;
use crate::checkpoint::ThreadSummary;
use crate::messages::Message;
use crate::orchestrator::{Decision, TurnRequest, TurnResponse};
use crate::workflow::{Node, WorkflowError};

pub type ApiError = (StatusCode, Json<ErrorResponse>);

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    fn new(msg: impl Into<String>) -> Self {
        Self { error: msg.into() }
    }
}

/// Map a workflow error onto an HTTP status
fn workflow_error(e: WorkflowError) -> ApiError {
    let status = match &e {
        WorkflowError::InvalidResume(_) => StatusCode::BAD_REQUEST,
        WorkflowError::ThreadBusy(_) => StatusCode::CONFLICT,
        WorkflowError::Persistence(_) => {
            tracing::error!("Persistence failure: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    let message = match e {
        WorkflowError::InvalidResume(detail) => detail,
        other => other.to_string(),
    };

    (status, Json(ErrorResponse::new(message)))
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub llm_url: String,
    pub model: String,
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        llm_url: state.llm_url.clone(),
        model: state.model.clone(),
    })
}

/// Send a user turn
pub async fn chat(
    State(state): State<AppState>,
    Json(req): Json<TurnRequest>,
) -> Result<Json<TurnResponse>, ApiError> {
    state
        .orchestrator
        .start_or_continue(req)
        .await
        .map(Json)
        .map_err(workflow_error)
}

/// Approval request
#[derive(Debug, Deserialize)]
pub struct ApprovalRequest {
    pub thread_id: String,
    pub decision: Decision,
    pub feedback: Option<String>,
}

/// Approve or reject a pending query
pub async fn approval(
    State(state): State<AppState>,
    Json(req): Json<ApprovalRequest>,
) -> Result<Json<TurnResponse>, ApiError> {
    state
        .orchestrator
        .resolve_approval(&req.thread_id, req.decision, req.feedback.as_deref())
        .await
        .map(Json)
        .map_err(workflow_error)
}

/// List threads response
#[derive(Debug, Serialize)]
pub struct ThreadsListResponse {
    pub threads: Vec<ThreadSummary>,
    pub total: usize,
}

/// List all threads
pub async fn list_threads(
    State(state): State<AppState>,
) -> Result<Json<ThreadsListResponse>, ApiError> {
    let threads = state.orchestrator.threads().await.map_err(workflow_error)?;
    let total = threads.len();
    Ok(Json(ThreadsListResponse { threads, total }))
}

/// Thread with messages response
#[derive(Debug, Serialize)]
pub struct ThreadResponse {
    pub thread_id: String,
    pub pending: Option<Node>,
    pub messages: Vec<Message>,
}

/// Get a thread's log and pending marker
pub async fn get_thread(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ThreadResponse>, ApiError> {
    let checkpoint = state
        .orchestrator
        .engine()
        .checkpoint(&id)
        .await
        .map_err(workflow_error)?;

    if checkpoint.messages.is_empty() {
        return Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new(format!("Thread not found: {}", id))),
        ));
    }

    Ok(Json(ThreadResponse {
        thread_id: checkpoint.thread_id,
        pending: checkpoint.pending,
        messages: checkpoint.messages,
    }))
}
