//! Approve, reject and auto-execute through the turn orchestrator

use sql_assistant::llm::ModelReply;
use sql_assistant::messages::{Message, EXECUTION_COMPLETED};
use sql_assistant::orchestrator::{Decision, TurnRequest};
use sql_assistant::workflow::{TurnStatus, WorkflowError};

use crate::support::{proposal, Harness, ScriptedModel};

fn turn(thread_id: &str, text: &str) -> TurnRequest {
    TurnRequest::new(Some(thread_id.to_string()), text)
}

#[tokio::test]
async fn test_show_orders_then_approve() {
    let model = ScriptedModel::new(vec![proposal("SELECT * FROM orders LIMIT 3")]);
    let h = Harness::new(model.clone());

    let response = h
        .orchestrator
        .start_or_continue(turn("T1", "show 3 orders"))
        .await
        .unwrap();
    assert_eq!(response.thread_id, "T1");
    assert_eq!(response.status, TurnStatus::ApprovalRequired);
    assert_eq!(
        h.orchestrator.pending_query("T1").await.unwrap().as_deref(),
        Some("SELECT * FROM orders LIMIT 3")
    );

    let proposal_message = h.log("T1").await[1].clone();

    let response = h
        .orchestrator
        .resolve_approval("T1", Decision::Approve, None)
        .await
        .unwrap();
    assert_eq!(response.status, TurnStatus::Done);
    assert!(response.message.starts_with("**Execution Result**:\n\n| order_id |"));
    assert_eq!(response.query.as_deref(), Some("SELECT * FROM orders LIMIT 3"));
    assert_eq!(response.table.as_ref().map(|t| t.row_count()), Some(3));
    assert_eq!(model.calls(), 1);

    // Only the control message was added; the proposal is untouched
    let log = h.log("T1").await;
    assert_eq!(log.len(), 3);
    assert_eq!(log[1], proposal_message);
    assert_eq!(log[2], Message::user(EXECUTION_COMPLETED));
    assert!(!h.store.load("T1").await.unwrap().is_waiting_for_approval());
}

#[tokio::test]
async fn test_reject_with_feedback_reproposes() {
    let model = ScriptedModel::new(vec![
        proposal("SELECT * FROM orders LIMIT 3"),
        proposal("SELECT * FROM orders WHERE order_date >= date('now', '-7 days') LIMIT 3"),
    ]);
    let h = Harness::new(model.clone());

    h.orchestrator
        .start_or_continue(turn("T1", "show 3 orders"))
        .await
        .unwrap();
    let response = h
        .orchestrator
        .resolve_approval("T1", Decision::Reject, Some("use last 7 days"))
        .await
        .unwrap();

    assert_eq!(response.status, TurnStatus::ApprovalRequired);
    assert!(response.message.contains("-7 days"));

    let log = h.log("T1").await;
    assert_eq!(log[2], Message::user("Rejected. Feedback: use last 7 days"));
    assert_eq!(model.calls(), 2);
}

#[tokio::test]
async fn test_reject_without_feedback_uses_default() {
    let model = ScriptedModel::new(vec![
        proposal("SELECT * FROM orders"),
        ModelReply::from_text("Understood, no query then."),
    ]);
    let h = Harness::new(model);

    h.orchestrator
        .start_or_continue(turn("T1", "all orders"))
        .await
        .unwrap();
    let response = h
        .orchestrator
        .resolve_approval("T1", Decision::Reject, None)
        .await
        .unwrap();

    assert_eq!(response.status, TurnStatus::Done);
    assert_eq!(h.log("T1").await[2], Message::user("Rejected. Feedback: Rejected."));
}

#[tokio::test]
async fn test_message_while_pending_counts_as_rejection() {
    let model = ScriptedModel::new(vec![
        proposal("SELECT * FROM orders LIMIT 3"),
        proposal("SELECT order_id, total_amount FROM orders LIMIT 3"),
    ]);
    let h = Harness::new(model);

    h.orchestrator
        .start_or_continue(turn("T1", "show 3 orders"))
        .await
        .unwrap();
    h.orchestrator
        .start_or_continue(turn("T1", "only id and total"))
        .await
        .unwrap();

    let log = h.log("T1").await;
    assert_eq!(log[2], Message::user("Rejected. Feedback: only id and total"));
}

#[tokio::test]
async fn test_approve_when_not_waiting_is_invalid() {
    let model = ScriptedModel::new(vec![ModelReply::from_text("Hi there!")]);
    let h = Harness::new(model);

    let err = h
        .orchestrator
        .resolve_approval("T1", Decision::Approve, None)
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::InvalidResume(ref m) if m == "Conversation is not waiting for approval."));

    h.orchestrator
        .start_or_continue(turn("T1", "hello"))
        .await
        .unwrap();
    let err = h
        .orchestrator
        .resolve_approval("T1", Decision::Reject, Some("nothing to reject"))
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::InvalidResume(_)));
}

#[tokio::test]
async fn test_failed_execution_keeps_thread_waiting() {
    let model = ScriptedModel::new(vec![
        proposal("SELECT * FROM shipments"),
        proposal("SELECT * FROM orders LIMIT 1"),
    ]);
    let h = Harness::new(model);

    h.orchestrator
        .start_or_continue(turn("T1", "show shipments"))
        .await
        .unwrap();
    let before = h.log("T1").await;

    let response = h
        .orchestrator
        .resolve_approval("T1", Decision::Approve, None)
        .await
        .unwrap();
    assert_eq!(response.status, TurnStatus::ApprovalRequired);
    assert!(response.message.starts_with("Error executing query: no such table"));
    assert!(response.table.is_none());
    assert_eq!(h.log("T1").await, before);
    assert!(h.store.load("T1").await.unwrap().is_waiting_for_approval());

    // The human can still steer the agent
    let response = h
        .orchestrator
        .resolve_approval("T1", Decision::Reject, Some("there is no shipments table"))
        .await
        .unwrap();
    assert_eq!(response.status, TurnStatus::ApprovalRequired);
}

#[tokio::test]
async fn test_write_proposal_is_refused_in_read_only_mode() {
    let model = ScriptedModel::new(vec![proposal("DELETE FROM orders")]);
    let h = Harness::new(model);

    h.orchestrator
        .start_or_continue(turn("T1", "clean up"))
        .await
        .unwrap();
    let response = h
        .orchestrator
        .resolve_approval("T1", Decision::Approve, None)
        .await
        .unwrap();
    assert_eq!(response.status, TurnStatus::ApprovalRequired);
    assert!(response.message.contains("Write operations are disabled"));
}

#[tokio::test]
async fn test_auto_execute_closes_turn() {
    let model = ScriptedModel::new(vec![proposal(
        "SELECT status, COUNT(*) AS n FROM orders GROUP BY status ORDER BY status",
    )]);
    let h = Harness::new(model.clone());

    let response = h
        .orchestrator
        .start_or_continue(TurnRequest {
            thread_id: None,
            text: "orders per status".to_string(),
            auto_execute: true,
        })
        .await
        .unwrap();

    assert_eq!(response.status, TurnStatus::Done);
    assert!(response.message.starts_with("**Auto Execution Result**"));
    assert_eq!(response.table.as_ref().map(|t| t.row_count()), Some(4));
    assert!(uuid_like(&response.thread_id));
    assert_eq!(model.calls(), 1);

    let log = h.log(&response.thread_id).await;
    assert_eq!(log.last(), Some(&Message::user(EXECUTION_COMPLETED)));
}

#[tokio::test]
async fn test_new_threads_get_fresh_ids() {
    let model = ScriptedModel::new(vec![
        ModelReply::from_text("one"),
        ModelReply::from_text("two"),
    ]);
    let h = Harness::new(model);

    let a = h
        .orchestrator
        .start_or_continue(TurnRequest::new(None, "hi"))
        .await
        .unwrap();
    let b = h
        .orchestrator
        .start_or_continue(TurnRequest::new(Some(String::new()), "hi"))
        .await
        .unwrap();

    assert_ne!(a.thread_id, b.thread_id);
    assert_eq!(h.orchestrator.threads().await.unwrap().len(), 2);
}

fn uuid_like(id: &str) -> bool {
    id.len() == 36 && id.chars().filter(|c| *c == '-').count() == 4
}
