//! Guarantees of a single engine run

use serde_json::json;

use sql_assistant::llm::ModelReply;
use sql_assistant::messages::{Message, SystemSignal, EXECUTION_COMPLETED};
use sql_assistant::workflow::{EngineConfig, Node, TurnStatus, WorkflowError};

use crate::support::{proposal, run_query, tool_call, Harness, ScriptedModel};

#[tokio::test]
async fn test_log_is_append_only_across_runs() {
    let model = ScriptedModel::new(vec![
        proposal("SELECT * FROM orders LIMIT 3"),
        proposal("SELECT * FROM orders ORDER BY order_date DESC LIMIT 3"),
    ]);
    let h = Harness::new(model);

    h.engine.start("T1", "show 3 orders").await.unwrap();
    let first = h.log("T1").await;

    h.engine
        .resume("T1", Message::user("Rejected. Feedback: newest first"))
        .await
        .unwrap();
    let second = h.log("T1").await;

    h.engine
        .resume("T1", Message::user(EXECUTION_COMPLETED))
        .await
        .unwrap();
    let third = h.log("T1").await;

    assert!(second.len() > first.len());
    assert!(third.len() > second.len());
    assert_eq!(&second[..first.len()], &first[..]);
    assert_eq!(&third[..second.len()], &second[..]);
}

#[tokio::test]
async fn test_interrupt_commits_pending_with_agent_message_last() {
    let model = ScriptedModel::new(vec![proposal("SELECT * FROM orders LIMIT 3")]);
    let h = Harness::new(model);

    let outcome = h.engine.start("T1", "show 3 orders").await.unwrap();
    assert_eq!(outcome.status, TurnStatus::ApprovalRequired);
    assert!(outcome.answer.contains("```sql"));

    let checkpoint = h.store.load("T1").await.unwrap();
    assert_eq!(checkpoint.pending, Some(Node::HumanApproval));
    match checkpoint.messages.last() {
        Some(Message::Agent(reply)) => assert!(reply.tool_requests.is_empty()),
        other => panic!("expected agent message, got {:?}", other),
    }
}

#[tokio::test]
async fn test_execute_tool_success_ends_turn_without_model_call() {
    let model = ScriptedModel::new(vec![run_query("call_1", "SELECT order_id FROM orders")]);
    let h = Harness::new(model.clone());

    let outcome = h.engine.start("T1", "run the query").await.unwrap();
    assert_eq!(outcome.status, TurnStatus::Done);
    assert_eq!(model.calls(), 1);

    let log = h.log("T1").await;
    match log.last() {
        Some(Message::ToolResult(result)) => {
            assert_eq!(result.request_id, "call_1");
            assert!(!result.is_error);
            assert!(result.content.starts_with("| order_id |"));
        }
        other => panic!("expected tool result, got {:?}", other),
    }
    assert_eq!(h.store.load("T1").await.unwrap().pending, None);
}

#[tokio::test]
async fn test_execute_tool_empty_result_message() {
    let model = ScriptedModel::new(vec![run_query(
        "call_1",
        "SELECT * FROM orders WHERE status = 'returned'",
    )]);
    let h = Harness::new(model);

    let outcome = h.engine.start("T1", "any returns?").await.unwrap();
    assert_eq!(outcome.answer, "Query executed successfully per row count: 0");
}

#[tokio::test]
async fn test_execute_tool_failure_is_reported_by_model() {
    let model = ScriptedModel::new(vec![
        run_query("call_1", "SELECT * FROM nope"),
        ModelReply::from_text("There is no `nope` table; try `orders`."),
    ]);
    let h = Harness::new(model.clone());

    let outcome = h.engine.start("T1", "query nope").await.unwrap();
    assert_eq!(outcome.status, TurnStatus::Done);
    assert_eq!(model.calls(), 2);
    assert_eq!(outcome.answer, "There is no `nope` table; try `orders`.");

    // The second model call saw the failed result
    match model.last_history().last() {
        Some(Message::ToolResult(result)) => {
            assert!(result.is_error);
            assert!(result.content.contains("no such table"));
        }
        other => panic!("expected tool result, got {:?}", other),
    }
}

#[tokio::test]
async fn test_control_resume_is_terminal_and_reports_prior_reply() {
    let model = ScriptedModel::new(vec![proposal("SELECT * FROM orders LIMIT 3")]);
    let h = Harness::new(model.clone());

    let suspended = h.engine.start("T1", "show 3 orders").await.unwrap();
    let resumed = h
        .engine
        .resume("T1", Message::user(EXECUTION_COMPLETED))
        .await
        .unwrap();

    assert_eq!(resumed.status, TurnStatus::Done);
    assert_eq!(resumed.answer, suspended.answer);
    assert_eq!(resumed.appended, 1);
    assert_eq!(model.calls(), 1);

    let checkpoint = h.store.load("T1").await.unwrap();
    assert_eq!(checkpoint.pending, None);
    assert_eq!(checkpoint.messages.last(), Some(&Message::user(EXECUTION_COMPLETED)));
}

#[tokio::test]
async fn test_structured_completion_signal_closes_turn() {
    let model = ScriptedModel::new(vec![proposal("SELECT 1")]);
    let h = Harness::new(model);

    h.engine.start("T1", "one").await.unwrap();
    let outcome = h
        .engine
        .resume("T1", Message::System(SystemSignal::ActionCompleted))
        .await
        .unwrap();
    assert_eq!(outcome.status, TurnStatus::Done);
    assert!(outcome.answer.contains("SELECT 1"));
}

#[tokio::test]
async fn test_feedback_resume_reenters_agent_with_feedback_first() {
    let model = ScriptedModel::new(vec![
        proposal("SELECT * FROM orders LIMIT 3"),
        proposal("SELECT * FROM orders WHERE order_date >= date('now', '-7 days') LIMIT 3"),
    ]);
    let h = Harness::new(model.clone());

    h.engine.start("T1", "show 3 orders").await.unwrap();
    let outcome = h
        .engine
        .resume("T1", Message::user("Rejected. Feedback: use last 7 days"))
        .await
        .unwrap();

    assert_eq!(outcome.status, TurnStatus::ApprovalRequired);
    assert_eq!(model.calls(), 2);
    assert_eq!(
        model.last_history().last(),
        Some(&Message::user("Rejected. Feedback: use last 7 days"))
    );
}

#[tokio::test]
async fn test_unknown_tool_returns_error_result_and_reenters_agent() {
    let model = ScriptedModel::new(vec![
        tool_call("call_1", "drop_everything", json!({})),
        ModelReply::from_text("That tool does not exist, sorry."),
    ]);
    let h = Harness::new(model.clone());

    let outcome = h.engine.start("T1", "do it").await.unwrap();
    assert_eq!(outcome.status, TurnStatus::Done);
    assert_eq!(model.calls(), 2);

    let log = h.log("T1").await;
    let result = log
        .iter()
        .find_map(|m| match m {
            Message::ToolResult(r) => Some(r),
            _ => None,
        })
        .unwrap();
    assert!(result.is_error);
    assert!(result.content.starts_with("Unknown tool: drop_everything"));
}

#[tokio::test]
async fn test_skill_is_loaded_before_proposal() {
    let model = ScriptedModel::new(vec![
        tool_call("call_1", "load_skill", json!({"skill_name": "sales_analytics"})),
        proposal("SELECT * FROM orders LIMIT 3"),
    ]);
    let h = Harness::new(model.clone());

    let outcome = h.engine.start("T1", "show 3 orders").await.unwrap();
    assert_eq!(outcome.status, TurnStatus::ApprovalRequired);

    let seen = model.last_history();
    match seen.last() {
        Some(Message::ToolResult(result)) => {
            assert_eq!(result.tool_name, "load_skill");
            assert!(result.content.contains("total_amount"));
        }
        other => panic!("expected skill content, got {:?}", other),
    }
}

#[tokio::test]
async fn test_resume_without_pending_is_rejected() {
    let model = ScriptedModel::new(vec![]);
    let h = Harness::new(model);

    let err = h.engine.run("T1", None).await.unwrap_err();
    assert!(matches!(err, WorkflowError::InvalidResume(_)));
    assert!(h.log("T1").await.is_empty());
}

#[tokio::test]
async fn test_model_failure_ends_turn_with_signal() {
    let model = ScriptedModel::new(vec![]);
    let h = Harness::new(model);

    let outcome = h.engine.start("T1", "hello").await.unwrap();
    assert_eq!(outcome.status, TurnStatus::Done);

    let log = h.log("T1").await;
    assert!(matches!(
        log.last(),
        Some(Message::System(SystemSignal::AgentFailure { .. }))
    ));
}

#[tokio::test]
async fn test_step_limit_ends_runaway_tool_loop() {
    let replies = (0..10)
        .map(|i| tool_call(&format!("call_{}", i), "load_skill", json!({"skill_name": "nope"})))
        .collect();
    let model = ScriptedModel::new(replies);
    let config = EngineConfig {
        max_agent_steps: 3,
        ..EngineConfig::default()
    };
    let h = Harness::with_config(model.clone(), config);

    let outcome = h.engine.start("T1", "loop forever").await.unwrap();
    assert_eq!(outcome.status, TurnStatus::Done);
    assert_eq!(model.calls(), 3);
    assert!(outcome.answer.contains("maximum steps (3)"));
}
