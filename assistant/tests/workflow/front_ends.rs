//! HTTP handlers and the interactive loop over the same orchestrator

use std::io::Cursor;
use std::sync::Arc;

use sql_assistant::cli::Repl;
use sql_assistant::llm::ModelReply;

use crate::support::{proposal, Harness, ScriptedModel};

#[cfg(feature = "web")]
mod http {
    use std::sync::Arc;

    use axum::extract::{Path, State};
    use axum::http::StatusCode;
    use axum::Json;

    use sql_assistant::orchestrator::{Decision, TurnOrchestrator, TurnRequest};
    use sql_assistant::web::api::{self, ApprovalRequest};
    use sql_assistant::web::AppState;
    use sql_assistant::workflow::TurnStatus;

    use crate::support::{proposal, Harness, ScriptedModel};

    fn state(orchestrator: TurnOrchestrator) -> AppState {
        AppState::new(
            Arc::new(orchestrator),
            "http://localhost:11434".to_string(),
            "scripted".to_string(),
        )
    }

    #[tokio::test]
    async fn test_chat_then_approve_over_http() {
        let model = ScriptedModel::new(vec![proposal("SELECT * FROM orders LIMIT 3")]);
        let state = state(Harness::new(model).orchestrator);

        let Json(response) = api::chat(
            State(state.clone()),
            Json(TurnRequest::new(Some("T1".to_string()), "show 3 orders")),
        )
        .await
        .unwrap();
        assert_eq!(response.status, TurnStatus::ApprovalRequired);

        let Json(thread) = api::get_thread(State(state.clone()), Path("T1".to_string()))
            .await
            .unwrap();
        assert_eq!(thread.messages.len(), 2);
        assert!(thread.pending.is_some());

        let Json(response) = api::approval(
            State(state.clone()),
            Json(ApprovalRequest {
                thread_id: "T1".to_string(),
                decision: Decision::Approve,
                feedback: None,
            }),
        )
        .await
        .unwrap();
        assert_eq!(response.status, TurnStatus::Done);
        assert_eq!(response.table.map(|t| t.row_count()), Some(3));

        let Json(list) = api::list_threads(State(state)).await.unwrap();
        assert_eq!(list.total, 1);
        assert_eq!(list.threads[0].thread_id, "T1");
    }

    #[tokio::test]
    async fn test_approval_without_pending_is_bad_request() {
        let model = ScriptedModel::new(vec![]);
        let state = state(Harness::new(model).orchestrator);

        let (status, Json(body)) = api::approval(
            State(state),
            Json(ApprovalRequest {
                thread_id: "nope".to_string(),
                decision: Decision::Approve,
                feedback: None,
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error, "Conversation is not waiting for approval.");
    }

    #[tokio::test]
    async fn test_unknown_thread_is_not_found() {
        let model = ScriptedModel::new(vec![]);
        let state = state(Harness::new(model).orchestrator);

        let (status, _) = api::get_thread(State(state), Path("missing".to_string()))
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}

#[tokio::test]
async fn test_repl_approve_flow() {
    let model = ScriptedModel::new(vec![proposal("SELECT * FROM orders LIMIT 3")]);
    let h = Arc::new(Harness::new(model));

    let input = Cursor::new("show 3 orders\ny\nexit\n");
    let mut output = Vec::new();
    let mut repl = Repl::new(&h.orchestrator);
    repl.run_with(input, &mut output).await.unwrap();

    let output = String::from_utf8(output).unwrap();
    assert!(output.contains("Approval Required"));
    assert!(output.contains("SELECT * FROM orders LIMIT 3"));
    assert!(output.contains("**Execution Result**"));
    assert!(output.trim_end().ends_with("Goodbye!"));

    let thread_id = repl.thread_id().unwrap().to_string();
    assert!(!h.store.load(&thread_id).await.unwrap().is_waiting_for_approval());
}

#[tokio::test]
async fn test_repl_reject_sends_feedback() {
    let model = ScriptedModel::new(vec![
        proposal("SELECT * FROM orders LIMIT 3"),
        ModelReply::from_text("OK, let me know what you need instead."),
    ]);
    let h = Harness::new(model.clone());

    let input = Cursor::new("show 3 orders\nn\nnot now\n");
    let mut output = Vec::new();
    let mut repl = Repl::new(&h.orchestrator).with_thread(Some("T1".to_string()));
    repl.run_with(input, &mut output).await.unwrap();

    let output = String::from_utf8(output).unwrap();
    assert!(output.contains("Sending feedback to agent..."));
    assert!(output.contains("let me know what you need"));
    assert_eq!(model.calls(), 2);
    assert_eq!(
        h.log("T1").await[2],
        sql_assistant::messages::Message::user("Rejected. Feedback: not now")
    );
}
