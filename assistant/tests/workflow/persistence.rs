//! Resuming from a reopened SQLite checkpoint store

use std::sync::Arc;

use sql_assistant::checkpoint::{CheckpointStore, SqliteCheckpointStore};
use sql_assistant::llm::ModelReply;
use sql_assistant::messages::{Message, EXECUTION_COMPLETED};
use sql_assistant::orchestrator::{Decision, TurnRequest};
use sql_assistant::workflow::{EngineConfig, Node, TurnStatus};

use crate::support::{proposal, Harness, ScriptedModel};

#[tokio::test]
async fn test_pending_approval_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("checkpoints.db");

    {
        let store: Arc<dyn CheckpointStore> = Arc::new(SqliteCheckpointStore::open_at(&path).unwrap());
        let model = ScriptedModel::new(vec![proposal("SELECT * FROM orders LIMIT 3")]);
        let h = Harness::with_store(model, store, EngineConfig::default());

        let response = h
            .orchestrator
            .start_or_continue(TurnRequest::new(Some("T1".to_string()), "show 3 orders"))
            .await
            .unwrap();
        assert_eq!(response.status, TurnStatus::ApprovalRequired);
    }

    // New process: fresh store handle, fresh engine, a model that must not be called
    let store: Arc<dyn CheckpointStore> = Arc::new(SqliteCheckpointStore::open_at(&path).unwrap());
    let model = ScriptedModel::new(vec![]);
    let h = Harness::with_store(model.clone(), store, EngineConfig::default());

    let checkpoint = h.store.load("T1").await.unwrap();
    assert_eq!(checkpoint.pending, Some(Node::HumanApproval));
    assert_eq!(checkpoint.messages.len(), 2);

    let response = h
        .orchestrator
        .resolve_approval("T1", Decision::Approve, None)
        .await
        .unwrap();
    assert_eq!(response.status, TurnStatus::Done);
    assert_eq!(response.table.map(|t| t.row_count()), Some(3));
    assert_eq!(model.calls(), 0);

    let log = h.log("T1").await;
    assert_eq!(log.last(), Some(&Message::user(EXECUTION_COMPLETED)));
}

#[tokio::test]
async fn test_tool_round_trip_is_persisted_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("checkpoints.db");
    let store: Arc<dyn CheckpointStore> = Arc::new(SqliteCheckpointStore::open_at(&path).unwrap());

    let model = ScriptedModel::new(vec![
        crate::support::tool_call(
            "call_1",
            "load_skill",
            serde_json::json!({"skill_name": "inventory_management"}),
        ),
        ModelReply::from_text("Inventory lives in the inventory table."),
    ]);
    let h = Harness::with_store(model, store, EngineConfig::default());
    h.engine.start("T1", "where is stock kept?").await.unwrap();

    let reopened = SqliteCheckpointStore::open_at(&path).unwrap();
    let kinds: Vec<_> = reopened
        .load("T1")
        .await
        .unwrap()
        .messages
        .iter()
        .map(Message::kind)
        .collect();
    assert_eq!(kinds, vec!["user", "agent", "tool_result", "agent"]);

    let threads = reopened.list_threads().await.unwrap();
    assert_eq!(threads.len(), 1);
    assert_eq!(threads[0].message_count, 4);
    assert_eq!(threads[0].pending, None);
}
