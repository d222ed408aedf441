//! Thread isolation and the busy policy

use std::sync::Arc;
use std::time::Duration;

use sql_assistant::llm::ModelReply;
use sql_assistant::messages::Message;
use sql_assistant::workflow::{BusyPolicy, EngineConfig, TurnStatus, WorkflowError};

use crate::support::{EchoProposalModel, Harness, ScriptedModel};

#[tokio::test]
async fn test_distinct_threads_run_concurrently_and_stay_isolated() {
    let model = Arc::new(EchoProposalModel {
        delay: Duration::from_millis(50),
    });
    let h = Arc::new(Harness::new(model));

    let runs: Vec<_> = (0..4)
        .map(|i| {
            let h = h.clone();
            tokio::spawn(async move {
                let thread_id = format!("T{}", i);
                let outcome = h
                    .engine
                    .start(&thread_id, &format!("question {}", i))
                    .await
                    .unwrap();
                (thread_id, outcome)
            })
        })
        .collect();

    for run in runs {
        let (thread_id, outcome) = run.await.unwrap();
        assert_eq!(outcome.status, TurnStatus::ApprovalRequired);

        let suffix = thread_id.trim_start_matches('T');
        let log = h.log(&thread_id).await;
        assert_eq!(log.len(), 2);
        assert_eq!(log[0], Message::user(format!("question {}", suffix)));
        assert!(log[1].text().contains(&format!("question {}", suffix)));
    }
}

#[tokio::test]
async fn test_second_run_on_busy_thread_is_rejected() {
    let model = ScriptedModel::slow(
        vec![ModelReply::from_text("done thinking")],
        Duration::from_millis(200),
    );
    let h = Arc::new(Harness::new(model));

    let first = {
        let h = h.clone();
        tokio::spawn(async move { h.engine.start("T1", "slow question").await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    let err = h.engine.start("T1", "impatient question").await.unwrap_err();
    assert!(matches!(err, WorkflowError::ThreadBusy(ref id) if id == "T1"));

    // Other threads are unaffected while T1 is busy
    assert!(h.engine.checkpoint("T2").await.is_ok());

    let outcome = first.await.unwrap().unwrap();
    assert_eq!(outcome.answer, "done thinking");

    // The rejected run left no trace
    assert_eq!(h.log("T1").await.len(), 2);
}

#[tokio::test]
async fn test_wait_policy_serializes_runs() {
    let model = ScriptedModel::slow(
        vec![
            ModelReply::from_text("first answer"),
            ModelReply::from_text("second answer"),
        ],
        Duration::from_millis(50),
    );
    let config = EngineConfig {
        busy_policy: BusyPolicy::Wait,
        ..EngineConfig::default()
    };
    let h = Arc::new(Harness::with_config(model, config));

    let first = {
        let h = h.clone();
        tokio::spawn(async move { h.engine.start("T1", "one").await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    let second = h.engine.start("T1", "two").await.unwrap();
    first.await.unwrap().unwrap();

    assert_eq!(second.answer, "second answer");
    let log = h.log("T1").await;
    assert_eq!(
        log,
        vec![
            Message::user("one"),
            Message::agent("first answer"),
            Message::user("two"),
            Message::agent("second answer"),
        ]
    );
}

#[tokio::test]
async fn test_abandoned_run_commits_nothing() {
    let model = ScriptedModel::slow(
        vec![ModelReply::from_text("too late")],
        Duration::from_millis(500),
    );
    let h = Harness::new(model);

    let run = h.engine.start("T1", "question");
    let timed_out = tokio::time::timeout(Duration::from_millis(50), run).await;
    assert!(timed_out.is_err());

    assert!(h.log("T1").await.is_empty());
    // The dropped run released the thread
    assert!(h.engine.lease("T1").await.is_ok());
}
