use std::path::Path;
use std::sync::Arc;

use chat_agents_app::demos::deep_agent;
use chat_agents_app::{RuleBasedModel, SessionController, SessionError, StreamEvent};
use chat_agents_core::hitl::{Decision, EditedAction};
use chat_agents_core::messaging::{MessageRole, ToolStatus};
use futures::TryStreamExt;
use serde_json::json;

fn controller(root: &Path) -> SessionController {
    let agent = deep_agent(Arc::new(RuleBasedModel::default()), root).unwrap();
    SessionController::new(Arc::new(agent))
}

async fn collect(
    stream: Result<chat_agents_app::EventStream, SessionError>,
) -> Vec<StreamEvent> {
    stream.unwrap().try_collect().await.unwrap()
}

#[tokio::test]
async fn fresh_thread_is_empty_and_idle() {
    let dir = tempfile::tempdir().unwrap();
    let controller = controller(dir.path());
    controller.start("t1");

    assert!(controller.get_history("t1").await.unwrap().is_empty());
    assert!(!controller.is_awaiting_approval("t1").await.unwrap());
    assert!(controller.pending_approval("t1").await.unwrap().is_none());
}

#[tokio::test]
async fn plain_message_is_answered_without_interrupt() {
    let dir = tempfile::tempdir().unwrap();
    let controller = controller(dir.path());

    let events = collect(controller.send("hello", "t1").await).await;
    assert!(events.iter().all(|e| !e.is_approval_request()));
    assert!(matches!(events.last(), Some(StreamEvent::ModelMessage(_))));

    let history = controller.get_history("t1").await.unwrap();
    assert_eq!(history[0].role, MessageRole::Human);
    assert_eq!(history[0].text(), Some("hello"));
    assert_eq!(history.last().unwrap().text(), Some("You said: hello"));
}

#[tokio::test]
async fn gated_tool_call_ends_with_single_approval_request() {
    let dir = tempfile::tempdir().unwrap();
    let controller = controller(dir.path());

    let events = collect(controller.send("write /out.txt: hello", "t1").await).await;
    let approvals: Vec<_> = events.iter().filter(|e| e.is_approval_request()).collect();
    assert_eq!(approvals.len(), 1);
    match events.last() {
        Some(StreamEvent::ApprovalRequested(requests)) => {
            assert_eq!(requests.len(), 1);
            assert_eq!(requests.action_requests[0].name, "write_file");
        }
        other => panic!("expected approval request last, got {other:?}"),
    }
    assert!(controller.is_awaiting_approval("t1").await.unwrap());
    assert!(!dir.path().join("out.txt").exists());
}

#[tokio::test]
async fn approve_executes_and_clears_pending() {
    let dir = tempfile::tempdir().unwrap();
    let controller = controller(dir.path());
    collect(controller.send("write /out.txt: hello", "t1").await).await;

    let events = collect(controller.approve("t1").await).await;
    assert!(events.iter().all(|e| !e.is_approval_request()));
    let tool = events
        .iter()
        .find_map(|e| match e {
            StreamEvent::ToolMessage(m) => Some(m.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(tool.status, Some(ToolStatus::Success));

    assert_eq!(
        std::fs::read_to_string(dir.path().join("out.txt")).unwrap(),
        "hello"
    );
    assert!(!controller.is_awaiting_approval("t1").await.unwrap());
}

#[tokio::test]
async fn reject_skips_the_tool_and_records_feedback() {
    let dir = tempfile::tempdir().unwrap();
    let controller = controller(dir.path());
    collect(controller.send("write /out.txt: hello", "t1").await).await;

    collect(controller.reject("not allowed", "t1").await).await;
    assert!(!dir.path().join("out.txt").exists());
    assert!(!controller.is_awaiting_approval("t1").await.unwrap());

    let history = controller.get_history("t1").await.unwrap();
    assert!(history.iter().any(|m| m.role == MessageRole::Tool
        && m.text() == Some("Rejected. Human feedback: not allowed")));
}

#[tokio::test]
async fn approve_and_reject_need_a_pending_request() {
    let dir = tempfile::tempdir().unwrap();
    let controller = controller(dir.path());
    collect(controller.send("hello", "t1").await).await;

    assert!(matches!(
        controller.approve("t1").await,
        Err(SessionError::NoPendingApproval { .. })
    ));
    assert!(matches!(
        controller.reject("no", "t1").await,
        Err(SessionError::NoPendingApproval { .. })
    ));
}

#[tokio::test]
async fn send_while_awaiting_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let controller = controller(dir.path());
    collect(controller.send("write /out.txt: hello", "t1").await).await;
    let before = controller.get_history("t1").await.unwrap().len();

    assert!(matches!(
        controller.send("another thing", "t1").await,
        Err(SessionError::InvalidThread { .. })
    ));
    assert_eq!(controller.get_history("t1").await.unwrap().len(), before);
}

#[tokio::test]
async fn threads_are_isolated() {
    let dir = tempfile::tempdir().unwrap();
    let controller = controller(dir.path());
    collect(controller.send("write /out.txt: hello", "t1").await).await;

    controller.start("t2");
    assert!(controller.get_history("t2").await.unwrap().is_empty());
    assert!(!controller.is_awaiting_approval("t2").await.unwrap());
    collect(controller.send("hello", "t2").await).await;
    assert!(controller.is_awaiting_approval("t1").await.unwrap());
}

#[tokio::test]
async fn edit_decision_rewrites_arguments() {
    let dir = tempfile::tempdir().unwrap();
    let controller = controller(dir.path());
    collect(controller.send("write /out.txt: hello", "t1").await).await;

    let mut args = serde_json::Map::new();
    args.insert("file_path".into(), json!("/edited.txt"));
    args.insert("content".into(), json!("edited"));
    let decision = Decision::Edit {
        edited_action: EditedAction {
            name: "write_file".into(),
            args,
        },
    };

    assert!(matches!(
        controller.decide(vec![], "t1").await,
        Err(SessionError::DecisionCountMismatch { expected: 1, actual: 0 })
    ));
    collect(controller.decide(vec![decision], "t1").await).await;
    assert!(!dir.path().join("out.txt").exists());
    assert_eq!(
        std::fs::read_to_string(dir.path().join("edited.txt")).unwrap(),
        "edited"
    );
}
