//! End-to-end coverage driving a real `Scheduler`/`Interpreter` over a
//! scripted `LlmProvider`: these exercise the canonical turn chart the
//! way a live deployment would, rather than unit-testing its handlers in
//! isolation.

mod common;

use common::{scheduler_with, Harness, MockProvider, Script};

use thinksuit_core::plan::{ExecutionPlan, Resolution, ResultStrategy, Step};
use thinksuit_core::Event;
use thinksuit_engine::ScheduleRequest;
use thinksuit_journal::build_thread;

fn direct_plan(role: &str) -> ExecutionPlan {
    ExecutionPlan::Direct { name: "t/direct".into(), role: role.into(), adaptations: vec![] }
}

#[tokio::test]
async fn direct_greeting_returns_llm_output() {
    let dir = tempfile::tempdir().unwrap();
    let provider = MockProvider::new("mock", vec![Script::Text("hi there, how can I help?")]);
    let scheduler = scheduler_with(dir.path(), provider, Harness::default());

    let scheduled = scheduler
        .schedule(ScheduleRequest { input: "hello".into(), selected_plan: Some(direct_plan("assistant")), ..Default::default() })
        .unwrap();
    assert!(scheduled.scheduled);
    let session_id = scheduled.session_id.clone();
    scheduled.join().await.unwrap();

    let entries = scheduler.get_session(&session_id).unwrap();
    let events: Vec<Event> = entries.iter().map(|e| e.event).collect();
    assert!(events.contains(&Event::PlanSelected));
    assert!(events.contains(&Event::InstructionsComposed));
    assert!(events.contains(&Event::LlmRequested));
    assert!(events.contains(&Event::LlmResponded));
    assert!(events.contains(&Event::SessionResponse));

    let thread = build_thread(&entries);
    let last = thread.messages().last().unwrap();
    assert_eq!(last.content, "hi there, how can I help?");
}

#[tokio::test]
async fn task_plan_denies_tool_call_on_approval_timeout() {
    let dir = tempfile::tempdir().unwrap();
    let provider = MockProvider::new(
        "mock",
        vec![
            Script::ToolCall { call_id: "call-1", tool_name: "mcp:test:echo", arguments: serde_json::json!({}) },
            Script::Text("done"),
        ],
    );
    let harness = Harness { approval_timeout_ms: 20, ..Harness::default() };
    let scheduler = scheduler_with(dir.path(), provider, harness);

    let plan = ExecutionPlan::Task {
        name: "t/task".into(),
        role: "assistant".into(),
        tools: vec![],
        adaptations: vec![],
        resolution: Some(Resolution { max_cycles: 4, ..Resolution::default() }),
    };
    let scheduled = scheduler
        .schedule(ScheduleRequest { input: "please run the tool".into(), selected_plan: Some(plan), ..Default::default() })
        .unwrap();
    let session_id = scheduled.session_id.clone();
    scheduled.join().await.unwrap();

    let entries = scheduler.get_session(&session_id).unwrap();
    let events: Vec<Event> = entries.iter().map(|e| e.event).collect();
    assert!(events.contains(&Event::ApprovalRequested));
    assert!(events.contains(&Event::ToolCallDenied));
    assert!(events.contains(&Event::SessionResponse));

    let thread = build_thread(&entries);
    assert_eq!(thread.messages().last().unwrap().content, "done");
}

#[tokio::test]
async fn task_plan_auto_approves_configured_tool() {
    let dir = tempfile::tempdir().unwrap();
    let provider = MockProvider::new(
        "mock",
        vec![
            Script::ToolCall { call_id: "call-1", tool_name: "mcp:test:echo", arguments: serde_json::json!({}) },
            Script::Text("done"),
        ],
    );
    let harness = Harness { auto_approve: vec!["mcp:test:echo".into()], ..Harness::default() };
    let scheduler = scheduler_with(dir.path(), provider, harness);

    let plan = ExecutionPlan::Task {
        name: "t/task".into(),
        role: "assistant".into(),
        tools: vec![],
        adaptations: vec![],
        resolution: Some(Resolution { max_cycles: 4, ..Resolution::default() }),
    };
    let scheduled = scheduler
        .schedule(ScheduleRequest { input: "please run the tool".into(), selected_plan: Some(plan), ..Default::default() })
        .unwrap();
    let session_id = scheduled.session_id.clone();
    scheduled.join().await.unwrap();

    let entries = scheduler.get_session(&session_id).unwrap();
    let events: Vec<Event> = entries.iter().map(|e| e.event).collect();
    assert!(!events.contains(&Event::ApprovalRequested), "auto-approved tools never enter the approval queue");
    assert!(events.contains(&Event::ToolCallApproved));
}

#[tokio::test]
async fn parallel_concat_preserves_declaration_order() {
    let dir = tempfile::tempdir().unwrap();
    let provider = MockProvider::new("mock", vec![Script::Text("first"), Script::Text("second"), Script::Text("third")]);
    let scheduler = scheduler_with(dir.path(), provider, Harness::default());

    let step = Step { role: "assistant".into(), strategy: "direct".into(), tools: None, adaptations: vec![] };
    let plan = ExecutionPlan::Parallel {
        name: "t/parallel".into(),
        roles: vec![step.clone(), step.clone(), step],
        result_strategy: ResultStrategy::Concat,
    };
    let scheduled = scheduler
        .schedule(ScheduleRequest { input: "fan out".into(), selected_plan: Some(plan), ..Default::default() })
        .unwrap();
    let session_id = scheduled.session_id.clone();
    scheduled.join().await.unwrap();

    let entries = scheduler.get_session(&session_id).unwrap();
    let thread = build_thread(&entries);
    assert_eq!(thread.messages().last().unwrap().content, "first\n\nsecond\n\nthird");
}

#[tokio::test]
async fn fanout_over_limit_fails_before_any_provider_call() {
    let dir = tempfile::tempdir().unwrap();
    let provider = MockProvider::new("mock", vec![Script::Text("unused")]);
    let harness = Harness { max_fanout: 2, ..Harness::default() };
    let scheduler = scheduler_with(dir.path(), provider.clone(), harness);

    let step = Step { role: "assistant".into(), strategy: "direct".into(), tools: None, adaptations: vec![] };
    let plan = ExecutionPlan::Parallel {
        name: "t/parallel".into(),
        roles: vec![step.clone(), step.clone(), step],
        result_strategy: ResultStrategy::Concat,
    };
    let scheduled = scheduler
        .schedule(ScheduleRequest { input: "fan out too wide".into(), selected_plan: Some(plan), ..Default::default() })
        .unwrap();
    let session_id = scheduled.session_id.clone();
    // The chart routes straight to `Fail`, so the turn finishes with
    // `Ok(false)` rather than propagating an error through `join`.
    scheduled.join().await.unwrap();

    assert_eq!(provider.call_count(), 0, "no branch should ever reach the provider");

    let entries = scheduler.get_session(&session_id).unwrap();
    let failed = entries.iter().find(|e| e.event == Event::SessionError).expect("turn should have failed");
    let data = failed.data.as_ref().unwrap();
    assert_eq!(data["code"], "E_RESOURCE_FANOUT");
    assert_eq!(data["requested"], 3);
    assert_eq!(data["max"], 2);
}

#[tokio::test]
async fn interrupt_mid_call_aborts_the_turn() {
    let dir = tempfile::tempdir().unwrap();
    let provider = MockProvider::new("mock", vec![Script::SlowThenText { millis: 300, output: "too late" }]);
    let scheduler = scheduler_with(dir.path(), provider, Harness::default());

    let scheduled = scheduler
        .schedule(ScheduleRequest { input: "hang on".into(), selected_plan: Some(direct_plan("assistant")), ..Default::default() })
        .unwrap();
    let session_id = scheduled.session_id.clone();

    tokio::time::sleep(std::time::Duration::from_millis(30)).await;
    scheduled.interrupt();

    let outcome = scheduled.join().await;
    assert!(outcome.is_err(), "an aborted provider call should surface as a turn error");

    let entries = scheduler.get_session(&session_id).unwrap();
    let failed = entries.iter().find(|e| e.event == Event::SessionError).expect("turn should be recorded as failed");
    let data = failed.data.as_ref().unwrap();
    assert_eq!(data["code"], "E_ABORT");
}

#[tokio::test]
async fn concurrent_schedule_on_same_session_rejects_the_second() {
    let dir = tempfile::tempdir().unwrap();
    let provider = MockProvider::new("mock", vec![Script::SlowThenText { millis: 200, output: "first turn's answer" }]);
    let scheduler = scheduler_with(dir.path(), provider, Harness::default());

    let session_id = "shared-session".to_string();
    let first = scheduler
        .schedule(ScheduleRequest {
            input: "turn one".into(),
            session_id: Some(session_id.clone()),
            selected_plan: Some(direct_plan("assistant")),
            ..Default::default()
        })
        .unwrap();
    assert!(first.scheduled);

    let second = scheduler
        .schedule(ScheduleRequest {
            input: "turn two, while turn one is still running".into(),
            session_id: Some(session_id.clone()),
            selected_plan: Some(direct_plan("assistant")),
            ..Default::default()
        })
        .unwrap();
    assert!(!second.scheduled);
    assert_eq!(second.reason.as_deref(), Some("session busy"));
    assert_eq!(second.session_id, session_id);

    first.join().await.unwrap();
}
