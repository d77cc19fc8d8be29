// ABOUTME: Tests for status propagation: advancement, completion, downstream failure.
// ABOUTME: Unknown contexts and commits are ignored, never errors.

mod support;

use nonempty::nonempty;
use std::collections::HashMap;
use std::sync::Arc;

use slipway::phases::{
    Goal, GoalStatus, Phases, Propagation, Run, RunRegistry, StatusPropagator,
};
use slipway::status::StatusState;
use support::{RecordingChannel, RecordingSink, commit, ctx, init_tracing};

fn build_phases() -> Phases {
    Phases::new(
        "build",
        nonempty![
            Goal::new("scan", ctx("delivery/scan")),
            Goal::new("build", ctx("delivery/build")),
        ],
    )
}

fn deploy_phases() -> Phases {
    Phases::new(
        "deploy",
        nonempty![
            Goal::new("deploy", ctx("delivery/deploy")),
            Goal::new("verify", ctx("delivery/verify")),
        ],
    )
}

fn setup() -> (Arc<RunRegistry>, Arc<RecordingSink>, StatusPropagator) {
    init_tracing();
    let registry = Arc::new(RunRegistry::new());
    let sink = Arc::new(RecordingSink::new());
    let downstream: HashMap<String, Vec<Phases>> =
        HashMap::from([("build".to_string(), vec![deploy_phases()])]);
    let propagator = StatusPropagator::new(registry.clone(), sink.clone(), downstream);
    (registry, sink, propagator)
}

#[tokio::test]
async fn success_advances_to_the_next_goal() {
    let (registry, _sink, propagator) = setup();
    let c = commit("atomist", "spring-team", "main", "abc123");
    registry.insert(Run::pending(c.clone(), build_phases()));

    let result = propagator
        .on_status(&c, &ctx("delivery/scan"), StatusState::Success)
        .await
        .unwrap();
    match result {
        Propagation::Advanced { next } => assert_eq!(next.name(), "build"),
        other => panic!("expected advancement, got {other:?}"),
    }
}

#[tokio::test]
async fn success_on_the_last_goal_completes_the_run() {
    let (registry, _sink, propagator) = setup();
    let c = commit("atomist", "spring-team", "main", "abc123");
    registry.insert(Run::pending(c.clone(), build_phases()));

    propagator
        .on_status(&c, &ctx("delivery/scan"), StatusState::Success)
        .await
        .unwrap();
    let result = propagator
        .on_status(&c, &ctx("delivery/build"), StatusState::Success)
        .await
        .unwrap();
    assert!(matches!(result, Propagation::Completed));
}

#[tokio::test]
async fn failure_fails_declared_downstream_phases_with_upstream_tag() {
    let (registry, sink, propagator) = setup();
    let c = commit("atomist", "spring-team", "main", "abc123");
    registry.insert(Run::pending(c.clone(), build_phases()));

    let result = propagator
        .on_status(&c, &ctx("delivery/scan"), StatusState::Failure)
        .await
        .unwrap();
    // One later goal in the same run plus both goals of the downstream
    // deploy phases.
    match result {
        Propagation::FailedDownstream { goals_failed } => assert_eq!(goals_failed, 3),
        other => panic!("expected downstream failure, got {other:?}"),
    }

    let run = registry.get(&c).unwrap();
    assert_eq!(
        run.lock().status_of(&ctx("delivery/scan")),
        Some(GoalStatus::Failure { upstream: false })
    );
    assert_eq!(
        run.lock().status_of(&ctx("delivery/build")),
        Some(GoalStatus::Failure { upstream: true })
    );

    for context in ["delivery/build", "delivery/deploy", "delivery/verify"] {
        let records = sink.records_for(context);
        assert_eq!(records.len(), 1, "missing upstream failure for {context}");
        assert_eq!(records[0].state, StatusState::Failure);
        assert!(
            records[0].description.contains("upstream phase 'build' failed"),
            "upstream failures must be distinguishable: {}",
            records[0].description
        );
    }

    // The locally failed goal itself gets no upstream-tagged report.
    assert!(sink.records_for("delivery/scan").is_empty());
}

#[tokio::test]
async fn failure_of_the_last_goal_still_fails_downstream_phases() {
    let (registry, sink, propagator) = setup();
    let c = commit("atomist", "spring-team", "main", "abc123");
    registry.insert(Run::pending(c.clone(), build_phases()));

    propagator
        .on_status(&c, &ctx("delivery/scan"), StatusState::Success)
        .await
        .unwrap();
    let result = propagator
        .on_status(&c, &ctx("delivery/build"), StatusState::Failure)
        .await
        .unwrap();
    match result {
        Propagation::FailedDownstream { goals_failed } => assert_eq!(goals_failed, 2),
        other => panic!("expected downstream failure, got {other:?}"),
    }
    assert_eq!(sink.records_for("delivery/deploy").len(), 1);
    assert_eq!(sink.records_for("delivery/verify").len(), 1);
}

#[tokio::test]
async fn downstream_failure_posts_a_channel_summary() {
    init_tracing();
    let registry = Arc::new(RunRegistry::new());
    let sink = Arc::new(RecordingSink::new());
    let channel = Arc::new(RecordingChannel::new());
    let downstream: HashMap<String, Vec<Phases>> =
        HashMap::from([("build".to_string(), vec![deploy_phases()])]);
    let propagator = StatusPropagator::new(registry.clone(), sink, downstream)
        .with_channel(channel.clone());

    let c = commit("atomist", "spring-team", "main", "abc123");
    registry.insert(Run::pending(c.clone(), build_phases()));
    propagator
        .on_status(&c, &ctx("delivery/scan"), StatusState::Failure)
        .await
        .unwrap();

    let messages = channel.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("Phase 'build' failed"));
    assert!(messages[0].contains("3 downstream goal(s)"));
}

#[tokio::test]
async fn unknown_context_is_ignored() {
    let (registry, sink, propagator) = setup();
    let c = commit("atomist", "spring-team", "main", "abc123");
    registry.insert(Run::pending(c.clone(), build_phases()));

    let result = propagator
        .on_status(&c, &ctx("unrelated/system"), StatusState::Success)
        .await
        .unwrap();
    assert!(matches!(result, Propagation::Ignored));
    assert!(sink.records().is_empty());
}

#[tokio::test]
async fn unknown_commit_is_ignored() {
    let (_registry, sink, propagator) = setup();
    let unknown = commit("atomist", "spring-team", "main", "fefefe");

    let result = propagator
        .on_status(&unknown, &ctx("delivery/scan"), StatusState::Success)
        .await
        .unwrap();
    assert!(matches!(result, Propagation::Ignored));
    assert!(sink.records().is_empty());
}

#[tokio::test]
async fn repeated_pending_marks_work_in_progress() {
    let (registry, _sink, propagator) = setup();
    let c = commit("atomist", "spring-team", "main", "abc123");
    registry.insert(Run::pending(c.clone(), build_phases()));

    let result = propagator
        .on_status(&c, &ctx("delivery/scan"), StatusState::Pending)
        .await
        .unwrap();
    assert!(matches!(result, Propagation::Recorded));

    let run = registry.get(&c).unwrap();
    assert_eq!(
        run.lock().status_of(&ctx("delivery/scan")),
        Some(GoalStatus::InProgress)
    );
}

#[tokio::test]
async fn terminal_goal_rejects_contradicting_report() {
    let (registry, _sink, propagator) = setup();
    let c = commit("atomist", "spring-team", "main", "abc123");
    registry.insert(Run::pending(c.clone(), build_phases()));

    propagator
        .on_status(&c, &ctx("delivery/scan"), StatusState::Success)
        .await
        .unwrap();
    let result = propagator
        .on_status(&c, &ctx("delivery/scan"), StatusState::Failure)
        .await;
    assert!(result.is_err());
}
