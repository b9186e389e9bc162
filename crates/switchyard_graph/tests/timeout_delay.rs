//! Timeout decorator and delay primitive inside running machines.

mod test_utils;

use std::sync::Arc;
use std::time::{Duration, Instant};

use switchyard_graph::CancellationToken;
use switchyard_graph::builder::GraphBuilder;
use switchyard_graph::error::FsmError;
use switchyard_graph::executor::StateMachine;
use switchyard_graph::logic::{
    DelayLogic, HandlePool, Logic, NodeContext, Outcome, RelayLogic, TimeoutBehavior,
    TimeoutLogic,
};
use switchyard_graph::node::NodeId;
use switchyard_graph::replay::{EventKind, ReplayRecorder};
use switchyard_graph::status::ExecutionStatus;
use test_utils::{EventLog, Tracker, track, wait_for_cancel};

fn slow() -> DelayLogic {
    DelayLogic::new(Duration::from_secs(5))
}

fn single(logic: impl Logic) -> StateMachine {
    let mut builder = GraphBuilder::new();
    builder.add_node(logic);
    StateMachine::new(builder.build().unwrap())
}

// ─────────────────────────────────────────────────────────────────────────────
// Timeout
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn expiry_with_fail_behavior_is_soft_failure() {
    let timeout = TimeoutLogic::new(slow(), Duration::from_millis(20), TimeoutBehavior::Fail).unwrap();
    let machine = single(timeout);

    let started = Instant::now();
    assert_eq!(
        machine.run(&CancellationToken::new()).await.unwrap(),
        Outcome::Failure
    );
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(20));
    assert!(elapsed < Duration::from_secs(2));
    assert_eq!(machine.status(), ExecutionStatus::Ready);
}

#[tokio::test]
async fn expiry_with_throw_behavior_is_error() {
    let timeout =
        TimeoutLogic::new(slow(), Duration::from_millis(20), TimeoutBehavior::Throw).unwrap();
    let log = EventLog::new();
    let machine = single(timeout).with_observer(log.clone());

    let err = machine.run(&CancellationToken::new()).await.unwrap_err();

    assert!(matches!(err, FsmError::Timeout(d) if d == Duration::from_millis(20)));
    assert!(!err.is_cancellation());
    assert!(log.events().contains(&"failed 0".to_owned()));
    assert!(log.events().contains(&"completed Failure".to_owned()));
}

#[tokio::test]
async fn inner_logic_observes_internal_cancellation_on_expiry() {
    let tracker = Tracker::new();
    let seen = tracker.clone();
    let inner = RelayLogic::new(move |cancel| {
        let seen = seen.clone();
        async move {
            cancel.cancelled().await;
            seen.push("inner cancelled");
            Err(FsmError::Cancelled)
        }
    });
    let timeout = TimeoutLogic::new(inner, Duration::from_millis(20), TimeoutBehavior::Fail).unwrap();

    let started = Instant::now();
    assert_eq!(
        single(timeout).run(&CancellationToken::new()).await.unwrap(),
        Outcome::Failure
    );
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(20));
    assert!(elapsed < Duration::from_secs(2));
    assert_eq!(tracker.entries(), vec!["inner cancelled"]);
}

#[tokio::test]
async fn fast_inner_logic_wins() {
    let tracker = Tracker::new();
    let timeout = TimeoutLogic::new(
        track(&tracker, "inner"),
        Duration::from_secs(5),
        TimeoutBehavior::Throw,
    )
    .unwrap();
    assert_eq!(
        single(timeout).run(&CancellationToken::new()).await.unwrap(),
        Outcome::Success
    );
    assert_eq!(tracker.entries(), vec!["inner"]);
}

#[tokio::test]
async fn external_cancellation_beats_due_deadline() {
    let timeout = TimeoutLogic::new(slow(), Duration::from_millis(1), TimeoutBehavior::Throw).unwrap();
    let token = CancellationToken::new();
    token.cancel();
    let node = NodeId::START;
    let cx = NodeContext::new(&node, &token);

    let err = timeout.execute(&cx).await.unwrap_err();
    assert!(err.is_cancellation());
}

#[tokio::test]
async fn external_cancellation_during_wait_surfaces_as_cancellation() {
    let timeout =
        TimeoutLogic::new(slow(), Duration::from_secs(5), TimeoutBehavior::Fail).unwrap();
    let machine = single(timeout).with_auto_reset(false);
    let token = CancellationToken::new();

    let canceller = async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        token.cancel();
    };
    let (result, ()) = tokio::join!(machine.run(&token), canceller);

    assert!(matches!(result, Err(FsmError::Cancelled)));
    assert_eq!(machine.status(), ExecutionStatus::Cancelled);
}

#[test]
fn zero_timeout_is_rejected() {
    let err = TimeoutLogic::new(RelayLogic::success(), Duration::ZERO, TimeoutBehavior::Fail)
        .err()
        .unwrap();
    assert!(matches!(err, FsmError::InvalidTimeout(_)));
    assert!(err.is_usage());
}

#[tokio::test]
async fn handles_are_reused_only_when_uncancelled() {
    let pool = Arc::new(HandlePool::new(4));
    let quick = TimeoutLogic::new(RelayLogic::success(), Duration::from_secs(1), TimeoutBehavior::Fail)
        .unwrap()
        .with_pool(Arc::clone(&pool));
    let expiring = TimeoutLogic::new(slow(), Duration::from_millis(5), TimeoutBehavior::Fail)
        .unwrap()
        .with_pool(Arc::clone(&pool));
    let token = CancellationToken::new();
    let node = NodeId::START;
    let cx = NodeContext::new(&node, &token);

    quick.execute(&cx).await.unwrap();
    quick.execute(&cx).await.unwrap();
    assert_eq!(pool.idle(), 1);

    assert_eq!(expiring.execute(&cx).await.unwrap(), Outcome::Failure);
    assert_eq!(pool.idle(), 0);
}

// ─────────────────────────────────────────────────────────────────────────────
// Timeout around nested machines
// ─────────────────────────────────────────────────────────────────────────────

fn waiting_child() -> (Arc<StateMachine>, Arc<ReplayRecorder>) {
    let recorder = Arc::new(ReplayRecorder::default());
    let mut builder = GraphBuilder::new();
    builder.add_node(wait_for_cancel());
    let child = StateMachine::new(builder.build().unwrap()).with_observer(recorder.clone());
    (Arc::new(child), recorder)
}

fn child_statuses(recorder: &ReplayRecorder) -> Vec<String> {
    recorder
        .snapshot()
        .into_iter()
        .filter(|e| e.kind == EventKind::StatusChanged)
        .filter_map(|e| e.message)
        .collect()
}

#[tokio::test]
async fn expiry_lets_nested_machine_settle() {
    let (child, recorder) = waiting_child();
    let timeout = TimeoutLogic::new(
        Arc::clone(&child),
        Duration::from_millis(20),
        TimeoutBehavior::Fail,
    )
    .unwrap();

    assert_eq!(
        single(timeout).run(&CancellationToken::new()).await.unwrap(),
        Outcome::Failure
    );

    let kinds: Vec<EventKind> = recorder.snapshot().iter().map(|e| e.kind).collect();
    assert!(kinds.contains(&EventKind::MachineCancelled));
    assert_eq!(kinds.last(), Some(&EventKind::StatusChanged));
    assert_eq!(
        child_statuses(&recorder),
        vec![
            "Created->Starting",
            "Starting->Running",
            "Running->Cancelled",
            "Cancelled->Resetting",
            "Resetting->Ready",
        ]
    );
    assert_eq!(child.status(), ExecutionStatus::Ready);
}

#[tokio::test]
async fn external_cancellation_lets_nested_machine_settle() {
    let (child, recorder) = waiting_child();
    let timeout = TimeoutLogic::new(
        Arc::clone(&child),
        Duration::from_secs(5),
        TimeoutBehavior::Throw,
    )
    .unwrap();
    let machine = single(timeout);
    let token = CancellationToken::new();

    let canceller = async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        token.cancel();
    };
    let (result, ()) = tokio::join!(machine.run(&token), canceller);

    assert!(matches!(result, Err(FsmError::Cancelled)));
    assert!(
        recorder
            .snapshot()
            .iter()
            .any(|e| e.kind == EventKind::MachineCancelled)
    );
    assert!(child_statuses(&recorder).contains(&"Running->Cancelled".to_owned()));
    assert_eq!(child.status(), ExecutionStatus::Ready);
}

// ─────────────────────────────────────────────────────────────────────────────
// Delay
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn non_positive_delay_succeeds_immediately() {
    for millis in [0, -250] {
        let delay = DelayLogic::from_millis(millis);
        assert_eq!(delay.delay(), Duration::ZERO);
        assert_eq!(
            single(delay).run(&CancellationToken::new()).await.unwrap(),
            Outcome::Success
        );
    }
}

#[tokio::test]
async fn delay_elapses_then_chain_continues() {
    let tracker = Tracker::new();
    let mut builder = GraphBuilder::new();
    let wait = builder.add_node(DelayLogic::from_millis(15));
    builder.chain(&wait, track(&tracker, "after")).unwrap();
    let machine = StateMachine::new(builder.build().unwrap());

    let started = std::time::Instant::now();
    assert_eq!(
        machine.run(&CancellationToken::new()).await.unwrap(),
        Outcome::Success
    );
    assert!(started.elapsed() >= Duration::from_millis(15));
    assert_eq!(tracker.entries(), vec!["after"]);
}

#[tokio::test]
async fn bound_token_fails_the_wait() {
    let bound = CancellationToken::new();
    let machine = single(slow().with_token(bound.clone()));

    let canceller = async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        bound.cancel();
    };
    let run_token = CancellationToken::new();
    let (result, ()) = tokio::join!(machine.run(&run_token), canceller);

    assert_eq!(result.unwrap(), Outcome::Failure);
}

#[tokio::test]
async fn run_cancellation_interrupts_delay() {
    let machine = single(slow());
    let token = CancellationToken::new();

    let canceller = async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        token.cancel();
    };
    let (result, ()) = tokio::join!(machine.run(&token), canceller);

    assert!(matches!(result, Err(FsmError::Cancelled)));
}
