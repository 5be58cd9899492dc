use std::sync::Arc;
use std::time::Duration;

use pn_core::{ProgressInfo, TaskState};
use pn_progress::test_utils::{ManualClock, RecordingObserver, ScriptedStatus, StatusStep};
use pn_progress::{PollConfig, PollOutcome, TaskPoller};

fn running(current: f64) -> TaskState {
    TaskState::Running(ProgressInfo {
        current: Some(current),
        ..Default::default()
    })
}

fn succeeded() -> TaskState {
    TaskState::Succeeded { result: None }
}

fn poller(fetch: Arc<ScriptedStatus>, max_attempts: u32) -> (TaskPoller, Arc<ManualClock>) {
    let clock = ManualClock::new();
    let config = PollConfig::default().with_max_attempts(max_attempts);
    (TaskPoller::new(fetch, clock.clone(), config), clock)
}

#[tokio::test]
async fn success_sequence_terminates_with_success() {
    let fetch = Arc::new(ScriptedStatus::states(vec![
        TaskState::Pending,
        running(10.0),
        running(50.0),
        succeeded(),
    ]));
    let (poller, clock) = poller(fetch.clone(), 60);
    let observer = RecordingObserver::default();

    let outcome = poller.run("task-1", "tech scraping", &observer).await;

    assert_eq!(outcome, PollOutcome::Success { result: None });
    // One sleep per non-terminal snapshot; the terminal one returns
    // without scheduling another poll.
    assert_eq!(clock.sleeps().len(), 3);
    assert_eq!(fetch.calls(), 4);

    let percents: Vec<u8> = observer.events().iter().map(|e| e.percent).collect();
    assert_eq!(percents, vec![2, 10, 50]);
}

#[tokio::test]
async fn explicit_progress_shows_up_in_messages() {
    let fetch = Arc::new(ScriptedStatus::states(vec![running(42.0), succeeded()]));
    let (poller, _clock) = poller(fetch, 60);
    let observer = RecordingObserver::default();

    poller.run("task-1", "analysis", &observer).await;

    let events = observer.events();
    assert_eq!(events.len(), 1);
    assert!(events[0].message.contains("(42%)"), "{}", events[0].message);
}

#[tokio::test]
async fn failure_snapshot_carries_the_server_error() {
    let fetch = Arc::new(ScriptedStatus::states(vec![
        TaskState::Pending,
        TaskState::Failed {
            error: Some("boom".to_string()),
        },
    ]));
    let (poller, _clock) = poller(fetch, 60);
    let observer = RecordingObserver::default();

    let outcome = poller.run("task-1", "analysis", &observer).await;
    assert_eq!(
        outcome,
        PollOutcome::Failure {
            error: Some("boom".to_string())
        }
    );
}

#[tokio::test]
async fn last_chance_check_turns_a_timeout_into_success() {
    // Pending for every scheduled attempt; the out-of-band final check
    // sees the completion.
    let mut steps: Vec<StatusStep> = (0..5).map(|_| StatusStep::State(TaskState::Pending)).collect();
    steps.push(StatusStep::State(succeeded()));
    let fetch = Arc::new(ScriptedStatus::new(steps));
    let (poller, _clock) = poller(fetch.clone(), 5);
    let observer = RecordingObserver::default();

    let outcome = poller.run("task-1", "scraping", &observer).await;

    assert_eq!(outcome, PollOutcome::Success { result: None });
    assert_eq!(fetch.calls(), 6);
}

#[tokio::test]
async fn exhausted_attempts_without_completion_time_out() {
    let fetch = Arc::new(ScriptedStatus::states(vec![TaskState::Pending]));
    let (poller, clock) = poller(fetch.clone(), 4);
    let observer = RecordingObserver::default();

    let outcome = poller.run("task-1", "scraping", &observer).await;

    assert_eq!(outcome, PollOutcome::Timeout);
    // 4 scheduled polls plus the final check.
    assert_eq!(fetch.calls(), 5);
    assert_eq!(clock.sleeps().len(), 4);
}

#[tokio::test]
async fn transient_fetch_errors_degrade_but_do_not_abort() {
    let fetch = Arc::new(ScriptedStatus::new(vec![
        StatusStep::Error("connection reset".to_string()),
        StatusStep::Error("connection reset".to_string()),
        StatusStep::State(succeeded()),
    ]));
    let (poller, _clock) = poller(fetch, 60);
    let observer = RecordingObserver::default();

    let outcome = poller.run("task-1", "scraping", &observer).await;

    assert_eq!(outcome, PollOutcome::Success { result: None });
    let events = observer.events();
    assert_eq!(events.len(), 2);
    for event in &events {
        assert!(event.message.contains("reconnecting"), "{}", event.message);
    }
}

#[tokio::test]
async fn long_queue_wait_mentions_the_worker() {
    let fetch = Arc::new(ScriptedStatus::states(vec![TaskState::Pending]));
    let (poller, _clock) = poller(fetch, 15);
    let observer = RecordingObserver::default();

    poller.run("task-1", "scraping", &observer).await;

    let late_events: Vec<_> = observer
        .events()
        .into_iter()
        .filter(|e| e.attempt > 10)
        .collect();
    assert!(!late_events.is_empty());
    for event in late_events {
        assert!(
            event.message.contains("waiting for a worker"),
            "{}",
            event.message
        );
    }
}

#[tokio::test]
async fn polling_interval_is_respected() {
    let fetch = Arc::new(ScriptedStatus::states(vec![TaskState::Pending, succeeded()]));
    let clock = ManualClock::new();
    let config = PollConfig::default()
        .with_max_attempts(10)
        .with_interval(Duration::from_millis(500));
    let poller = TaskPoller::new(fetch, clock.clone(), config);
    let observer = RecordingObserver::default();

    poller.run("task-1", "analysis", &observer).await;

    assert_eq!(clock.sleeps(), vec![Duration::from_millis(500)]);
}
