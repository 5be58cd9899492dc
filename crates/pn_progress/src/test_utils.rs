//! Shared mocks for unit and integration tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use pn_core::{Error, Result, StatusFetch, SubmitOutcome, TaskState, TaskSubmit};

use crate::clock::Clock;
use crate::controller::Frontend;
use crate::notify::{Notification, NotificationKind, NotificationSink};
use crate::poller::{ProgressEvent, ProgressObserver};

/// Records requested sleeps and returns immediately.
#[derive(Debug, Default)]
pub struct ManualClock {
    slept: Mutex<Vec<Duration>>,
    total_ms: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.slept.lock().unwrap().clone()
    }

    pub fn total_slept(&self) -> Duration {
        Duration::from_millis(self.total_ms.load(Ordering::SeqCst))
    }
}

#[async_trait]
impl Clock for ManualClock {
    async fn sleep(&self, duration: Duration) {
        self.slept.lock().unwrap().push(duration);
        self.total_ms
            .fetch_add(duration.as_millis() as u64, Ordering::SeqCst);
        tokio::task::yield_now().await;
    }
}

/// Notification sink that records render/remove calls.
#[derive(Debug, Default)]
pub struct RecordingSink {
    rendered: Mutex<Vec<String>>,
    kinds: Mutex<Vec<NotificationKind>>,
    removed: Mutex<Vec<u64>>,
}

impl RecordingSink {
    pub fn rendered(&self) -> Vec<String> {
        self.rendered.lock().unwrap().clone()
    }

    pub fn kinds(&self) -> Vec<NotificationKind> {
        self.kinds.lock().unwrap().clone()
    }

    pub fn removed(&self) -> Vec<u64> {
        self.removed.lock().unwrap().clone()
    }
}

impl NotificationSink for RecordingSink {
    fn render(&self, notification: &Notification) {
        self.rendered
            .lock()
            .unwrap()
            .push(notification.message.clone());
        self.kinds.lock().unwrap().push(notification.kind);
    }

    fn remove(&self, id: u64) {
        self.removed.lock().unwrap().push(id);
    }
}

/// Observer that records every progress event.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl ProgressObserver for RecordingObserver {
    fn on_progress(&self, event: ProgressEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// A scripted status step: a normalized state or a transient error.
pub enum StatusStep {
    State(TaskState),
    Error(String),
}

/// StatusFetch mock that replays a script, then repeats its final
/// state (or `Pending` for an empty script).
pub struct ScriptedStatus {
    script: Mutex<VecDeque<StatusStep>>,
    last: Mutex<TaskState>,
    calls: AtomicU32,
}

impl ScriptedStatus {
    pub fn new(steps: Vec<StatusStep>) -> Self {
        Self {
            script: Mutex::new(steps.into()),
            last: Mutex::new(TaskState::Pending),
            calls: AtomicU32::new(0),
        }
    }

    pub fn states(states: Vec<TaskState>) -> Self {
        Self::new(states.into_iter().map(StatusStep::State).collect())
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StatusFetch for ScriptedStatus {
    async fn task_status(&self, _task_id: &str) -> Result<TaskState> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let step = self.script.lock().unwrap().pop_front();
        match step {
            Some(StatusStep::State(state)) => {
                *self.last.lock().unwrap() = state.clone();
                Ok(state)
            }
            Some(StatusStep::Error(message)) => Err(Error::Task(message)),
            None => Ok(self.last.lock().unwrap().clone()),
        }
    }
}

/// Combined submit + status mock for controller tests.
pub struct ScriptedClient {
    submissions: Mutex<VecDeque<Result<SubmitOutcome>>>,
    submit_calls: AtomicU32,
    pub status: ScriptedStatus,
}

impl ScriptedClient {
    pub fn new(submissions: Vec<Result<SubmitOutcome>>, status: ScriptedStatus) -> Self {
        Self {
            submissions: Mutex::new(submissions.into()),
            submit_calls: AtomicU32::new(0),
            status,
        }
    }

    pub fn accepting(task_id: &str, status: ScriptedStatus) -> Self {
        Self::new(
            vec![Ok(SubmitOutcome::Accepted {
                task_id: task_id.to_string(),
            })],
            status,
        )
    }

    pub fn submit_calls(&self) -> u32 {
        self.submit_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TaskSubmit for ScriptedClient {
    async fn submit(&self, _endpoint: &str) -> Result<SubmitOutcome> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        self.submissions
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Error::Submission("script exhausted".to_string())))
    }
}

#[async_trait]
impl StatusFetch for ScriptedClient {
    async fn task_status(&self, task_id: &str) -> Result<TaskState> {
        self.status.task_status(task_id).await
    }
}

/// Every UI command a controller can issue, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum FrontendCall {
    SetBusy(String),
    Restore(String),
    ShowOverlay(String),
    UpdateOverlay(String),
    HideOverlay,
    ScheduleReload(Duration),
}

#[derive(Debug, Default)]
pub struct RecordingFrontend {
    calls: Mutex<Vec<FrontendCall>>,
}

impl RecordingFrontend {
    pub fn calls(&self) -> Vec<FrontendCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn reloads(&self) -> Vec<Duration> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                FrontendCall::ScheduleReload(delay) => Some(delay),
                _ => None,
            })
            .collect()
    }

    pub fn restored(&self, category: &str) -> bool {
        self.calls()
            .iter()
            .any(|c| matches!(c, FrontendCall::Restore(cat) if cat == category))
    }
}

impl Frontend for RecordingFrontend {
    fn set_busy(&self, category: &str) {
        self.calls
            .lock()
            .unwrap()
            .push(FrontendCall::SetBusy(category.to_string()));
    }

    fn restore(&self, category: &str) {
        self.calls
            .lock()
            .unwrap()
            .push(FrontendCall::Restore(category.to_string()));
    }

    fn show_overlay(&self, message: &str) {
        self.calls
            .lock()
            .unwrap()
            .push(FrontendCall::ShowOverlay(message.to_string()));
    }

    fn update_overlay(&self, message: &str) {
        self.calls
            .lock()
            .unwrap()
            .push(FrontendCall::UpdateOverlay(message.to_string()));
    }

    fn hide_overlay(&self) {
        self.calls.lock().unwrap().push(FrontendCall::HideOverlay);
    }

    fn schedule_reload(&self, delay: Duration) {
        self.calls
            .lock()
            .unwrap()
            .push(FrontendCall::ScheduleReload(delay));
    }
}
