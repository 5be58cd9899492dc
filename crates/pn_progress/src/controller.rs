//! Busy-state controller: wraps a submit-then-poll flow and keeps the
//! triggering control and the overlay honest about it.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{info, warn};

use pn_core::{Error, StatusFetch, SubmitOutcome, TaskClient, TaskHandle, TaskSubmit};

use crate::clock::Clock;
use crate::notify::{NotificationKind, Notifier};
use crate::poller::{PollConfig, PollOutcome, ProgressEvent, ProgressObserver, TaskPoller};

/// Delay before the page reload that surfaces fresh server state.
pub const RELOAD_AFTER_SUCCESS: Duration = Duration::from_millis(1500);
/// Timeouts reload too, but give the user a moment to read the warning.
pub const RELOAD_AFTER_TIMEOUT: Duration = Duration::from_secs(3);

/// Lifecycle of one task run.
///
/// `Idle -> Submitting -> Polling -> {Succeeded, Failed, TimedOut}`,
/// with `Submitting -> Idle` on submission error. Every terminal state
/// restores the control except `Succeeded`, where the scheduled reload
/// supersedes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskPhase {
    Idle,
    Submitting,
    Polling,
    Succeeded,
    Failed,
    TimedOut,
}

/// UI command seam. Frontends parse the "(NN%)" suffix of overlay
/// messages for the progress-bar fill.
pub trait Frontend: Send + Sync {
    fn set_busy(&self, category: &str);
    fn restore(&self, category: &str);
    fn show_overlay(&self, message: &str);
    fn update_overlay(&self, message: &str);
    fn hide_overlay(&self);
    fn schedule_reload(&self, delay: Duration);
}

struct OverlayObserver {
    frontend: Arc<dyn Frontend>,
}

impl ProgressObserver for OverlayObserver {
    fn on_progress(&self, event: ProgressEvent) {
        self.frontend.update_overlay(&event.message);
    }
}

pub struct TaskController {
    submit: Arc<dyn TaskSubmit>,
    status: Arc<dyn StatusFetch>,
    frontend: Arc<dyn Frontend>,
    notifier: Notifier,
    clock: Arc<dyn Clock>,
    config: PollConfig,
    active: Mutex<HashSet<String>>,
}

impl TaskController {
    pub fn new(
        submit: Arc<dyn TaskSubmit>,
        status: Arc<dyn StatusFetch>,
        frontend: Arc<dyn Frontend>,
        notifier: Notifier,
        clock: Arc<dyn Clock>,
        config: PollConfig,
    ) -> Self {
        Self {
            submit,
            status,
            frontend,
            notifier,
            clock,
            config,
            active: Mutex::new(HashSet::new()),
        }
    }

    /// Build a controller from one client implementing both seams.
    pub fn with_client<C>(
        client: Arc<C>,
        frontend: Arc<dyn Frontend>,
        notifier: Notifier,
        clock: Arc<dyn Clock>,
        config: PollConfig,
    ) -> Self
    where
        C: TaskClient + 'static,
    {
        Self::new(
            client.clone(),
            client,
            frontend,
            notifier,
            clock,
            config,
        )
    }

    pub fn active_categories(&self) -> Vec<String> {
        let mut categories: Vec<_> = self.active.lock().unwrap().iter().cloned().collect();
        categories.sort();
        categories
    }

    /// Submit a task for `category` at `endpoint` and track it to a
    /// terminal phase. A duplicate invocation for a category that is
    /// still active is rejected before any network call.
    pub async fn run_task(&self, category: &str, endpoint: &str) -> TaskPhase {
        {
            let mut active = self.active.lock().unwrap();
            if !active.insert(category.to_string()) {
                warn!("rejected duplicate {} task", category);
                self.notifier.show(
                    format!("A {} task is already in progress", category),
                    NotificationKind::Warning,
                );
                return TaskPhase::Idle;
            }
        }

        let phase = self.execute(category, endpoint).await;

        self.active.lock().unwrap().remove(category);
        phase
    }

    async fn execute(&self, category: &str, endpoint: &str) -> TaskPhase {
        self.frontend.set_busy(category);
        self.frontend
            .show_overlay(&format!("Starting {}... (0%)", category));

        let task_id = match self.submit.submit(endpoint).await {
            Ok(SubmitOutcome::Accepted { task_id }) => task_id,
            Ok(SubmitOutcome::AlreadyExists { analysis_id }) => {
                info!("{} already analyzed, result {}", category, analysis_id);
                self.frontend.hide_overlay();
                self.frontend.restore(category);
                self.notifier.show(
                    format!("{} already has a result (analysis {})", category, analysis_id),
                    NotificationKind::Info,
                );
                return TaskPhase::Succeeded;
            }
            Err(e) => {
                warn!("{} submission failed: {}", category, e);
                self.frontend.hide_overlay();
                self.frontend.restore(category);
                self.notifier.show(
                    format!("{}: {}", submission_error_message(&e), category),
                    NotificationKind::Error,
                );
                return TaskPhase::Idle;
            }
        };

        let handle = TaskHandle::new(task_id, category);
        info!(
            "📡 {} task {} accepted at {}",
            category, handle.task_id, handle.started_at
        );
        self.notifier.show(
            format!("{} started...", category),
            NotificationKind::Info,
        );

        let poller = TaskPoller::new(self.status.clone(), self.clock.clone(), self.config);
        let observer = OverlayObserver {
            frontend: self.frontend.clone(),
        };
        let outcome = poller.run(&handle.task_id, category, &observer).await;

        match outcome {
            PollOutcome::Success { .. } => {
                self.frontend
                    .update_overlay(&format!("{} completed! Reloading... (100%)", category));
                self.notifier.show(
                    format!("{} completed!", category),
                    NotificationKind::Success,
                );
                self.frontend.schedule_reload(RELOAD_AFTER_SUCCESS);
                TaskPhase::Succeeded
            }
            PollOutcome::Failure { error } => {
                self.frontend.hide_overlay();
                self.frontend.restore(category);
                let message = error.unwrap_or_else(|| "unknown error".to_string());
                self.notifier.show(
                    format!("{} failed: {}", category, message),
                    NotificationKind::Error,
                );
                TaskPhase::Failed
            }
            PollOutcome::Timeout => {
                self.frontend.hide_overlay();
                self.frontend.restore(category);
                self.notifier.show(
                    format!("{} took too long; the page will reload", category),
                    NotificationKind::Warning,
                );
                self.frontend.schedule_reload(RELOAD_AFTER_TIMEOUT);
                TaskPhase::TimedOut
            }
        }
    }

    /// Page-unload analogue: drop UI busy state and pending
    /// notifications. No server-side cancellation is issued; an
    /// abandoned task keeps running on the backend.
    pub fn shutdown(&self) {
        let mut active = self.active.lock().unwrap();
        if !active.is_empty() {
            info!("shutting down with {} active task(s)", active.len());
        }
        active.clear();
        self.frontend.hide_overlay();
        self.notifier.clear_all();
    }
}

/// Map a submission error onto the user-facing taxonomy.
fn submission_error_message(error: &Error) -> String {
    match error {
        Error::Http(e) if e.is_connect() || e.is_timeout() => {
            "Connection error. Check your network".to_string()
        }
        Error::Http(e) if e.status().map(|s| s.as_u16()) == Some(403) => {
            "Permission error. Reload the page".to_string()
        }
        Error::Submission(message) if message.starts_with("non-JSON") => {
            "The server returned an invalid response".to_string()
        }
        Error::Submission(message) => message.clone(),
        other => other.to_string(),
    }
}
