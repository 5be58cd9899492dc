//! Unified task poller.
//!
//! One parametrized loop covers both task families (scraping and
//! analysis); call sites only differ in their [`PollConfig`]. Each
//! status check is awaited before the next is scheduled, so snapshots
//! are processed strictly in request order.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};

use pn_core::{StatusFetch, TaskState};

use crate::clock::Clock;
use crate::progress::{derive_percent, fallback_percent, status_message};

/// Polling cadence and bound for one call site.
#[derive(Debug, Clone, Copy)]
pub struct PollConfig {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            max_attempts: 60,
        }
    }
}

impl PollConfig {
    /// Scraping runs navigate whole sections; give them 18 minutes.
    pub fn scraping() -> Self {
        Self {
            max_attempts: 540,
            ..Self::default()
        }
    }

    /// Single-article analysis finishes within a couple of minutes.
    pub fn analysis() -> Self {
        Self {
            max_attempts: 60,
            ..Self::default()
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }
}

/// One progress update pushed to the observer.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEvent {
    pub percent: u8,
    pub message: String,
    pub attempt: u32,
}

pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, event: ProgressEvent);
}

/// How a polling run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Success { result: Option<serde_json::Value> },
    Failure { error: Option<String> },
    Timeout,
}

pub struct TaskPoller {
    fetch: Arc<dyn StatusFetch>,
    clock: Arc<dyn Clock>,
    config: PollConfig,
}

impl TaskPoller {
    pub fn new(fetch: Arc<dyn StatusFetch>, clock: Arc<dyn Clock>, config: PollConfig) -> Self {
        Self {
            fetch,
            clock,
            config,
        }
    }

    /// Poll `task_id` until it reaches a terminal state or the attempt
    /// budget runs out.
    ///
    /// Transient fetch errors never abort the loop; they degrade to a
    /// time-based progress estimate. After the budget is exhausted one
    /// final out-of-band check runs, so a task that completed at the
    /// last moment is still reported as terminal rather than timed out.
    pub async fn run(
        &self,
        task_id: &str,
        category: &str,
        observer: &dyn ProgressObserver,
    ) -> PollOutcome {
        let max = self.config.max_attempts;
        let mut last_percent: i32 = 0;
        let mut last_state: Option<TaskState> = None;

        for attempt in 1..=max {
            match self.fetch.task_status(task_id).await {
                Ok(state) => {
                    if last_state.as_ref() != Some(&state) {
                        debug!("task {} state: {:?} -> {:?}", task_id, last_state, state);
                        last_state = Some(state.clone());
                    }

                    match state {
                        TaskState::Succeeded { result } => {
                            return PollOutcome::Success { result };
                        }
                        TaskState::Failed { error } => {
                            return PollOutcome::Failure { error };
                        }
                        state => {
                            let percent = derive_percent(attempt, max, &state);
                            if (percent as i32 - last_percent).abs() > 1 || attempt % 3 == 0 {
                                let mut message = status_message(&state, category, percent);
                                if state == TaskState::Pending && attempt > 10 {
                                    message.push_str(" - waiting for a worker");
                                }
                                observer.on_progress(ProgressEvent {
                                    percent,
                                    message,
                                    attempt,
                                });
                                last_percent = percent as i32;
                            }
                        }
                    }
                }
                Err(e) => {
                    warn!("status check {} for task {} failed: {}", attempt, task_id, e);
                    let percent = fallback_percent(attempt, max);
                    observer.on_progress(ProgressEvent {
                        percent,
                        message: format!(
                            "{} in progress... ({}%) - reconnecting",
                            category, percent
                        ),
                        attempt,
                    });
                    last_percent = percent as i32;
                }
            }

            self.clock.sleep(self.config.interval).await;
        }

        // Last-chance check: a slow task may have finished between the
        // final scheduled poll and now.
        match self.fetch.task_status(task_id).await {
            Ok(TaskState::Succeeded { result }) => PollOutcome::Success { result },
            Ok(TaskState::Failed { error }) => PollOutcome::Failure { error },
            Ok(_) => PollOutcome::Timeout,
            Err(e) => {
                warn!("final status check for task {} failed: {}", task_id, e);
                PollOutcome::Timeout
            }
        }
    }
}
