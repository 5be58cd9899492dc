use async_trait::async_trait;

use crate::status::TaskState;
use crate::submit::SubmitOutcome;
use crate::Result;

/// Fetch the current status of a task.
#[async_trait]
pub trait StatusFetch: Send + Sync {
    /// One point-in-time status check, already normalized.
    async fn task_status(&self, task_id: &str) -> Result<TaskState>;
}

/// Submit a task to the portal.
#[async_trait]
pub trait TaskSubmit: Send + Sync {
    /// Issue the initiating request for `endpoint`.
    async fn submit(&self, endpoint: &str) -> Result<SubmitOutcome>;
}

/// Combined client seam used by the busy-state controller.
pub trait TaskClient: StatusFetch + TaskSubmit {}

impl<T: StatusFetch + TaskSubmit> TaskClient for T {}
