pub mod error;
pub mod status;
pub mod submit;
pub mod tasks;

pub use error::Error;
pub use status::{ProgressInfo, RawProgress, RawStatus, TaskState};
pub use submit::SubmitOutcome;
pub use tasks::{StatusFetch, TaskClient, TaskSubmit};

pub type Result<T> = std::result::Result<T, Error>;

/// Handle for a server-side task accepted for execution.
///
/// Created when an initiating request succeeds; dropped once the poller
/// reaches a terminal state or gives up.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TaskHandle {
    pub task_id: String,
    pub category: String,
    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl TaskHandle {
    pub fn new(task_id: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            category: category.into(),
            started_at: chrono::Utc::now(),
        }
    }
}
