use serde::{Deserialize, Serialize};

/// Wire shape of a task-status response.
///
/// The backend signals the same concepts through several optional
/// fields (`completed` vs `status == "SUCCESS"`, `failed` vs
/// `status == "FAILURE"`), so everything here is optional and the
/// shape is normalized into [`TaskState`] exactly once at the boundary.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawStatus {
    pub status: Option<String>,
    pub completed: Option<bool>,
    pub success: Option<bool>,
    pub failed: Option<bool>,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
    pub progress: Option<RawProgress>,
    pub task_id: Option<String>,
    /// Analysis flows report their result id under this name instead
    /// of `result`.
    pub analisis_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawProgress {
    pub current: Option<f64>,
    pub total: Option<f64>,
    pub articles_processed: Option<u64>,
    pub total_articles_found: Option<u64>,
    #[serde(rename = "status")]
    pub message: Option<String>,
}

/// Progress payload carried by a non-terminal snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressInfo {
    pub current: Option<f64>,
    pub total: Option<f64>,
    pub articles_processed: Option<u64>,
    pub total_articles_found: Option<u64>,
    pub message: Option<String>,
}

impl From<RawProgress> for ProgressInfo {
    fn from(raw: RawProgress) -> Self {
        Self {
            current: raw.current,
            total: raw.total,
            articles_processed: raw.articles_processed,
            total_articles_found: raw.total_articles_found,
            message: raw.message,
        }
    }
}

/// Normalized task status.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskState {
    /// Queued, no worker picked it up yet.
    Pending,
    /// A worker accepted the task but reported no progress yet.
    Started,
    /// Task is executing; may carry progress details.
    Running(ProgressInfo),
    Succeeded { result: Option<serde_json::Value> },
    Failed { error: Option<String> },
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Succeeded { .. } | TaskState::Failed { .. })
    }

    pub fn progress(&self) -> Option<&ProgressInfo> {
        match self {
            TaskState::Running(info) => Some(info),
            _ => None,
        }
    }
}

impl From<RawStatus> for TaskState {
    fn from(raw: RawStatus) -> Self {
        let status = raw.status.as_deref().unwrap_or("");

        let failed = raw.failed.unwrap_or(false)
            || status == "FAILURE"
            || (raw.completed.unwrap_or(false) && raw.success == Some(false));
        if failed {
            let error = raw.error.or_else(|| {
                raw.result.as_ref().map(|v| match v {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
            });
            return TaskState::Failed { error };
        }

        if status == "SUCCESS" || raw.completed.unwrap_or(false) {
            let result = raw
                .result
                .or_else(|| raw.analisis_id.map(serde_json::Value::from));
            return TaskState::Succeeded { result };
        }

        match status {
            "PROGRESS" => {
                TaskState::Running(raw.progress.map(ProgressInfo::from).unwrap_or_default())
            }
            "STARTED" => TaskState::Started,
            _ => TaskState::Pending,
        }
    }
}
