use serde::Deserialize;

use crate::{Error, Result};

/// Wire shape of a task-submission response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSubmit {
    pub status: Option<String>,
    pub task_id: Option<String>,
    pub analisis_id: Option<i64>,
    pub message: Option<String>,
    pub error: Option<String>,
}

/// Outcome of submitting a task.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Task queued; poll the returned id until it finishes.
    Accepted { task_id: String },
    /// Nothing to do, a previous run already produced a result.
    AlreadyExists { analysis_id: i64 },
}

impl RawSubmit {
    pub fn into_outcome(self) -> Result<SubmitOutcome> {
        match self.status.as_deref() {
            Some("ok") => {
                let task_id = self
                    .task_id
                    .ok_or_else(|| Error::Submission("accepted without a task id".to_string()))?;
                Ok(SubmitOutcome::Accepted { task_id })
            }
            Some("existe") => {
                let analysis_id = self.analisis_id.ok_or_else(|| {
                    Error::Submission("existing result without an id".to_string())
                })?;
                Ok(SubmitOutcome::AlreadyExists { analysis_id })
            }
            _ => {
                let message = self
                    .message
                    .or(self.error)
                    .unwrap_or_else(|| "unknown submission error".to_string());
                Err(Error::Submission(message))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(json: &str) -> Result<SubmitOutcome> {
        let raw: RawSubmit = serde_json::from_str(json).unwrap();
        raw.into_outcome()
    }

    #[test]
    fn accepted_with_task_id() {
        assert_eq!(
            outcome(r#"{"status": "ok", "task_id": "abc-123"}"#).unwrap(),
            SubmitOutcome::Accepted {
                task_id: "abc-123".to_string()
            }
        );
    }

    #[test]
    fn accepted_without_task_id_is_an_error() {
        assert!(outcome(r#"{"status": "ok"}"#).is_err());
    }

    #[test]
    fn existing_analysis_short_circuits() {
        assert_eq!(
            outcome(r#"{"status": "existe", "analisis_id": 7}"#).unwrap(),
            SubmitOutcome::AlreadyExists { analysis_id: 7 }
        );
    }

    #[test]
    fn rejection_surfaces_server_message() {
        let err = outcome(r#"{"status": "error", "message": "not allowed"}"#).unwrap_err();
        assert!(err.to_string().contains("not allowed"));
    }
}
