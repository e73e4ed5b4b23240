use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::domain::{Application, ApplicationId, JobSummary};
use super::status::PipelineStage;

/// Body of a status change request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub status: PipelineStage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl StatusUpdate {
    pub fn to(status: PipelineStage) -> Self {
        Self { status, note: None }
    }

    pub fn with_note(mut self, note: Option<String>) -> Self {
        self.note = note.filter(|note| !note.trim().is_empty());
        self
    }
}

/// REST operations the pipeline consumes from the backend of record.
///
/// Status and note updates resolve to `Ok(None)` when the backend acknowledged the write
/// without echoing the record back.
#[async_trait]
pub trait PipelineBackend: Send + Sync {
    async fn list_applications(&self) -> Result<Vec<Application>, BackendError>;

    async fn update_status(
        &self,
        id: &ApplicationId,
        update: StatusUpdate,
    ) -> Result<Option<Application>, BackendError>;

    async fn list_jobs(&self) -> Result<Vec<JobSummary>, BackendError>;

    async fn update_notes(
        &self,
        id: &ApplicationId,
        notes: &str,
    ) -> Result<Option<Application>, BackendError>;

    async fn notify_candidate(&self, id: &ApplicationId, message: &str)
        -> Result<(), BackendError>;
}

/// Any failed backend call. Callers treat every variant as "operation failed".
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    #[error("backend unreachable: {0}")]
    Transport(String),
    #[error("backend rejected the request (status {status})")]
    Rejected {
        status: u16,
        message: Option<String>,
    },
    #[error("backend response could not be decoded: {0}")]
    Decode(String),
}

impl BackendError {
    /// Text suitable for a notification, preferring the backend's own message.
    pub fn user_message(&self) -> String {
        match self {
            BackendError::Rejected {
                message: Some(message),
                ..
            } => message.clone(),
            BackendError::Rejected {
                status,
                message: None,
            } => format!("request failed with status {status}"),
            BackendError::Transport(_) => "the hiring backend could not be reached".to_string(),
            BackendError::Decode(_) => "the hiring backend sent an unexpected response".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_update_omits_blank_notes() {
        let update = StatusUpdate::to(PipelineStage::Rejected).with_note(Some("  ".to_string()));
        let body = serde_json::to_value(&update).expect("serializes");
        assert_eq!(body, serde_json::json!({ "status": "rejected" }));
    }

    #[test]
    fn user_message_prefers_backend_text() {
        let rejected = BackendError::Rejected {
            status: 422,
            message: Some("Cannot hire without an interview".to_string()),
        };
        assert_eq!(rejected.user_message(), "Cannot hire without an interview");

        let bare = BackendError::Rejected {
            status: 500,
            message: None,
        };
        assert_eq!(bare.user_message(), "request failed with status 500");
    }
}
