use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::backend::{BackendError, PipelineBackend, StatusUpdate};
use super::domain::ApplicationId;
use super::status::PipelineStage;

/// One action applied independently to every selected application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BulkAction {
    MoveTo {
        stage: PipelineStage,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        note: Option<String>,
    },
    Reject {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        note: Option<String>,
    },
    Notify {
        message: String,
    },
}

impl BulkAction {
    pub fn describe(&self) -> String {
        match self {
            BulkAction::MoveTo { stage, .. } => format!("move to {}", stage.label()),
            BulkAction::Reject { .. } => "reject".to_string(),
            BulkAction::Notify { .. } => "notify".to_string(),
        }
    }

    /// Issues the single backend call for one selected application.
    pub async fn dispatch<B>(&self, backend: &B, id: &ApplicationId) -> Result<(), BackendError>
    where
        B: PipelineBackend + ?Sized,
    {
        match self {
            BulkAction::MoveTo { stage, note } => backend
                .update_status(id, StatusUpdate::to(*stage).with_note(note.clone()))
                .await
                .map(|_| ()),
            BulkAction::Reject { note } => backend
                .update_status(
                    id,
                    StatusUpdate::to(PipelineStage::Rejected).with_note(note.clone()),
                )
                .await
                .map(|_| ()),
            BulkAction::Notify { message } => backend.notify_candidate(id, message).await,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkFailure {
    pub application_id: ApplicationId,
    pub reason: String,
}

/// Per-item result of a bulk action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkReport {
    pub action: BulkAction,
    pub succeeded: Vec<ApplicationId>,
    pub failed: Vec<BulkFailure>,
    /// Whether the board was reloaded from the backend afterwards.
    pub refreshed: bool,
}

impl BulkReport {
    pub fn empty(action: BulkAction) -> Self {
        Self {
            action,
            succeeded: Vec::new(),
            failed: Vec::new(),
            refreshed: false,
        }
    }

    pub fn attempted(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attempted() == 0
    }

    pub fn summary(&self) -> String {
        let action = self.action.describe();
        if self.failed.is_empty() {
            format!("{action}: {} applications updated", self.succeeded.len())
        } else {
            format!(
                "{action}: {} of {} applications updated, {} failed",
                self.succeeded.len(),
                self.attempted(),
                self.failed.len()
            )
        }
    }
}

/// Runs `action` against each id in order. Failures never stop the remaining items.
pub async fn execute<B>(
    backend: &B,
    action: &BulkAction,
    ids: &[ApplicationId],
) -> (Vec<ApplicationId>, Vec<BulkFailure>)
where
    B: PipelineBackend + ?Sized,
{
    let mut succeeded = Vec::with_capacity(ids.len());
    let mut failed = Vec::new();

    for id in ids {
        match action.dispatch(backend, id).await {
            Ok(()) => {
                debug!(application_id = id.as_str(), "bulk item applied");
                succeeded.push(id.clone());
            }
            Err(error) => {
                warn!(application_id = id.as_str(), %error, "bulk item failed");
                failed.push(BulkFailure {
                    application_id: id.clone(),
                    reason: error.user_message(),
                });
            }
        }
    }

    (succeeded, failed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn actions_decode_from_tagged_json() {
        let action: BulkAction =
            serde_json::from_value(json!({ "type": "move_to", "stage": "interview" }))
                .expect("decodes");
        assert_eq!(
            action,
            BulkAction::MoveTo {
                stage: PipelineStage::Interview,
                note: None,
            }
        );

        let reject: BulkAction =
            serde_json::from_value(json!({ "type": "reject", "note": "Role filled" }))
                .expect("decodes");
        assert_eq!(reject.describe(), "reject");
    }

    #[test]
    fn summary_mentions_failures() {
        let report = BulkReport {
            action: BulkAction::Reject { note: None },
            succeeded: vec![ApplicationId::new("a"), ApplicationId::new("b")],
            failed: vec![BulkFailure {
                application_id: ApplicationId::new("c"),
                reason: "request failed with status 500".to_string(),
            }],
            refreshed: true,
        };
        assert_eq!(report.summary(), "reject: 2 of 3 applications updated, 1 failed");
    }
}
