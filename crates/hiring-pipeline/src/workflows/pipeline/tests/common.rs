use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::http::StatusCode;
use axum::response::Response;
use chrono::{TimeZone, Utc};
use serde_json::Value;
use tokio::sync::{oneshot, Notify};

use crate::workflows::pipeline::{
    Application, ApplicationId, BackendError, CandidateIdentity, JobId, JobSummary,
    PipelineBackend, PipelineService, PipelineSettings, PipelineStage, StageValue, StatusUpdate,
};

pub(super) fn application(id: &str, name: &str, job: &str, status: &str) -> Application {
    Application {
        id: ApplicationId::new(id),
        candidate: CandidateIdentity {
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase().replace(' ', ".")),
            phone: None,
            location: Some("Lisbon".to_string()),
        },
        job_id: JobId::new(job),
        job_title: match job {
            "job-backend" => "Backend Engineer".to_string(),
            "job-design" => "Product Designer".to_string(),
            other => other.to_string(),
        },
        status: StageValue::from(status.to_string()),
        applied_at: Utc
            .with_ymd_and_hms(2026, 9, 1, 9, 30, 0)
            .single()
            .expect("valid timestamp"),
        expected_salary: Some(95_000),
        rating: Some(4),
        employer_notes: None,
        interview_scheduled_at: None,
    }
}

pub(super) fn jobs() -> Vec<JobSummary> {
    vec![
        JobSummary {
            id: JobId::new("job-backend"),
            title: "Backend Engineer".to_string(),
        },
        JobSummary {
            id: JobId::new("job-design"),
            title: "Product Designer".to_string(),
        },
    ]
}

/// `[pending, pending, reviewing, hired]`.
pub(super) fn sample_applications() -> Vec<Application> {
    vec![
        application("app-1", "Ana Lima", "job-backend", "pending"),
        application("app-2", "Bruno Costa", "job-design", "pending"),
        application("app-3", "Carla Dias", "job-backend", "reviewing"),
        application("app-4", "Diego Alves", "job-design", "hired"),
    ]
}

/// Five cards for bulk scenarios, all in reviewing.
pub(super) fn reviewing_batch() -> Vec<Application> {
    (1..=5)
        .map(|index| {
            application(
                &format!("app-{index}"),
                &format!("Candidate {index}"),
                "job-backend",
                "reviewing",
            )
        })
        .collect()
}

pub(super) fn id(value: &str) -> ApplicationId {
    ApplicationId::new(value)
}

pub(super) fn server_error() -> BackendError {
    BackendError::Rejected {
        status: 500,
        message: Some("Internal Server Error".to_string()),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum BackendCall {
    ListApplications,
    ListJobs,
    UpdateStatus {
        id: ApplicationId,
        update: StatusUpdate,
    },
    UpdateNotes {
        id: ApplicationId,
        notes: String,
    },
    Notify {
        id: ApplicationId,
        message: String,
    },
}

#[derive(Default)]
struct Script {
    applications: Vec<Application>,
    jobs: Vec<JobSummary>,
    failing: HashMap<ApplicationId, BackendError>,
    listing_error: Option<BackendError>,
    jobs_error: Option<BackendError>,
    calls: Vec<BackendCall>,
    list_gate: Option<oneshot::Receiver<()>>,
    update_gate: Option<oneshot::Receiver<()>>,
}

/// In-memory backend that records every call and fails the ids it is told to.
///
/// A gate installed with `hold_next_list`/`hold_next_update` parks the next matching call
/// after it has been recorded; `entered` fires once the call is parked.
#[derive(Default)]
pub(super) struct ScriptedBackend {
    script: Mutex<Script>,
    entered: Notify,
}

impl ScriptedBackend {
    pub(super) fn new(applications: Vec<Application>) -> Self {
        let backend = Self::default();
        {
            let mut script = backend.script();
            script.applications = applications;
            script.jobs = jobs();
        }
        backend
    }

    fn script(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().expect("script mutex poisoned")
    }

    pub(super) fn fail_for(&self, id: &str, error: BackendError) {
        self.script().failing.insert(ApplicationId::new(id), error);
    }

    pub(super) fn fail_listing(&self, error: Option<BackendError>) {
        self.script().listing_error = error;
    }

    pub(super) fn fail_jobs(&self, error: Option<BackendError>) {
        self.script().jobs_error = error;
    }

    pub(super) fn set_applications(&self, applications: Vec<Application>) {
        self.script().applications = applications;
    }

    pub(super) fn set_stored_stage(&self, id: &str, stage: PipelineStage) {
        let mut script = self.script();
        if let Some(record) = script
            .applications
            .iter_mut()
            .find(|application| application.id.as_str() == id)
        {
            record.status = StageValue::Known(stage);
        }
    }

    pub(super) fn hold_next_list(&self) -> oneshot::Sender<()> {
        let (sender, receiver) = oneshot::channel();
        self.script().list_gate = Some(receiver);
        sender
    }

    pub(super) fn hold_next_update(&self) -> oneshot::Sender<()> {
        let (sender, receiver) = oneshot::channel();
        self.script().update_gate = Some(receiver);
        sender
    }

    pub(super) async fn wait_until_parked(&self) {
        self.entered.notified().await;
    }

    pub(super) fn calls(&self) -> Vec<BackendCall> {
        self.script().calls.clone()
    }

    pub(super) fn clear_calls(&self) {
        self.script().calls.clear();
    }

    pub(super) fn status_updates(&self) -> Vec<(ApplicationId, StatusUpdate)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                BackendCall::UpdateStatus { id, update } => Some((id, update)),
                _ => None,
            })
            .collect()
    }

    async fn pass_gate(&self, gate: Option<oneshot::Receiver<()>>) {
        if let Some(gate) = gate {
            self.entered.notify_one();
            let _ = gate.await;
        }
    }
}

#[async_trait]
impl PipelineBackend for ScriptedBackend {
    async fn list_applications(&self) -> Result<Vec<Application>, BackendError> {
        let (snapshot, gate) = {
            let mut script = self.script();
            script.calls.push(BackendCall::ListApplications);
            let snapshot = match &script.listing_error {
                Some(error) => Err(error.clone()),
                None => Ok(script.applications.clone()),
            };
            (snapshot, script.list_gate.take())
        };
        self.pass_gate(gate).await;
        snapshot
    }

    async fn update_status(
        &self,
        id: &ApplicationId,
        update: StatusUpdate,
    ) -> Result<Option<Application>, BackendError> {
        let gate = {
            let mut script = self.script();
            script.calls.push(BackendCall::UpdateStatus {
                id: id.clone(),
                update: update.clone(),
            });
            script.update_gate.take()
        };
        self.pass_gate(gate).await;

        let mut script = self.script();
        if let Some(error) = script.failing.get(id) {
            return Err(error.clone());
        }
        let record = script
            .applications
            .iter_mut()
            .find(|application| application.id == *id)
            .ok_or(BackendError::Rejected {
                status: 404,
                message: Some("Application not found".to_string()),
            })?;
        record.status = StageValue::Known(update.status);
        Ok(Some(record.clone()))
    }

    async fn list_jobs(&self) -> Result<Vec<JobSummary>, BackendError> {
        let mut script = self.script();
        script.calls.push(BackendCall::ListJobs);
        match &script.jobs_error {
            Some(error) => Err(error.clone()),
            None => Ok(script.jobs.clone()),
        }
    }

    async fn update_notes(
        &self,
        id: &ApplicationId,
        notes: &str,
    ) -> Result<Option<Application>, BackendError> {
        let mut script = self.script();
        script.calls.push(BackendCall::UpdateNotes {
            id: id.clone(),
            notes: notes.to_string(),
        });
        if let Some(error) = script.failing.get(id) {
            return Err(error.clone());
        }
        Ok(script
            .applications
            .iter_mut()
            .find(|application| application.id == *id)
            .map(|record| {
                record.employer_notes = Some(notes.to_string()).filter(|text| !text.is_empty());
                record.clone()
            }))
    }

    async fn notify_candidate(&self, id: &ApplicationId, message: &str) -> Result<(), BackendError> {
        let mut script = self.script();
        script.calls.push(BackendCall::Notify {
            id: id.clone(),
            message: message.to_string(),
        });
        match script.failing.get(id) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

pub(super) fn build_service(
    applications: Vec<Application>,
) -> (Arc<PipelineService<ScriptedBackend>>, Arc<ScriptedBackend>) {
    build_service_with(applications, PipelineSettings::default())
}

pub(super) fn build_service_with(
    applications: Vec<Application>,
    settings: PipelineSettings,
) -> (Arc<PipelineService<ScriptedBackend>>, Arc<ScriptedBackend>) {
    let backend = Arc::new(ScriptedBackend::new(applications));
    let service = Arc::new(PipelineService::new(Arc::clone(&backend), settings));
    (service, backend)
}

/// Builds a service and performs the initial load, clearing the call log afterwards.
pub(super) async fn loaded_service(
    applications: Vec<Application>,
) -> (Arc<PipelineService<ScriptedBackend>>, Arc<ScriptedBackend>) {
    let (service, backend) = build_service(applications);
    service.refresh().await.expect("initial refresh");
    backend.clear_calls();
    (service, backend)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) fn assert_status(response: &Response, expected: StatusCode) {
    assert_eq!(response.status(), expected);
}
