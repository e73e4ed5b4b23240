use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use hiring_pipeline::workflows::pipeline::{
    Application, ApplicationId, BackendError, CandidateIdentity, JobId, JobSummary,
    PipelineBackend, StageValue, StatusUpdate,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashSet;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default)]
struct Store {
    applications: Vec<Application>,
    jobs: Vec<JobSummary>,
    failing: HashSet<ApplicationId>,
    notified: Vec<(ApplicationId, String)>,
}

/// Backend double used by the demo command: writes land in memory, listed ids fail with 500.
#[derive(Default, Clone)]
pub(crate) struct InMemoryPipelineBackend {
    store: Arc<Mutex<Store>>,
}

impl InMemoryPipelineBackend {
    pub(crate) fn seeded(failing: impl IntoIterator<Item = ApplicationId>) -> Self {
        let backend = Self::default();
        {
            let mut store = backend.store();
            store.applications = demo_applications();
            store.jobs = demo_jobs();
            store.failing = failing.into_iter().collect();
        }
        backend
    }

    fn store(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn notified(&self) -> Vec<(ApplicationId, String)> {
        self.store().notified.clone()
    }

    fn reject_if_failing(store: &Store, id: &ApplicationId) -> Result<(), BackendError> {
        if store.failing.contains(id) {
            return Err(BackendError::Rejected {
                status: 500,
                message: Some(format!("Simulated failure for {}", id.as_str())),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl PipelineBackend for InMemoryPipelineBackend {
    async fn list_applications(&self) -> Result<Vec<Application>, BackendError> {
        Ok(self.store().applications.clone())
    }

    async fn update_status(
        &self,
        id: &ApplicationId,
        update: StatusUpdate,
    ) -> Result<Option<Application>, BackendError> {
        let mut store = self.store();
        Self::reject_if_failing(&store, id)?;
        let record = store
            .applications
            .iter_mut()
            .find(|application| application.id == *id)
            .ok_or(BackendError::Rejected {
                status: 404,
                message: Some("Application not found".to_string()),
            })?;
        record.status = StageValue::Known(update.status);
        if let Some(note) = update.note {
            record.employer_notes = Some(note);
        }
        Ok(Some(record.clone()))
    }

    async fn list_jobs(&self) -> Result<Vec<JobSummary>, BackendError> {
        Ok(self.store().jobs.clone())
    }

    async fn update_notes(
        &self,
        id: &ApplicationId,
        notes: &str,
    ) -> Result<Option<Application>, BackendError> {
        let mut store = self.store();
        Self::reject_if_failing(&store, id)?;
        Ok(store
            .applications
            .iter_mut()
            .find(|application| application.id == *id)
            .map(|record| {
                record.employer_notes = Some(notes.to_string()).filter(|text| !text.is_empty());
                record.clone()
            }))
    }

    async fn notify_candidate(&self, id: &ApplicationId, message: &str) -> Result<(), BackendError> {
        let mut store = self.store();
        Self::reject_if_failing(&store, id)?;
        store.notified.push((id.clone(), message.to_string()));
        Ok(())
    }
}

pub(crate) fn demo_jobs() -> Vec<JobSummary> {
    vec![
        JobSummary {
            id: JobId::new("job-platform"),
            title: "Platform Engineer".to_string(),
        },
        JobSummary {
            id: JobId::new("job-support"),
            title: "Customer Support Lead".to_string(),
        },
    ]
}

pub(crate) fn demo_applications() -> Vec<Application> {
    let base = Utc
        .with_ymd_and_hms(2026, 9, 14, 9, 0, 0)
        .single()
        .unwrap_or_else(Utc::now);
    let entries = [
        ("app-1001", "Marta Oliveira", "job-platform", "pending", Some(5)),
        ("app-1002", "Nuno Ferreira", "job-platform", "pending", None),
        ("app-1003", "Olga Pires", "job-platform", "reviewing", Some(4)),
        ("app-1004", "Paulo Gomes", "job-support", "reviewing", Some(3)),
        ("app-1005", "Rita Carvalho", "job-support", "reviewing", None),
        ("app-1006", "Sofia Martins", "job-support", "interview", Some(4)),
        ("app-1007", "Tiago Ribeiro", "job-platform", "hired", Some(5)),
        ("app-1008", "Ursula Lopes", "job-support", "on_hold", None),
    ];

    entries
        .into_iter()
        .enumerate()
        .map(|(index, (id, name, job, status, rating))| {
            let applied_at: DateTime<Utc> = base + Duration::days(index as i64);
            Application {
                id: ApplicationId::new(id),
                candidate: CandidateIdentity {
                    name: name.to_string(),
                    email: format!("{}@example.com", name.to_lowercase().replace(' ', ".")),
                    phone: None,
                    location: Some("Porto".to_string()),
                },
                job_id: JobId::new(job),
                job_title: demo_jobs()
                    .into_iter()
                    .find(|summary| summary.id.as_str() == job)
                    .map(|summary| summary.title)
                    .unwrap_or_default(),
                status: StageValue::from(status.to_string()),
                applied_at,
                expected_salary: None,
                rating,
                employer_notes: None,
                interview_scheduled_at: None,
            }
        })
        .collect()
}
