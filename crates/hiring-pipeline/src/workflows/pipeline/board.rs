use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::{Application, ApplicationId, JobSummary, StageValue};
use super::filter::{visible, FilterState};
use super::status::PipelineStage;

/// Applications sharing one stage, in list order.
#[derive(Debug, Clone, PartialEq)]
pub struct Column<'a> {
    pub stage: PipelineStage,
    pub applications: Vec<&'a Application>,
}

impl Column<'_> {
    pub fn label(&self) -> &'static str {
        self.stage.label()
    }

    pub fn len(&self) -> usize {
        self.applications.len()
    }

    pub fn is_empty(&self) -> bool {
        self.applications.is_empty()
    }
}

/// Record whose status is outside the stage model and therefore sits in no column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntegrityWarning {
    pub application_id: ApplicationId,
    pub raw_status: String,
}

/// Columns for every stage plus the records that could not be placed.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnLayout<'a> {
    pub columns: Vec<Column<'a>>,
    pub anomalies: Vec<IntegrityWarning>,
}

impl<'a> ColumnLayout<'a> {
    pub fn column(&self, stage: PipelineStage) -> &Column<'a> {
        &self.columns[stage.position()]
    }

    pub fn placed(&self) -> usize {
        self.columns.iter().map(Column::len).sum()
    }
}

/// Bucket filtered applications into one column per stage, empty columns included.
pub fn to_columns<'a, I>(filtered: I) -> ColumnLayout<'a>
where
    I: IntoIterator<Item = &'a Application>,
{
    let mut columns: Vec<Column<'a>> = PipelineStage::ALL
        .into_iter()
        .map(|stage| Column {
            stage,
            applications: Vec::new(),
        })
        .collect();
    let mut anomalies = Vec::new();

    for application in filtered {
        match &application.status {
            StageValue::Known(stage) => columns[stage.position()].applications.push(application),
            StageValue::Unrecognized(raw) => anomalies.push(IntegrityWarning {
                application_id: application.id.clone(),
                raw_status: raw.clone(),
            }),
        }
    }

    ColumnLayout { columns, anomalies }
}

/// In-memory pipeline store: the flat list of records plus the active filter.
///
/// Columns are always derived from the flat list. Mutators are crate-private so only the
/// refresh path and the drag reconciliation path can change what is drawn.
#[derive(Debug, Clone, Default)]
pub struct PipelineBoard {
    applications: Vec<Application>,
    jobs: Vec<JobSummary>,
    filter: FilterState,
    revision: u64,
    last_synced_at: Option<DateTime<Utc>>,
}

impl PipelineBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(applications: Vec<Application>, jobs: Vec<JobSummary>) -> Self {
        Self {
            applications,
            jobs,
            ..Self::default()
        }
    }

    pub fn applications(&self) -> &[Application] {
        &self.applications
    }

    pub fn jobs(&self) -> &[JobSummary] {
        &self.jobs
    }

    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn last_synced_at(&self) -> Option<DateTime<Utc>> {
        self.last_synced_at
    }

    pub fn get(&self, id: &ApplicationId) -> Option<&Application> {
        self.applications
            .iter()
            .find(|application| application.id == *id)
    }

    pub fn contains(&self, id: &ApplicationId) -> bool {
        self.get(id).is_some()
    }

    pub fn visible(&self) -> Vec<&Application> {
        visible(&self.applications, &self.filter)
    }

    pub fn columns(&self) -> ColumnLayout<'_> {
        to_columns(self.visible())
    }

    /// Anomalies across the whole list, regardless of filter.
    pub fn anomalies(&self) -> Vec<IntegrityWarning> {
        to_columns(self.applications.iter()).anomalies
    }

    /// Filter changes only affect which records are drawn.
    pub fn set_filter(&mut self, filter: FilterState) {
        self.filter = filter;
    }

    pub(crate) fn replace_applications(
        &mut self,
        applications: Vec<Application>,
        synced_at: DateTime<Utc>,
    ) {
        self.applications = applications;
        self.last_synced_at = Some(synced_at);
        self.revision += 1;
    }

    pub(crate) fn replace_jobs(&mut self, jobs: Vec<JobSummary>) {
        self.jobs = jobs;
    }

    /// Moves a record to `stage`, returning the stage it held before.
    pub(crate) fn set_stage(
        &mut self,
        id: &ApplicationId,
        stage: PipelineStage,
    ) -> Option<StageValue> {
        let application = self
            .applications
            .iter_mut()
            .find(|application| application.id == *id)?;
        let previous = std::mem::replace(&mut application.status, StageValue::Known(stage));
        self.revision += 1;
        Some(previous)
    }

    pub(crate) fn set_notes(&mut self, id: &ApplicationId, notes: Option<String>) -> bool {
        match self
            .applications
            .iter_mut()
            .find(|application| application.id == *id)
        {
            Some(application) => {
                application.employer_notes = notes;
                self.revision += 1;
                true
            }
            None => false,
        }
    }

    /// Replaces a record with the backend's copy. Returns false when the id is gone.
    pub(crate) fn apply_confirmed(&mut self, confirmed: Application) -> bool {
        match self
            .applications
            .iter_mut()
            .find(|application| application.id == confirmed.id)
        {
            Some(slot) => {
                *slot = confirmed;
                self.revision += 1;
                true
            }
            None => false,
        }
    }
}
