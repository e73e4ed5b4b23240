use chrono::{DateTime, Utc};
use serde::Serialize;

use super::board::{ColumnLayout, IntegrityWarning};
use super::domain::{Application, ApplicationId, JobSummary};
use super::filter::FilterState;
use super::locks::LockHolder;
use super::notifications::Notification;
use super::status::PipelineStage;

#[derive(Debug, Clone, Serialize)]
pub struct ColumnView {
    pub stage: PipelineStage,
    pub label: &'static str,
    pub terminal: bool,
    pub count: usize,
    pub applications: Vec<Application>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LockView {
    pub application_id: ApplicationId,
    pub holder: LockHolder,
}

/// Owned snapshot of everything the board UI draws.
#[derive(Debug, Clone, Serialize)]
pub struct BoardView {
    pub revision: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_synced_at: Option<DateTime<Utc>>,
    pub filter: FilterState,
    pub jobs: Vec<JobSummary>,
    pub columns: Vec<ColumnView>,
    pub anomalies: Vec<IntegrityWarning>,
    pub select_mode: bool,
    pub selection: Vec<ApplicationId>,
    pub locks: Vec<LockView>,
    pub notifications: Vec<Notification>,
}

impl BoardView {
    pub fn column(&self, stage: PipelineStage) -> &ColumnView {
        &self.columns[stage.position()]
    }

    pub fn stage_of(&self, id: &ApplicationId) -> Option<PipelineStage> {
        self.columns
            .iter()
            .find(|column| column.applications.iter().any(|a| a.id == *id))
            .map(|column| column.stage)
    }
}

pub(crate) fn column_views(layout: &ColumnLayout<'_>) -> Vec<ColumnView> {
    layout
        .columns
        .iter()
        .map(|column| ColumnView {
            stage: column.stage,
            label: column.label(),
            terminal: column.stage.is_terminal(),
            count: column.len(),
            applications: column.applications.iter().map(|a| (*a).clone()).collect(),
        })
        .collect()
}

/// Result of one completed refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub applications: usize,
    pub jobs: usize,
    pub pruned_selection: usize,
    pub anomalies: usize,
    pub synced_at: DateTime<Utc>,
}
