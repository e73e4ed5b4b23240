//! Kanban-style application pipeline: status columns, filtering, drag transitions with
//! optimistic update and rollback, bulk actions with per-item failure reporting, and
//! refresh from the backend of record.

mod backend;
mod board;
mod bulk;
mod config;
mod domain;
mod drag;
mod filter;
mod http;
mod locks;
mod notifications;
pub mod router;
mod selection;
mod service;
mod status;
mod sync;
mod views;

#[cfg(test)]
mod tests;

pub use backend::{BackendError, PipelineBackend, StatusUpdate};
pub use board::{to_columns, Column, ColumnLayout, IntegrityWarning, PipelineBoard};
pub use bulk::{execute as execute_bulk, BulkAction, BulkFailure, BulkReport};
pub use config::PipelineSettings;
pub use domain::{Application, ApplicationId, CandidateIdentity, JobId, JobSummary, StageValue};
pub use drag::{
    CommitTicket, DragController, DragEvent, DragEvents, DragOutcome, DragPhase, DragRejected,
    DropDecision, InvalidDragTransition,
};
pub use filter::{visible, FilterState, JobFilter};
pub use http::{BackendConfig, HttpPipelineBackend};
pub use locks::{InFlightLocks, LockHolder};
pub use notifications::{Notification, NotificationCenter, NotificationLevel};
pub use router::pipeline_router;
pub use selection::SelectionSet;
pub use service::{PipelineError, PipelineService};
pub use status::{stage_labels, PipelineStage, UnknownStage};
pub use sync::spawn_periodic_refresh;
pub use views::{BoardView, ColumnView, LockView, SyncSummary};
