use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info, warn};

use super::backend::{BackendError, PipelineBackend, StatusUpdate};
use super::board::{IntegrityWarning, PipelineBoard};
use super::bulk::{self, BulkAction, BulkFailure, BulkReport};
use super::config::PipelineSettings;
use super::domain::{Application, ApplicationId};
use super::drag::{
    CommitTicket, DragController, DragEvents, DragOutcome, DragRejected, DropDecision,
};
use super::filter::FilterState;
use super::locks::{InFlightLocks, LockHolder};
use super::notifications::{Notification, NotificationCenter, NotificationLevel};
use super::selection::SelectionSet;
use super::status::PipelineStage;
use super::views::{column_views, BoardView, LockView, SyncSummary};

const LOCKED_REASON: &str = "a status change for this application is still in flight";

struct PipelineState {
    board: PipelineBoard,
    drag: DragController,
    locks: InFlightLocks,
    selection: SelectionSet,
    notifications: NotificationCenter,
    reported_anomalies: Vec<IntegrityWarning>,
    refresh_issued: u64,
    refresh_applied: u64,
}

/// Owns the board and every controller that may change it.
///
/// State sits behind one mutex that is never held across a backend call: each entry point
/// locks, mutates, releases, awaits the backend, then locks again to reconcile.
pub struct PipelineService<B> {
    backend: Arc<B>,
    state: Mutex<PipelineState>,
}

impl<B> PipelineService<B>
where
    B: PipelineBackend + 'static,
{
    pub fn new(backend: Arc<B>, settings: PipelineSettings) -> Self {
        let state = PipelineState {
            board: PipelineBoard::new(),
            drag: DragController::new(settings.lock_terminal_cards),
            locks: InFlightLocks::default(),
            selection: SelectionSet::new(),
            notifications: NotificationCenter::with_capacity(settings.notification_capacity),
            reported_anomalies: Vec::new(),
            refresh_issued: 0,
            refresh_applied: 0,
        };

        Self {
            backend,
            state: Mutex::new(state),
        }
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    fn state(&self) -> MutexGuard<'_, PipelineState> {
        lock_state(&self.state)
    }

    /// Rebuilds the board from the backend of record.
    pub async fn refresh(&self) -> Result<SyncSummary, PipelineError> {
        let (ticket, settled_before) = {
            let mut state = self.state();
            state.refresh_issued += 1;
            (state.refresh_issued, state.drag.settled_epoch())
        };

        let applications = match self.backend.list_applications().await {
            Ok(applications) => applications,
            Err(error) => {
                self.state().notifications.warning(format!(
                    "Could not refresh the pipeline: {}",
                    error.user_message()
                ));
                return Err(PipelineError::Backend(error));
            }
        };
        let jobs = match self.backend.list_jobs().await {
            Ok(jobs) => Some(jobs),
            Err(error) => {
                warn!(%error, "job list unavailable; keeping previous filter options");
                None
            }
        };

        let mut guard = self.state();
        let state = &mut *guard;
        if ticket < state.refresh_applied {
            debug!(ticket, applied = state.refresh_applied, "discarding superseded refresh");
            return Err(PipelineError::StaleRefresh);
        }
        state.refresh_applied = ticket;

        let synced_at = Utc::now();
        state.board.replace_applications(applications, synced_at);
        if let Some(jobs) = jobs {
            state.board.replace_jobs(jobs);
        }
        let replayed = state.drag.replay_confirmed(&mut state.board, settled_before);
        if replayed > 0 {
            debug!(ticket, replayed, "re-applied moves confirmed while the list was in flight");
        }
        state.drag.rebase(&mut state.board);
        let pruned_selection = state.selection.prune(&state.board);

        let anomalies = state.board.anomalies();
        for anomaly in &anomalies {
            warn!(
                application_id = anomaly.application_id.as_str(),
                raw_status = %anomaly.raw_status,
                "application status outside the pipeline; hidden from columns"
            );
        }
        if !anomalies.is_empty() && anomalies != state.reported_anomalies {
            state.notifications.warning(format!(
                "{} application(s) have an unrecognized status and are not shown on the board",
                anomalies.len()
            ));
        }
        let anomaly_count = anomalies.len();
        state.reported_anomalies = anomalies;

        let summary = SyncSummary {
            applications: state.board.applications().len(),
            jobs: state.board.jobs().len(),
            pruned_selection,
            anomalies: anomaly_count,
            synced_at,
        };
        info!(
            applications = summary.applications,
            jobs = summary.jobs,
            pruned_selection,
            anomalies = anomaly_count,
            "pipeline refreshed"
        );
        Ok(summary)
    }

    pub fn filter(&self) -> FilterState {
        self.state().board.filter().clone()
    }

    pub fn set_filter(&self, filter: FilterState) {
        self.state().board.set_filter(filter);
    }

    pub fn application(&self, id: &ApplicationId) -> Option<Application> {
        self.state().board.get(id).cloned()
    }

    pub fn stage_of(&self, id: &ApplicationId) -> Option<PipelineStage> {
        self.state().board.get(id).and_then(Application::stage)
    }

    pub fn snapshot(&self) -> BoardView {
        let state = self.state();
        let layout = state.board.columns();

        BoardView {
            revision: state.board.revision(),
            last_synced_at: state.board.last_synced_at(),
            filter: state.board.filter().clone(),
            jobs: state.board.jobs().to_vec(),
            columns: column_views(&layout),
            anomalies: layout.anomalies.clone(),
            select_mode: state.selection.in_select_mode(),
            selection: state.selection.ordered_ids(&state.board),
            locks: state
                .locks
                .ids()
                .into_iter()
                .filter_map(|application_id| {
                    state.locks.holder(&application_id).map(|holder| LockView {
                        application_id,
                        holder,
                    })
                })
                .collect(),
            notifications: state.notifications.list(),
        }
    }

    pub fn begin_drag(&self, id: &ApplicationId) -> Result<PipelineStage, DragRejected> {
        let mut guard = self.state();
        let state = &mut *guard;
        state.drag.begin(&state.board, &state.locks, id)
    }

    /// Resolves a drop; a cross-column drop issues exactly one status update.
    pub async fn drop_card(
        &self,
        id: &ApplicationId,
        target: Option<PipelineStage>,
    ) -> DragOutcome {
        let decision = {
            let mut guard = self.state();
            let state = &mut *guard;
            state
                .drag
                .drop(&mut state.board, &mut state.locks, id, target)
        };

        let application_id = id.clone();
        let ticket = match decision {
            DropDecision::Commit(ticket) => ticket,
            DropDecision::Ignored => return DragOutcome::Ignored { application_id },
            DropDecision::Cancelled => return DragOutcome::Cancelled { application_id },
            DropDecision::Unchanged(stage) => {
                return DragOutcome::Unchanged {
                    application_id,
                    stage,
                }
            }
            DropDecision::Locked => {
                self.state()
                    .notifications
                    .warning("That card is already being updated; try again in a moment");
                return DragOutcome::Locked { application_id };
            }
        };

        let commit = PendingCommit::new(&self.state, ticket);
        let result = self
            .backend
            .update_status(
                &commit.ticket.application_id,
                StatusUpdate::to(commit.ticket.target),
            )
            .await;
        let ticket = commit.disarm();

        let mut guard = self.state();
        let state = &mut *guard;
        let outcome = state
            .drag
            .settle(&mut state.board, &mut state.locks, &ticket, result);
        if let DragOutcome::RolledBack { target, reason, .. } = &outcome {
            let candidate = candidate_name(&state.board, id);
            state.notifications.error(format!(
                "Could not move {candidate} to {}: {reason}",
                target.label()
            ));
        }
        outcome
    }

    /// Pick-up and drop in one call.
    pub async fn move_card(
        &self,
        id: &ApplicationId,
        target: PipelineStage,
    ) -> Result<DragOutcome, DragRejected> {
        self.begin_drag(id)?;
        Ok(self.drop_card(id, Some(target)).await)
    }

    pub fn toggle_selection(&self, id: &ApplicationId) -> Result<bool, PipelineError> {
        let mut guard = self.state();
        let state = &mut *guard;
        if !state.board.contains(id) {
            return Err(PipelineError::UnknownApplication(id.clone()));
        }
        Ok(state.selection.toggle(id))
    }

    /// Adds every application visible under the current filter.
    pub fn select_visible(&self) -> usize {
        let mut guard = self.state();
        let state = &mut *guard;
        let visible: Vec<ApplicationId> = state
            .board
            .visible()
            .into_iter()
            .map(|application| application.id.clone())
            .collect();
        state.selection.select_all(visible.iter())
    }

    pub fn clear_selection(&self) {
        self.state().selection.clear();
    }

    pub fn selection(&self) -> Vec<ApplicationId> {
        let state = self.state();
        state.selection.ordered_ids(&state.board)
    }

    /// Applies `action` to every selected application as independent calls.
    ///
    /// The selection is always cleared and the board reloaded afterwards, since partial
    /// failure leaves no uniform local state worth trusting.
    pub async fn apply_action(&self, action: BulkAction) -> BulkReport {
        let (order, dispatch, mut failed) = {
            let mut guard = self.state();
            let state = &mut *guard;
            let order = state.selection.ordered_ids(&state.board);
            if order.is_empty() {
                return BulkReport::empty(action);
            }

            let mut dispatch = Vec::with_capacity(order.len());
            let mut failed = Vec::new();
            for id in &order {
                if state.locks.try_acquire(id, LockHolder::Bulk) {
                    dispatch.push(id.clone());
                } else {
                    failed.push(BulkFailure {
                        application_id: id.clone(),
                        reason: LOCKED_REASON.to_string(),
                    });
                }
            }
            (order, dispatch, failed)
        };

        info!(
            action = %action.describe(),
            selected = order.len(),
            dispatched = dispatch.len(),
            "dispatching bulk action"
        );
        let held = BulkLocks {
            state: &self.state,
            ids: dispatch,
        };
        let (succeeded, dispatch_failures) =
            bulk::execute(self.backend.as_ref(), &action, &held.ids).await;
        drop(held);
        failed.extend(dispatch_failures);
        failed.sort_by_key(|failure| {
            order
                .iter()
                .position(|id| *id == failure.application_id)
                .unwrap_or(usize::MAX)
        });

        self.state().selection.clear();

        let refreshed = match self.refresh().await {
            Ok(_) | Err(PipelineError::StaleRefresh) => true,
            Err(error) => {
                warn!(%error, "board reload after bulk action failed");
                false
            }
        };

        let report = BulkReport {
            action,
            succeeded,
            failed,
            refreshed,
        };
        let level = if report.failed.is_empty() {
            NotificationLevel::Info
        } else {
            NotificationLevel::Warning
        };
        self.state().notifications.push(level, report.summary());
        info!(
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            refreshed,
            "bulk action finished"
        );
        report
    }

    /// Saves employer notes; only the notes field of the local record changes.
    pub async fn update_notes(
        &self,
        id: &ApplicationId,
        notes: String,
    ) -> Result<Option<Application>, PipelineError> {
        if !self.state().board.contains(id) {
            return Err(PipelineError::UnknownApplication(id.clone()));
        }

        match self.backend.update_notes(id, &notes).await {
            Ok(confirmed) => {
                let saved = confirmed
                    .as_ref()
                    .map(|record| record.employer_notes.clone())
                    .unwrap_or_else(|| Some(notes).filter(|text| !text.is_empty()));
                let mut state = self.state();
                state.board.set_notes(id, saved);
                Ok(state.board.get(id).cloned())
            }
            Err(error) => {
                let mut guard = self.state();
                let state = &mut *guard;
                let candidate = candidate_name(&state.board, id);
                state.notifications.error(format!(
                    "Could not save notes for {candidate}: {}",
                    error.user_message()
                ));
                Err(PipelineError::Backend(error))
            }
        }
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.state().notifications.list()
    }

    pub fn dismiss_notification(&self, id: u64) -> bool {
        self.state().notifications.dismiss(id)
    }

    pub fn is_locked(&self, id: &ApplicationId) -> bool {
        self.state().locks.is_locked(id)
    }
}

#[async_trait]
impl<B> DragEvents for PipelineService<B>
where
    B: PipelineBackend + 'static,
{
    fn on_drag_start(&self, id: &ApplicationId) -> Result<PipelineStage, DragRejected> {
        self.begin_drag(id)
    }

    async fn on_drop(&self, id: &ApplicationId, target: Option<PipelineStage>) -> DragOutcome {
        self.drop_card(id, target).await
    }
}

fn lock_state(state: &Mutex<PipelineState>) -> MutexGuard<'_, PipelineState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Accepted drop whose backend call has not answered yet.
///
/// Dropped while still armed, it releases the write lock and reverts the optimistic move.
struct PendingCommit<'a> {
    state: &'a Mutex<PipelineState>,
    ticket: CommitTicket,
    armed: bool,
}

impl<'a> PendingCommit<'a> {
    fn new(state: &'a Mutex<PipelineState>, ticket: CommitTicket) -> Self {
        Self {
            state,
            ticket,
            armed: true,
        }
    }

    fn disarm(mut self) -> CommitTicket {
        self.armed = false;
        self.ticket.clone()
    }
}

impl Drop for PendingCommit<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut guard = lock_state(self.state);
        let state = &mut *guard;
        state
            .drag
            .abandon(&mut state.board, &mut state.locks, &self.ticket);
    }
}

/// Write locks taken for a bulk dispatch, released however the dispatch ends.
struct BulkLocks<'a> {
    state: &'a Mutex<PipelineState>,
    ids: Vec<ApplicationId>,
}

impl Drop for BulkLocks<'_> {
    fn drop(&mut self) {
        let mut state = lock_state(self.state);
        for id in &self.ids {
            state.locks.release(id);
        }
    }
}

fn candidate_name(board: &PipelineBoard, id: &ApplicationId) -> String {
    board
        .get(id)
        .map(|application| application.candidate.name.clone())
        .unwrap_or_else(|| id.as_str().to_string())
}

/// Error raised by the pipeline service.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("application {} is not on the board", .0.as_str())]
    UnknownApplication(ApplicationId),
    #[error("refresh superseded by a newer one")]
    StaleRefresh,
}
