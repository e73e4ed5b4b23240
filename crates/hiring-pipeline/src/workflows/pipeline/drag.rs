//! Drag-and-drop reconciliation for pipeline cards.
//!
//! Every gesture walks `Idle -> Dragging -> Committing -> Idle`, detouring through
//! `RollingBack` when the backend refuses the write. The transition function is pure; the
//! controller applies the optimistic move and its rollback against the board.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::backend::BackendError;
use super::board::PipelineBoard;
use super::domain::{Application, ApplicationId};
use super::locks::{InFlightLocks, LockHolder};
use super::status::PipelineStage;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum DragPhase {
    Idle,
    Dragging {
        application_id: ApplicationId,
        source: PipelineStage,
    },
    Committing {
        application_id: ApplicationId,
        source: PipelineStage,
        target: PipelineStage,
    },
    RollingBack {
        application_id: ApplicationId,
        source: PipelineStage,
        target: PipelineStage,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragEvent {
    Start {
        application_id: ApplicationId,
        source: PipelineStage,
    },
    /// `None` means the card was released outside every column.
    Drop { target: Option<PipelineStage> },
    Confirmed,
    Failed,
    Reverted,
}

impl DragEvent {
    pub const fn name(&self) -> &'static str {
        match self {
            DragEvent::Start { .. } => "start",
            DragEvent::Drop { .. } => "drop",
            DragEvent::Confirmed => "confirmed",
            DragEvent::Failed => "failed",
            DragEvent::Reverted => "reverted",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("drag event '{event}' is not valid while {phase}")]
pub struct InvalidDragTransition {
    pub phase: &'static str,
    pub event: &'static str,
}

impl DragPhase {
    pub const fn name(&self) -> &'static str {
        match self {
            DragPhase::Idle => "idle",
            DragPhase::Dragging { .. } => "dragging",
            DragPhase::Committing { .. } => "committing",
            DragPhase::RollingBack { .. } => "rolling_back",
        }
    }

    pub fn application_id(&self) -> Option<&ApplicationId> {
        match self {
            DragPhase::Idle => None,
            DragPhase::Dragging { application_id, .. }
            | DragPhase::Committing { application_id, .. }
            | DragPhase::RollingBack { application_id, .. } => Some(application_id),
        }
    }

    pub fn advance(self, event: DragEvent) -> Result<DragPhase, InvalidDragTransition> {
        match (self, event) {
            (
                DragPhase::Idle,
                DragEvent::Start {
                    application_id,
                    source,
                },
            ) => Ok(DragPhase::Dragging {
                application_id,
                source,
            }),
            (DragPhase::Dragging { .. }, DragEvent::Drop { target: None }) => Ok(DragPhase::Idle),
            (
                DragPhase::Dragging {
                    application_id,
                    source,
                },
                DragEvent::Drop {
                    target: Some(target),
                },
            ) => {
                if target == source {
                    Ok(DragPhase::Idle)
                } else {
                    Ok(DragPhase::Committing {
                        application_id,
                        source,
                        target,
                    })
                }
            }
            (DragPhase::Committing { .. }, DragEvent::Confirmed) => Ok(DragPhase::Idle),
            (
                DragPhase::Committing {
                    application_id,
                    source,
                    target,
                },
                DragEvent::Failed,
            ) => Ok(DragPhase::RollingBack {
                application_id,
                source,
                target,
            }),
            (DragPhase::RollingBack { .. }, DragEvent::Reverted) => Ok(DragPhase::Idle),
            (phase, event) => Err(InvalidDragTransition {
                phase: phase.name(),
                event: event.name(),
            }),
        }
    }
}

/// Reasons a card cannot be picked up.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DragRejected {
    #[error("application {} is not on the board", .0.as_str())]
    UnknownApplication(ApplicationId),
    #[error("application {} has status '{raw_status}' outside the pipeline", .application_id.as_str())]
    UnplacedStatus {
        application_id: ApplicationId,
        raw_status: String,
    },
    #[error("application {} has a status change in flight", .0.as_str())]
    Locked(ApplicationId),
    #[error("application {} is {stage} and cannot be moved", .application_id.as_str())]
    TerminalLocked {
        application_id: ApplicationId,
        stage: PipelineStage,
    },
}

/// Write the caller must issue after an accepted drop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitTicket {
    pub application_id: ApplicationId,
    pub source: PipelineStage,
    pub target: PipelineStage,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropDecision {
    /// The drop did not belong to the gesture in progress.
    Ignored,
    Cancelled,
    Unchanged(PipelineStage),
    /// Another write grabbed the card between pick-up and drop.
    Locked,
    Commit(CommitTicket),
}

/// What the board shows once a gesture settles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DragOutcome {
    Ignored {
        application_id: ApplicationId,
    },
    Cancelled {
        application_id: ApplicationId,
    },
    Unchanged {
        application_id: ApplicationId,
        stage: PipelineStage,
    },
    Locked {
        application_id: ApplicationId,
    },
    Committed {
        application_id: ApplicationId,
        source: PipelineStage,
        target: PipelineStage,
    },
    RolledBack {
        application_id: ApplicationId,
        source: PipelineStage,
        target: PipelineStage,
        reason: String,
    },
}

/// Capability surface a drag-and-drop adapter drives.
#[async_trait]
pub trait DragEvents: Send + Sync {
    fn on_drag_start(&self, id: &ApplicationId) -> Result<PipelineStage, DragRejected>;

    async fn on_drop(&self, id: &ApplicationId, target: Option<PipelineStage>) -> DragOutcome;
}

/// Tracks the gesture under the pointer and every commit still awaiting the backend.
#[derive(Debug, Clone)]
pub struct DragController {
    lock_terminal_cards: bool,
    active: DragPhase,
    pending: HashMap<ApplicationId, DragPhase>,
    settled: u64,
    confirmed: Vec<ConfirmedMove>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ConfirmedMove {
    epoch: u64,
    application_id: ApplicationId,
    stage: PipelineStage,
}

impl Default for DragController {
    fn default() -> Self {
        Self::new(false)
    }
}

impl DragController {
    pub fn new(lock_terminal_cards: bool) -> Self {
        Self {
            lock_terminal_cards,
            active: DragPhase::Idle,
            pending: HashMap::new(),
            settled: 0,
            confirmed: Vec::new(),
        }
    }

    pub fn active(&self) -> &DragPhase {
        &self.active
    }

    pub fn pending_commits(&self) -> usize {
        self.pending.len()
    }

    pub fn phase_of(&self, id: &ApplicationId) -> DragPhase {
        if let Some(phase) = self.pending.get(id) {
            return phase.clone();
        }
        match &self.active {
            DragPhase::Dragging { application_id, .. } if application_id == id => {
                self.active.clone()
            }
            _ => DragPhase::Idle,
        }
    }

    pub fn begin(
        &mut self,
        board: &PipelineBoard,
        locks: &InFlightLocks,
        id: &ApplicationId,
    ) -> Result<PipelineStage, DragRejected> {
        let application = board
            .get(id)
            .ok_or_else(|| DragRejected::UnknownApplication(id.clone()))?;
        let source = application
            .stage()
            .ok_or_else(|| DragRejected::UnplacedStatus {
                application_id: id.clone(),
                raw_status: application.status.raw().to_string(),
            })?;

        if locks.is_locked(id) {
            return Err(DragRejected::Locked(id.clone()));
        }
        if self.lock_terminal_cards && source.is_terminal() {
            return Err(DragRejected::TerminalLocked {
                application_id: id.clone(),
                stage: source,
            });
        }

        if let Some(abandoned) = self.active.application_id() {
            debug!(application_id = abandoned.as_str(), "drag abandoned by new gesture");
        }

        self.active = DragPhase::Dragging {
            application_id: id.clone(),
            source,
        };
        debug!(application_id = id.as_str(), %source, "drag started");
        Ok(source)
    }

    pub(crate) fn drop(
        &mut self,
        board: &mut PipelineBoard,
        locks: &mut InFlightLocks,
        id: &ApplicationId,
        target: Option<PipelineStage>,
    ) -> DropDecision {
        let picked_from = match &self.active {
            DragPhase::Dragging {
                application_id,
                source,
            } if application_id == id => *source,
            _ => return DropDecision::Ignored,
        };
        self.active = DragPhase::Idle;

        // A refresh may have moved or removed the card since pick-up.
        let current = match board.get(id).and_then(Application::stage) {
            Some(stage) => stage,
            None => {
                debug!(application_id = id.as_str(), "drag target vanished before drop");
                return DropDecision::Cancelled;
            }
        };
        if picked_from != current {
            if target == Some(picked_from) {
                debug!(
                    application_id = id.as_str(),
                    %picked_from,
                    %current,
                    "card dropped back on its pick-up column; keeping refreshed stage"
                );
                return DropDecision::Unchanged(current);
            }
            debug!(application_id = id.as_str(), %picked_from, %current, "drag source rebased");
        }
        let gesture = DragPhase::Dragging {
            application_id: id.clone(),
            source: current,
        };

        match gesture.advance(DragEvent::Drop { target }) {
            Ok(DragPhase::Committing {
                application_id,
                source,
                target,
            }) => {
                if !locks.try_acquire(&application_id, LockHolder::Drag) {
                    return DropDecision::Locked;
                }
                board.set_stage(&application_id, target);
                let ticket = CommitTicket {
                    application_id: application_id.clone(),
                    source,
                    target,
                };
                self.pending.insert(
                    application_id.clone(),
                    DragPhase::Committing {
                        application_id,
                        source,
                        target,
                    },
                );
                info!(application_id = id.as_str(), %source, %target, "card moved optimistically");
                DropDecision::Commit(ticket)
            }
            Ok(_) => match target {
                Some(stage) => DropDecision::Unchanged(stage),
                None => DropDecision::Cancelled,
            },
            Err(_) => DropDecision::Cancelled,
        }
    }

    pub(crate) fn settle(
        &mut self,
        board: &mut PipelineBoard,
        locks: &mut InFlightLocks,
        ticket: &CommitTicket,
        result: Result<Option<Application>, BackendError>,
    ) -> DragOutcome {
        let id = &ticket.application_id;
        let phase = self
            .pending
            .remove(id)
            .unwrap_or_else(|| DragPhase::Committing {
                application_id: id.clone(),
                source: ticket.source,
                target: ticket.target,
            });
        let (source, target) = match &phase {
            DragPhase::Committing { source, target, .. } => (*source, *target),
            _ => (ticket.source, ticket.target),
        };
        locks.release(id);

        match result {
            Ok(confirmed) => {
                if let Err(error) = phase.advance(DragEvent::Confirmed) {
                    warn!(%error, "unexpected drag phase on confirmation");
                }
                match confirmed {
                    Some(record) if record.stage().is_some() => {
                        board.apply_confirmed(record);
                    }
                    Some(record) => warn!(
                        application_id = id.as_str(),
                        raw_status = record.status.raw(),
                        "backend confirmed an unrecognized status; keeping optimistic stage"
                    ),
                    None => {}
                }
                self.settled += 1;
                self.confirmed.push(ConfirmedMove {
                    epoch: self.settled,
                    application_id: id.clone(),
                    stage: board.get(id).and_then(Application::stage).unwrap_or(target),
                });
                info!(application_id = id.as_str(), %source, %target, "status change committed");
                DragOutcome::Committed {
                    application_id: id.clone(),
                    source,
                    target,
                }
            }
            Err(error) => {
                let rolling_back = phase.advance(DragEvent::Failed);
                if board.get(id).and_then(Application::stage) == Some(target) {
                    board.set_stage(id, source);
                }
                if let Err(transition) = rolling_back.and_then(|p| p.advance(DragEvent::Reverted)) {
                    warn!(%transition, "unexpected drag phase during rollback");
                }
                warn!(
                    application_id = id.as_str(),
                    %source,
                    %target,
                    %error,
                    "status change failed; card returned to source column"
                );
                DragOutcome::RolledBack {
                    application_id: id.clone(),
                    source,
                    target,
                    reason: error.user_message(),
                }
            }
        }
    }

    /// Forgets a commit whose backend call was dropped before it answered.
    ///
    /// The lock is released and the optimistic move reverted when the card still shows it.
    pub(crate) fn abandon(
        &mut self,
        board: &mut PipelineBoard,
        locks: &mut InFlightLocks,
        ticket: &CommitTicket,
    ) {
        let id = &ticket.application_id;
        let source = match self.pending.remove(id) {
            Some(DragPhase::Committing { source, .. }) => source,
            _ => ticket.source,
        };
        locks.release(id);
        if board.get(id).and_then(Application::stage) == Some(ticket.target) {
            board.set_stage(id, source);
        }
        warn!(
            application_id = id.as_str(),
            %source,
            target = %ticket.target,
            "status change abandoned before the backend answered; card returned to source column"
        );
    }

    /// Number of commits confirmed so far.
    pub fn settled_epoch(&self) -> u64 {
        self.settled
    }

    /// Re-applies moves confirmed after `since` over a list fetched before they landed.
    ///
    /// Entries at or below `since` are dropped: any refresh issued earlier is stale by the
    /// time this one has been applied.
    pub(crate) fn replay_confirmed(&mut self, board: &mut PipelineBoard, since: u64) -> usize {
        self.confirmed.retain(|confirmed| confirmed.epoch > since);
        let mut replayed = 0;
        for confirmed in &self.confirmed {
            let Some(listed) = board.get(&confirmed.application_id) else {
                continue;
            };
            if listed.stage() != Some(confirmed.stage) {
                board.set_stage(&confirmed.application_id, confirmed.stage);
                replayed += 1;
            }
        }
        replayed
    }

    /// Re-applies outstanding targets after a refresh replaced the list.
    ///
    /// The refreshed stage becomes the rollback point for each pending commit.
    pub(crate) fn rebase(&mut self, board: &mut PipelineBoard) {
        for phase in self.pending.values_mut() {
            if let DragPhase::Committing {
                application_id,
                source,
                target,
            } = phase
            {
                let Some(refreshed) = board.get(application_id).and_then(Application::stage)
                else {
                    continue;
                };
                if refreshed != *target {
                    *source = refreshed;
                    board.set_stage(application_id, *target);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id() -> ApplicationId {
        ApplicationId::new("app-1")
    }

    fn dragging() -> DragPhase {
        DragPhase::Idle
            .advance(DragEvent::Start {
                application_id: id(),
                source: PipelineStage::Reviewing,
            })
            .expect("idle accepts start")
    }

    #[test]
    fn drop_on_source_column_returns_to_idle() {
        let phase = dragging()
            .advance(DragEvent::Drop {
                target: Some(PipelineStage::Reviewing),
            })
            .expect("valid drop");
        assert_eq!(phase, DragPhase::Idle);
    }

    #[test]
    fn drop_outside_columns_cancels() {
        let phase = dragging()
            .advance(DragEvent::Drop { target: None })
            .expect("valid drop");
        assert_eq!(phase, DragPhase::Idle);
    }

    #[test]
    fn failed_commit_rolls_back_then_idles() {
        let committing = dragging()
            .advance(DragEvent::Drop {
                target: Some(PipelineStage::Interview),
            })
            .expect("valid drop");
        assert_eq!(committing.name(), "committing");

        let rolling_back = committing.advance(DragEvent::Failed).expect("can fail");
        assert_eq!(
            rolling_back,
            DragPhase::RollingBack {
                application_id: id(),
                source: PipelineStage::Reviewing,
                target: PipelineStage::Interview,
            }
        );
        assert_eq!(
            rolling_back.advance(DragEvent::Reverted),
            Ok(DragPhase::Idle)
        );
    }

    #[test]
    fn out_of_order_events_are_rejected() {
        assert_eq!(
            DragPhase::Idle.advance(DragEvent::Confirmed),
            Err(InvalidDragTransition {
                phase: "idle",
                event: "confirmed",
            })
        );
        assert!(dragging().advance(DragEvent::Start {
            application_id: id(),
            source: PipelineStage::Pending,
        })
        .is_err());
    }

    fn board_with(status: &str) -> PipelineBoard {
        let application: Application = serde_json::from_value(serde_json::json!({
            "id": "app-1",
            "candidate": { "name": "Ines Prado", "email": "ines@example.com" },
            "job_id": "job-1",
            "job_title": "Backend Engineer",
            "status": status,
            "applied_at": "2026-09-01T09:30:00Z"
        }))
        .expect("decodes");
        PipelineBoard::from_snapshot(vec![application], vec![])
    }

    fn stage(board: &PipelineBoard) -> Option<PipelineStage> {
        board.get(&id()).and_then(Application::stage)
    }

    #[test]
    fn abandoned_commit_unlocks_and_reverts_the_card() {
        let mut board = board_with("reviewing");
        let mut locks = InFlightLocks::default();
        let mut drag = DragController::default();

        drag.begin(&board, &locks, &id()).expect("card picks up");
        let DropDecision::Commit(ticket) =
            drag.drop(&mut board, &mut locks, &id(), Some(PipelineStage::Interview))
        else {
            panic!("cross-column drop commits");
        };
        assert!(locks.is_locked(&id()));

        drag.abandon(&mut board, &mut locks, &ticket);

        assert!(!locks.is_locked(&id()));
        assert_eq!(drag.pending_commits(), 0);
        assert_eq!(stage(&board), Some(PipelineStage::Reviewing));
    }

    #[test]
    fn drop_back_on_pick_up_column_after_refresh_is_a_no_op() {
        let mut board = board_with("reviewing");
        let mut locks = InFlightLocks::default();
        let mut drag = DragController::default();

        drag.begin(&board, &locks, &id()).expect("card picks up");
        board.set_stage(&id(), PipelineStage::Shortlisted);

        let decision = drag.drop(&mut board, &mut locks, &id(), Some(PipelineStage::Reviewing));

        assert_eq!(decision, DropDecision::Unchanged(PipelineStage::Shortlisted));
        assert!(locks.is_empty());
        assert_eq!(stage(&board), Some(PipelineStage::Shortlisted));
    }

    #[test]
    fn confirmed_moves_replay_over_lists_fetched_before_them() {
        let mut board = board_with("reviewing");
        let mut locks = InFlightLocks::default();
        let mut drag = DragController::default();
        let issued_before = drag.settled_epoch();

        drag.begin(&board, &locks, &id()).expect("card picks up");
        let DropDecision::Commit(ticket) =
            drag.drop(&mut board, &mut locks, &id(), Some(PipelineStage::Interview))
        else {
            panic!("cross-column drop commits");
        };
        drag.settle(&mut board, &mut locks, &ticket, Ok(None));
        assert_eq!(drag.settled_epoch(), issued_before + 1);

        let mut stale = board_with("reviewing");
        assert_eq!(drag.replay_confirmed(&mut stale, issued_before), 1);
        assert_eq!(stage(&stale), Some(PipelineStage::Interview));

        let mut fresh = board_with("offer_sent");
        assert_eq!(drag.replay_confirmed(&mut fresh, drag.settled_epoch()), 0);
        assert_eq!(stage(&fresh), None);
    }
}
