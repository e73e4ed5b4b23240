use super::common::*;
use std::sync::Arc;

use crate::workflows::pipeline::{
    BulkAction, DragOutcome, FilterState, JobFilter, JobId, NotificationLevel, PipelineStage,
};

#[tokio::test]
async fn partial_failure_reports_each_item_and_clears_selection() {
    let (service, backend) = loaded_service(reviewing_batch()).await;
    backend.fail_for("app-3", server_error());

    assert_eq!(service.select_visible(), 5);
    let report = service
        .apply_action(BulkAction::MoveTo {
            stage: PipelineStage::Shortlisted,
            note: None,
        })
        .await;

    assert_eq!(report.succeeded.len(), 4);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].application_id, id("app-3"));
    assert_eq!(report.failed[0].reason, "Internal Server Error");
    assert!(report.refreshed);
    assert_eq!(
        report.summary(),
        "move to Shortlisted: 4 of 5 applications updated, 1 failed"
    );

    assert!(service.selection().is_empty());
    assert!(!service.snapshot().select_mode);
    assert_eq!(backend.status_updates().len(), 5);
    assert_eq!(
        backend.calls().last(),
        Some(&BackendCall::ListJobs),
        "board reloads after the batch"
    );

    let view = service.snapshot();
    assert_eq!(view.column(PipelineStage::Shortlisted).count, 4);
    assert_eq!(view.stage_of(&id("app-3")), Some(PipelineStage::Reviewing));

    let last = service.notifications().pop().expect("summary notification");
    assert_eq!(last.level, NotificationLevel::Warning);
}

#[tokio::test]
async fn empty_selection_makes_no_backend_calls() {
    let (service, backend) = loaded_service(reviewing_batch()).await;

    let report = service
        .apply_action(BulkAction::Reject { note: None })
        .await;

    assert!(report.is_empty());
    assert!(!report.refreshed);
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn reject_and_notify_issue_the_matching_calls() {
    let (service, backend) = loaded_service(reviewing_batch()).await;

    service.toggle_selection(&id("app-2")).expect("known id");
    let report = service
        .apply_action(BulkAction::Reject {
            note: Some("Position filled".to_string()),
        })
        .await;
    assert_eq!(report.succeeded, vec![id("app-2")]);
    let updates = backend.status_updates();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].1.status, PipelineStage::Rejected);
    assert_eq!(updates[0].1.note.as_deref(), Some("Position filled"));

    backend.clear_calls();
    service.toggle_selection(&id("app-4")).expect("known id");
    service.toggle_selection(&id("app-1")).expect("known id");
    let report = service
        .apply_action(BulkAction::Notify {
            message: "We will be in touch next week".to_string(),
        })
        .await;

    assert_eq!(report.succeeded, vec![id("app-1"), id("app-4")]);
    let notified: Vec<BackendCall> = backend
        .calls()
        .into_iter()
        .filter(|call| matches!(call, BackendCall::Notify { .. }))
        .collect();
    assert_eq!(
        notified,
        vec![
            BackendCall::Notify {
                id: id("app-1"),
                message: "We will be in touch next week".to_string(),
            },
            BackendCall::Notify {
                id: id("app-4"),
                message: "We will be in touch next week".to_string(),
            },
        ]
    );
}

#[tokio::test]
async fn card_with_drag_in_flight_fails_without_a_backend_call() {
    let (service, backend) = loaded_service(reviewing_batch()).await;
    let release = backend.hold_next_update();

    service.begin_drag(&id("app-1")).expect("card picks up");
    let in_flight = {
        let service = Arc::clone(&service);
        tokio::spawn(async move {
            service
                .drop_card(&id("app-1"), Some(PipelineStage::Interview))
                .await
        })
    };
    backend.wait_until_parked().await;

    service.toggle_selection(&id("app-1")).expect("known id");
    service.toggle_selection(&id("app-2")).expect("known id");
    let report = service
        .apply_action(BulkAction::MoveTo {
            stage: PipelineStage::Hired,
            note: None,
        })
        .await;

    assert_eq!(report.succeeded, vec![id("app-2")]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].application_id, id("app-1"));
    let bulk_updates: Vec<_> = backend
        .status_updates()
        .into_iter()
        .filter(|(_, update)| update.status == PipelineStage::Hired)
        .collect();
    assert_eq!(bulk_updates.len(), 1);

    release.send(()).expect("gate open");
    let outcome = in_flight.await.expect("drop task joins");
    assert!(matches!(outcome, DragOutcome::Committed { .. }));
    assert_eq!(service.stage_of(&id("app-1")), Some(PipelineStage::Interview));
}

#[tokio::test]
async fn aborted_bulk_dispatch_releases_every_lock() {
    let (service, backend) = loaded_service(reviewing_batch()).await;
    let _release = backend.hold_next_update();
    assert_eq!(service.select_visible(), 5);

    let dispatching = {
        let service = Arc::clone(&service);
        tokio::spawn(async move {
            service
                .apply_action(BulkAction::MoveTo {
                    stage: PipelineStage::Interview,
                    note: None,
                })
                .await
        })
    };
    backend.wait_until_parked().await;
    assert_eq!(service.snapshot().locks.len(), 5);

    dispatching.abort();
    assert!(dispatching.await.is_err());

    assert!(service.snapshot().locks.is_empty());
    let outcome = service
        .move_card(&id("app-4"), PipelineStage::Shortlisted)
        .await
        .expect("card picks up after the aborted dispatch");
    assert!(matches!(outcome, DragOutcome::Committed { .. }));
}

#[tokio::test]
async fn toggling_twice_and_selecting_visible_respect_the_filter() {
    let (service, _backend) = loaded_service(sample_applications()).await;

    assert_eq!(service.toggle_selection(&id("app-3")).ok(), Some(true));
    assert_eq!(service.toggle_selection(&id("app-3")).ok(), Some(false));
    assert!(service.selection().is_empty());
    assert!(service.toggle_selection(&id("missing")).is_err());

    service.set_filter(FilterState::new("", JobFilter::Job(JobId::new("job-design"))));
    assert_eq!(service.select_visible(), 2);
    assert_eq!(service.selection(), vec![id("app-2"), id("app-4")]);

    service.clear_selection();
    assert!(service.selection().is_empty());
    assert!(!service.snapshot().select_mode);
}

#[tokio::test]
async fn refresh_prunes_selected_ids_that_disappeared() {
    let (service, backend) = loaded_service(sample_applications()).await;
    service.toggle_selection(&id("app-1")).expect("known id");
    service.toggle_selection(&id("app-2")).expect("known id");

    backend.set_applications(
        sample_applications()
            .into_iter()
            .filter(|application| application.id != id("app-2"))
            .collect(),
    );
    let summary = service.refresh().await.expect("refresh applies");

    assert_eq!(summary.pruned_selection, 1);
    assert_eq!(service.selection(), vec![id("app-1")]);
}
