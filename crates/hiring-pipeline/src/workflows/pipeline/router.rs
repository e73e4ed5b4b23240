use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::backend::PipelineBackend;
use super::bulk::BulkAction;
use super::domain::ApplicationId;
use super::drag::DragRejected;
use super::filter::FilterState;
use super::service::{PipelineError, PipelineService};
use super::status::PipelineStage;

#[derive(Debug, Deserialize)]
pub(crate) struct CardRequest {
    pub application_id: ApplicationId,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DropRequest {
    pub application_id: ApplicationId,
    #[serde(default)]
    pub target: Option<PipelineStage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BulkRequest {
    pub action: BulkAction,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NotesRequest {
    #[serde(default)]
    pub employer_notes: String,
}

/// Router builder exposing the board, drag, selection and bulk endpoints.
pub fn pipeline_router<B>(service: Arc<PipelineService<B>>) -> Router
where
    B: PipelineBackend + 'static,
{
    Router::new()
        .route("/api/v1/pipeline/board", get(board_handler::<B>))
        .route("/api/v1/pipeline/filter", put(filter_handler::<B>))
        .route("/api/v1/pipeline/refresh", post(refresh_handler::<B>))
        .route("/api/v1/pipeline/drag/start", post(drag_start_handler::<B>))
        .route("/api/v1/pipeline/drag/drop", post(drag_drop_handler::<B>))
        .route(
            "/api/v1/pipeline/selection",
            delete(clear_selection_handler::<B>),
        )
        .route(
            "/api/v1/pipeline/selection/toggle",
            post(toggle_selection_handler::<B>),
        )
        .route(
            "/api/v1/pipeline/selection/visible",
            post(select_visible_handler::<B>),
        )
        .route("/api/v1/pipeline/bulk", post(bulk_handler::<B>))
        .route(
            "/api/v1/pipeline/applications/:application_id/notes",
            patch(notes_handler::<B>),
        )
        .route(
            "/api/v1/pipeline/notifications/:notification_id",
            delete(dismiss_notification_handler::<B>),
        )
        .with_state(service)
}

pub(crate) async fn board_handler<B>(State(service): State<Arc<PipelineService<B>>>) -> Response
where
    B: PipelineBackend + 'static,
{
    (StatusCode::OK, Json(service.snapshot())).into_response()
}

pub(crate) async fn filter_handler<B>(
    State(service): State<Arc<PipelineService<B>>>,
    Json(filter): Json<FilterState>,
) -> Response
where
    B: PipelineBackend + 'static,
{
    service.set_filter(filter);
    (StatusCode::OK, Json(service.snapshot())).into_response()
}

pub(crate) async fn refresh_handler<B>(State(service): State<Arc<PipelineService<B>>>) -> Response
where
    B: PipelineBackend + 'static,
{
    match service.refresh().await {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(PipelineError::StaleRefresh) => {
            let payload = json!({
                "status": "superseded",
                "revision": service.snapshot().revision,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(PipelineError::Backend(error)) => {
            let payload = json!({
                "error": error.user_message(),
            });
            (StatusCode::BAD_GATEWAY, Json(payload)).into_response()
        }
        Err(other) => internal_error(other),
    }
}

pub(crate) async fn drag_start_handler<B>(
    State(service): State<Arc<PipelineService<B>>>,
    Json(request): Json<CardRequest>,
) -> Response
where
    B: PipelineBackend + 'static,
{
    match service.begin_drag(&request.application_id) {
        Ok(source) => {
            let payload = json!({
                "application_id": request.application_id,
                "source": source,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(rejection) => {
            let status = match &rejection {
                DragRejected::UnknownApplication(_) => StatusCode::NOT_FOUND,
                DragRejected::Locked(_) => StatusCode::CONFLICT,
                DragRejected::UnplacedStatus { .. } | DragRejected::TerminalLocked { .. } => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
            };
            let payload = json!({
                "error": rejection.to_string(),
            });
            (status, Json(payload)).into_response()
        }
    }
}

pub(crate) async fn drag_drop_handler<B>(
    State(service): State<Arc<PipelineService<B>>>,
    Json(request): Json<DropRequest>,
) -> Response
where
    B: PipelineBackend + 'static,
{
    let outcome = service
        .drop_card(&request.application_id, request.target)
        .await;
    (StatusCode::OK, Json(outcome)).into_response()
}

pub(crate) async fn toggle_selection_handler<B>(
    State(service): State<Arc<PipelineService<B>>>,
    Json(request): Json<CardRequest>,
) -> Response
where
    B: PipelineBackend + 'static,
{
    match service.toggle_selection(&request.application_id) {
        Ok(selected) => {
            let payload = json!({
                "application_id": request.application_id,
                "selected": selected,
                "selection": service.selection(),
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(PipelineError::UnknownApplication(id)) => {
            let payload = json!({
                "error": format!("application {} is not on the board", id.as_str()),
            });
            (StatusCode::NOT_FOUND, Json(payload)).into_response()
        }
        Err(other) => internal_error(other),
    }
}

pub(crate) async fn select_visible_handler<B>(
    State(service): State<Arc<PipelineService<B>>>,
) -> Response
where
    B: PipelineBackend + 'static,
{
    let added = service.select_visible();
    let payload = json!({
        "added": added,
        "selection": service.selection(),
    });
    (StatusCode::OK, Json(payload)).into_response()
}

pub(crate) async fn clear_selection_handler<B>(
    State(service): State<Arc<PipelineService<B>>>,
) -> Response
where
    B: PipelineBackend + 'static,
{
    service.clear_selection();
    StatusCode::NO_CONTENT.into_response()
}

pub(crate) async fn bulk_handler<B>(
    State(service): State<Arc<PipelineService<B>>>,
    Json(request): Json<BulkRequest>,
) -> Response
where
    B: PipelineBackend + 'static,
{
    let report = service.apply_action(request.action).await;
    (StatusCode::OK, Json(report)).into_response()
}

pub(crate) async fn notes_handler<B>(
    State(service): State<Arc<PipelineService<B>>>,
    Path(application_id): Path<String>,
    Json(request): Json<NotesRequest>,
) -> Response
where
    B: PipelineBackend + 'static,
{
    let id = ApplicationId::new(application_id);
    match service.update_notes(&id, request.employer_notes).await {
        Ok(Some(record)) => (StatusCode::OK, Json(record)).into_response(),
        Ok(None) | Err(PipelineError::UnknownApplication(_)) => {
            let payload = json!({
                "error": format!("application {} is not on the board", id.as_str()),
            });
            (StatusCode::NOT_FOUND, Json(payload)).into_response()
        }
        Err(PipelineError::Backend(error)) => {
            let payload = json!({
                "error": error.user_message(),
            });
            (StatusCode::BAD_GATEWAY, Json(payload)).into_response()
        }
        Err(other) => internal_error(other),
    }
}

pub(crate) async fn dismiss_notification_handler<B>(
    State(service): State<Arc<PipelineService<B>>>,
    Path(notification_id): Path<u64>,
) -> Response
where
    B: PipelineBackend + 'static,
{
    if service.dismiss_notification(notification_id) {
        StatusCode::NO_CONTENT.into_response()
    } else {
        let payload = json!({
            "error": format!("notification {notification_id} not found"),
        });
        (StatusCode::NOT_FOUND, Json(payload)).into_response()
    }
}

fn internal_error(error: PipelineError) -> Response {
    let payload = json!({
        "error": error.to_string(),
    });
    (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
}
