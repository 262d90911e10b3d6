use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{AmDecision, DropoutRequest, DropoutRequestView};
use super::service::DropoutWorkflowService;
use crate::domain::{DropoutRequestId, RoleId, RoleStatus, UserId};
use crate::error::ValidationError;
use crate::workflows::repository::{NotificationSink, PipelineRepository, TeamDirectory};
use crate::workflows::WorkflowError;

#[derive(Debug, Deserialize)]
pub struct RecordDropoutRequest {
    pub role_id: RoleId,
    pub recruiter_id: UserId,
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct AcknowledgeDropoutRequest {
    pub rm_id: UserId,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Decision payload. `decision` and `new_role_status` stay strings so malformed values
/// surface as validation errors instead of extractor rejections.
#[derive(Debug, Deserialize)]
pub struct DecideDropoutRequest {
    pub am_id: UserId,
    pub decision: String,
    #[serde(default)]
    pub new_role_status: Option<String>,
}

impl DecideDropoutRequest {
    fn parse(&self) -> Result<(AmDecision, Option<RoleStatus>), ValidationError> {
        let decision = self.decision.parse::<AmDecision>()?;
        let status = self
            .new_role_status
            .as_deref()
            .map(str::trim)
            .filter(|raw| !raw.is_empty())
            .map(str::parse::<RoleStatus>)
            .transpose()?;
        Ok((decision, status))
    }
}

/// Router builder for the dropout approval endpoints.
pub fn dropout_router<R, D, N>(service: Arc<DropoutWorkflowService<R, D, N>>) -> Router
where
    R: PipelineRepository + 'static,
    D: TeamDirectory + 'static,
    N: NotificationSink + 'static,
{
    Router::new()
        .route("/api/v1/dropouts", post(record_handler::<R, D, N>))
        .route("/api/v1/dropouts/:request_id", get(get_handler::<R, D, N>))
        .route(
            "/api/v1/dropouts/:request_id/acknowledge",
            post(acknowledge_handler::<R, D, N>),
        )
        .route(
            "/api/v1/dropouts/:request_id/decision",
            post(decide_handler::<R, D, N>),
        )
        .route(
            "/api/v1/dropouts/pending/rm/:rm_id",
            get(pending_for_rm_handler::<R, D, N>),
        )
        .route(
            "/api/v1/dropouts/pending/am/:am_id",
            get(pending_for_am_handler::<R, D, N>),
        )
        .route(
            "/api/v1/roles/:role_id/dropout",
            get(current_for_role_handler::<R, D, N>),
        )
        .with_state(service)
}

pub(crate) async fn record_handler<R, D, N>(
    State(service): State<Arc<DropoutWorkflowService<R, D, N>>>,
    Json(request): Json<RecordDropoutRequest>,
) -> Response
where
    R: PipelineRepository + 'static,
    D: TeamDirectory + 'static,
    N: NotificationSink + 'static,
{
    match service.record(&request.role_id, &request.recruiter_id, &request.reason) {
        Ok(created) => (StatusCode::CREATED, Json(created.view())).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn get_handler<R, D, N>(
    State(service): State<Arc<DropoutWorkflowService<R, D, N>>>,
    Path(request_id): Path<String>,
) -> Response
where
    R: PipelineRepository + 'static,
    D: TeamDirectory + 'static,
    N: NotificationSink + 'static,
{
    match service.get(&DropoutRequestId(request_id)) {
        Ok(request) => (StatusCode::OK, Json(request.view())).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn acknowledge_handler<R, D, N>(
    State(service): State<Arc<DropoutWorkflowService<R, D, N>>>,
    Path(request_id): Path<String>,
    Json(request): Json<AcknowledgeDropoutRequest>,
) -> Response
where
    R: PipelineRepository + 'static,
    D: TeamDirectory + 'static,
    N: NotificationSink + 'static,
{
    match service.acknowledge(&DropoutRequestId(request_id), &request.rm_id, request.notes) {
        Ok(acknowledged) => (StatusCode::OK, Json(acknowledged.view())).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn decide_handler<R, D, N>(
    State(service): State<Arc<DropoutWorkflowService<R, D, N>>>,
    Path(request_id): Path<String>,
    Json(request): Json<DecideDropoutRequest>,
) -> Response
where
    R: PipelineRepository + 'static,
    D: TeamDirectory + 'static,
    N: NotificationSink + 'static,
{
    let (decision, status) = match request.parse() {
        Ok(parsed) => parsed,
        Err(error) => return WorkflowError::from(error).into_response(),
    };

    match service.decide(&DropoutRequestId(request_id), &request.am_id, decision, status) {
        Ok(outcome) => {
            let payload = json!({
                "request": outcome.request.view(),
                "role": outcome.role,
                "discarded_associations": outcome.discarded_associations,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn pending_for_rm_handler<R, D, N>(
    State(service): State<Arc<DropoutWorkflowService<R, D, N>>>,
    Path(rm_id): Path<String>,
) -> Response
where
    R: PipelineRepository + 'static,
    D: TeamDirectory + 'static,
    N: NotificationSink + 'static,
{
    match service.pending_for_rm(&UserId(rm_id)) {
        Ok(requests) => (StatusCode::OK, Json(views(&requests))).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn pending_for_am_handler<R, D, N>(
    State(service): State<Arc<DropoutWorkflowService<R, D, N>>>,
    Path(am_id): Path<String>,
) -> Response
where
    R: PipelineRepository + 'static,
    D: TeamDirectory + 'static,
    N: NotificationSink + 'static,
{
    match service.pending_for_am(&UserId(am_id)) {
        Ok(requests) => (StatusCode::OK, Json(views(&requests))).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn current_for_role_handler<R, D, N>(
    State(service): State<Arc<DropoutWorkflowService<R, D, N>>>,
    Path(role_id): Path<String>,
) -> Response
where
    R: PipelineRepository + 'static,
    D: TeamDirectory + 'static,
    N: NotificationSink + 'static,
{
    match service.current_for_role(&RoleId(role_id)) {
        Ok(current) => {
            let view = current.as_ref().map(DropoutRequest::view);
            (StatusCode::OK, Json(json!({ "current": view }))).into_response()
        }
        Err(error) => error.into_response(),
    }
}

fn views(requests: &[DropoutRequest]) -> Vec<DropoutRequestView> {
    requests.iter().map(DropoutRequest::view).collect()
}
