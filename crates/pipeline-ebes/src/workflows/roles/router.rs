use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;

use super::service::{OpenRoleRequest, RoleService};
use crate::domain::{RoleId, RoleStatus, UserId};
use crate::error::ValidationError;
use crate::workflows::repository::{AssociationRepository, RoleRepository, TeamDirectory};
use crate::workflows::WorkflowError;

#[derive(Debug, Deserialize)]
pub struct OpenRolePayload {
    pub actor_id: UserId,
    #[serde(flatten)]
    pub role: OpenRoleRequest,
}

#[derive(Debug, Deserialize)]
pub struct ChangeStatusPayload {
    pub actor_id: UserId,
    pub status: String,
}

pub fn role_router<R, D>(service: Arc<RoleService<R, D>>) -> Router
where
    R: RoleRepository + AssociationRepository + 'static,
    D: TeamDirectory + 'static,
{
    Router::new()
        .route("/api/v1/roles", post(open_role_handler::<R, D>))
        .route("/api/v1/roles/:role_id", get(get_role_handler::<R, D>))
        .route(
            "/api/v1/roles/:role_id/status",
            put(change_status_handler::<R, D>),
        )
        .with_state(service)
}

pub(crate) async fn open_role_handler<R, D>(
    State(service): State<Arc<RoleService<R, D>>>,
    Json(payload): Json<OpenRolePayload>,
) -> Response
where
    R: RoleRepository + AssociationRepository + 'static,
    D: TeamDirectory + 'static,
{
    match service.open_role(&payload.actor_id, payload.role) {
        Ok(role) => (StatusCode::CREATED, Json(role)).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn get_role_handler<R, D>(
    State(service): State<Arc<RoleService<R, D>>>,
    Path(role_id): Path<String>,
) -> Response
where
    R: RoleRepository + AssociationRepository + 'static,
    D: TeamDirectory + 'static,
{
    match service.get(&RoleId(role_id)) {
        Ok(role) => (StatusCode::OK, Json(role)).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn change_status_handler<R, D>(
    State(service): State<Arc<RoleService<R, D>>>,
    Path(role_id): Path<String>,
    Json(payload): Json<ChangeStatusPayload>,
) -> Response
where
    R: RoleRepository + AssociationRepository + 'static,
    D: TeamDirectory + 'static,
{
    let status = match payload.status.parse::<RoleStatus>() {
        Ok(status) => status,
        Err(error) => return WorkflowError::from(ValidationError::from(error)).into_response(),
    };

    match service.change_status(&payload.actor_id, &RoleId(role_id), status) {
        Ok(change) => (StatusCode::OK, Json(change)).into_response(),
        Err(error) => error.into_response(),
    }
}
