use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::service::CandidateLedger;
use crate::domain::{CandidateId, RoleId};
use crate::workflows::repository::AssociationRepository;

#[derive(Debug, Default, Deserialize)]
pub struct DiscardAssociationRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

/// Router builder for the candidate ledger endpoints.
pub fn ledger_router<R>(ledger: Arc<CandidateLedger<R>>) -> Router
where
    R: AssociationRepository + 'static,
{
    Router::new()
        .route(
            "/api/v1/candidates/:candidate_id/roles/:role_id/discard",
            post(discard_association_handler::<R>),
        )
        .route(
            "/api/v1/candidates/:candidate_id/discard",
            post(discard_candidate_handler::<R>),
        )
        .route(
            "/api/v1/candidates/:candidate_id/restore",
            post(restore_candidate_handler::<R>),
        )
        .with_state(ledger)
}

pub(crate) async fn discard_association_handler<R>(
    State(ledger): State<Arc<CandidateLedger<R>>>,
    Path((candidate_id, role_id)): Path<(String, String)>,
    request: Option<Json<DiscardAssociationRequest>>,
) -> Response
where
    R: AssociationRepository + 'static,
{
    let reason = request.and_then(|Json(request)| request.reason);
    match ledger.discard_association(
        &CandidateId(candidate_id),
        &RoleId(role_id),
        reason.as_deref(),
    ) {
        Ok(changed) => (StatusCode::OK, Json(json!({ "changed": changed }))).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn discard_candidate_handler<R>(
    State(ledger): State<Arc<CandidateLedger<R>>>,
    Path(candidate_id): Path<String>,
) -> Response
where
    R: AssociationRepository + 'static,
{
    match ledger.discard_candidate(&CandidateId(candidate_id)) {
        Ok(discarded) => {
            (StatusCode::OK, Json(json!({ "discarded": discarded }))).into_response()
        }
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn restore_candidate_handler<R>(
    State(ledger): State<Arc<CandidateLedger<R>>>,
    Path(candidate_id): Path<String>,
) -> Response
where
    R: AssociationRepository + 'static,
{
    match ledger.restore_candidate(&CandidateId(candidate_id)) {
        Ok(restored) => (StatusCode::OK, Json(json!({ "restored": restored }))).into_response(),
        Err(error) => error.into_response(),
    }
}
