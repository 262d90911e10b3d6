use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;

use super::aggregates::{
    AccountManagerAggregates, ActivityAggregator, RecruiterAggregates,
    RecruitmentManagerAggregates,
};
use super::history::EbesHistoryRepository;
use super::service::ScoringService;
use super::{
    apply_quality_bonus, compute_account_manager_score, compute_recruiter_score,
    compute_recruitment_manager_score,
};
use crate::domain::{DateRange, UserId};
use crate::error::ValidationError;
use crate::workflows::repository::RepositoryError;

/// Optional reporting window shared by the read endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct ScoreWindow {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl ScoreWindow {
    /// A one-sided window is open on the missing end.
    pub fn to_range(&self) -> Result<Option<DateRange>, ValidationError> {
        if self.from.is_none() && self.to.is_none() {
            return Ok(None);
        }

        let from = self.from.unwrap_or(NaiveDate::MIN);
        let to = self.to.unwrap_or(NaiveDate::MAX);
        DateRange::new(from, to)
            .map(Some)
            .ok_or_else(|| ValidationError::InvertedDateRange {
                from: from.to_string(),
                to: to.to_string(),
            })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SnapshotRequest {
    #[serde(default)]
    pub day: Option<NaiveDate>,
}

/// Router builder exposing the pure formulas and the aggregator-backed reads.
pub fn scoring_router<G, H>(service: Arc<ScoringService<G, H>>) -> Router
where
    G: ActivityAggregator + 'static,
    H: EbesHistoryRepository + 'static,
{
    Router::new()
        .route("/api/v1/ebes/recruiter/compute", post(compute_recruiter))
        .route(
            "/api/v1/ebes/account-manager/compute",
            post(compute_account_manager),
        )
        .route(
            "/api/v1/ebes/recruitment-manager/compute",
            post(compute_recruitment_manager),
        )
        .route(
            "/api/v1/ebes/recruiters/:user_id",
            get(recruiter_handler::<G, H>),
        )
        .route(
            "/api/v1/ebes/account-managers/:user_id",
            get(account_manager_handler::<G, H>),
        )
        .route(
            "/api/v1/ebes/recruitment-managers/:user_id",
            get(recruitment_manager_handler::<G, H>),
        )
        .route(
            "/api/v1/ebes/recruitment-managers/:user_id/snapshots",
            get(snapshots_handler::<G, H>).post(record_snapshot_handler::<G, H>),
        )
        .with_state(service)
}

pub(crate) async fn compute_recruiter(Json(input): Json<RecruiterAggregates>) -> Response {
    if let Err(error) = input.validate() {
        return validation_failure(error);
    }
    Json(compute_recruiter_score(&input)).into_response()
}

pub(crate) async fn compute_account_manager(
    Json(input): Json<AccountManagerAggregates>,
) -> Response {
    Json(compute_account_manager_score(&input)).into_response()
}

pub(crate) async fn compute_recruitment_manager(
    Json(input): Json<RecruitmentManagerAggregates>,
) -> Response {
    if let Err(error) = input.validate() {
        return validation_failure(error);
    }
    let average_quality = input.average_quality;
    let result = apply_quality_bonus(compute_recruitment_manager_score(&input), average_quality);
    Json(result).into_response()
}

pub(crate) async fn recruiter_handler<G, H>(
    State(service): State<Arc<ScoringService<G, H>>>,
    Path(user_id): Path<String>,
    Query(window): Query<ScoreWindow>,
) -> Response
where
    G: ActivityAggregator + 'static,
    H: EbesHistoryRepository + 'static,
{
    let range = match window.to_range() {
        Ok(range) => range,
        Err(error) => return validation_failure(error),
    };

    match service.recruiter_score(&UserId(user_id), range.as_ref()) {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(error) => repository_failure(error),
    }
}

pub(crate) async fn account_manager_handler<G, H>(
    State(service): State<Arc<ScoringService<G, H>>>,
    Path(user_id): Path<String>,
    Query(window): Query<ScoreWindow>,
) -> Response
where
    G: ActivityAggregator + 'static,
    H: EbesHistoryRepository + 'static,
{
    let range = match window.to_range() {
        Ok(range) => range,
        Err(error) => return validation_failure(error),
    };

    match service.account_manager_score(&UserId(user_id), range.as_ref()) {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(error) => repository_failure(error),
    }
}

pub(crate) async fn recruitment_manager_handler<G, H>(
    State(service): State<Arc<ScoringService<G, H>>>,
    Path(user_id): Path<String>,
    Query(window): Query<ScoreWindow>,
) -> Response
where
    G: ActivityAggregator + 'static,
    H: EbesHistoryRepository + 'static,
{
    let range = match window.to_range() {
        Ok(range) => range,
        Err(error) => return validation_failure(error),
    };

    match service.recruitment_manager_score(&UserId(user_id), range.as_ref()) {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(error) => repository_failure(error),
    }
}

pub(crate) async fn record_snapshot_handler<G, H>(
    State(service): State<Arc<ScoringService<G, H>>>,
    Path(user_id): Path<String>,
    Query(window): Query<ScoreWindow>,
    Json(request): Json<SnapshotRequest>,
) -> Response
where
    G: ActivityAggregator + 'static,
    H: EbesHistoryRepository + 'static,
{
    let range = match window.to_range() {
        Ok(range) => range,
        Err(error) => return validation_failure(error),
    };
    let day = request.day.unwrap_or_else(|| Utc::now().date_naive());

    match service.record_daily_snapshot(&UserId(user_id), day, range.as_ref()) {
        Ok(snapshot) => (StatusCode::OK, Json(snapshot)).into_response(),
        Err(error) => repository_failure(error),
    }
}

pub(crate) async fn snapshots_handler<G, H>(
    State(service): State<Arc<ScoringService<G, H>>>,
    Path(user_id): Path<String>,
) -> Response
where
    G: ActivityAggregator + 'static,
    H: EbesHistoryRepository + 'static,
{
    match service.snapshots(&UserId(user_id)) {
        Ok(history) => (StatusCode::OK, Json(history)).into_response(),
        Err(error) => repository_failure(error),
    }
}

fn validation_failure(error: ValidationError) -> Response {
    let payload = json!({ "error": error.to_string() });
    (StatusCode::UNPROCESSABLE_ENTITY, Json(payload)).into_response()
}

fn repository_failure(error: RepositoryError) -> Response {
    let status = match error {
        RepositoryError::NotFound => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let payload = json!({ "error": error.to_string() });
    (status, Json(payload)).into_response()
}
