use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Json, Router};
use pipeline_ebes::config::WorkflowConfig;
use pipeline_ebes::scoring::{
    scoring_router, ActivityAggregator, EbesHistoryRepository, ScoringService,
};
use pipeline_ebes::workflows::dropout::{dropout_router, DropoutWorkflowService};
use pipeline_ebes::workflows::ledger::{ledger_router, CandidateLedger};
use pipeline_ebes::workflows::repository::{NotificationSink, PipelineRepository, TeamDirectory};
use pipeline_ebes::workflows::roles::{role_router, RoleService};
use serde_json::json;
use std::sync::Arc;

/// Builds every service over one shared store and mounts their routers next to the
/// operational endpoints.
pub(crate) fn with_pipeline_routes<S, N>(
    store: Arc<S>,
    notifications: Arc<N>,
    config: WorkflowConfig,
) -> Router
where
    S: PipelineRepository + TeamDirectory + ActivityAggregator + EbesHistoryRepository + 'static,
    N: NotificationSink + 'static,
{
    let dropouts = Arc::new(DropoutWorkflowService::new(
        Arc::clone(&store),
        Arc::clone(&store),
        notifications,
    ));
    let roles = Arc::new(RoleService::new(
        Arc::clone(&store),
        Arc::clone(&store),
        config,
    ));
    let ledger = Arc::new(CandidateLedger::new(Arc::clone(&store)));
    let scoring = Arc::new(ScoringService::new(Arc::clone(&store), store));

    dropout_router(dropouts)
        .merge(role_router(roles))
        .merge(ledger_router(ledger))
        .merge(scoring_router(scoring))
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    if ready {
        (StatusCode::OK, Json(json!({ "status": "ready" })))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "initializing" })),
        )
    }
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::{InMemoryPipeline, TracingNotificationSink};
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use pipeline_ebes::domain::{CandidateId, RoleId, UserId, UserRole};
    use serde_json::Value;
    use std::sync::atomic::AtomicBool;
    use tower::ServiceExt;

    fn app_state(ready: bool) -> AppState {
        let recorder = PrometheusBuilder::new().build_recorder();
        AppState {
            readiness: Arc::new(AtomicBool::new(ready)),
            metrics: Arc::new(recorder.handle()),
        }
    }

    fn seeded() -> (InMemoryPipeline, Arc<TracingNotificationSink>) {
        let store = InMemoryPipeline::new(&WorkflowConfig::default());
        store
            .add_user("rec-1", UserRole::Recruiter, Some("team-1"))
            .unwrap();
        store
            .add_user("am-1", UserRole::AccountManager, Some("team-1"))
            .unwrap();
        store
            .add_user("rm-1", UserRole::RecruitmentManager, Some("team-1"))
            .unwrap();
        store.assign_manager("team-1", "rm-1").unwrap();
        store.add_candidate("cand-1", "rec-1").unwrap();
        (store, Arc::new(TracingNotificationSink::default()))
    }

    fn app(store: InMemoryPipeline, sink: Arc<TracingNotificationSink>, ready: bool) -> Router {
        with_pipeline_routes(Arc::new(store), sink, WorkflowConfig::default())
            .layer(Extension(app_state(ready)))
    }

    async fn call(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.clone().oneshot(request).await.expect("route executes");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), 64 * 1024)
            .await
            .expect("body readable");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }

    fn post(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap()
    }

    #[tokio::test]
    async fn readiness_reflects_flag() {
        let (store, sink) = seeded();
        let router = app(store, sink, false);
        let ready = Request::get("/ready").body(Body::empty()).unwrap();
        let (status, body) = call(&router, ready).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "initializing");

        let health = Request::get("/health").body(Body::empty()).unwrap();
        let (status, body) = call(&router, health).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn metrics_render_as_prometheus_text() {
        let (store, sink) = seeded();
        let router = app(store, sink, true);
        let response = router
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; version=0.0.4"
        );
    }

    #[tokio::test]
    async fn dropout_flow_feeds_the_recruiter_score() {
        let (store, sink) = seeded();
        let router = app(store.clone(), Arc::clone(&sink), true);

        let (status, role) = call(
            &router,
            post(
                "/api/v1/roles",
                json!({
                    "actor_id": "am-1",
                    "account_manager_id": "am-1",
                    "team_id": "team-1",
                    "client_id": "client-1",
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let role_id = RoleId::new(role["id"].as_str().expect("role id"));
        store
            .engage(
                &CandidateId::new("cand-1"),
                &role_id,
                &UserId::new("rec-1"),
                chrono::Utc::now(),
            )
            .unwrap();

        let (status, created) = call(
            &router,
            post(
                "/api/v1/dropouts",
                json!({ "role_id": role_id, "recruiter_id": "rec-1", "reason": "Counter offer" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = created["id"].as_str().expect("request id").to_string();

        let (status, _) = call(
            &router,
            post(
                &format!("/api/v1/dropouts/{id}/acknowledge"),
                json!({ "rm_id": "rm-1" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, decided) = call(
            &router,
            post(
                &format!("/api/v1/dropouts/{id}/decision"),
                json!({ "am_id": "am-1", "decision": "accept", "new_role_status": "lost" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(decided["role"]["status"], "lost");
        assert_eq!(decided["discarded_associations"], 1);

        let (status, score) = call(
            &router,
            Request::get("/api/v1/ebes/recruiters/rec-1")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(score["score"], 0.0);
        assert_eq!(score["cap"], 95.0);
        assert_eq!(sink.delivered().len(), 4);
        assert_eq!(store.recruiter(&UserId::new("rec-1"), None).unwrap().accepted_dropouts, 1);
    }
}
