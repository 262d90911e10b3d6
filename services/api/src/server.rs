use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryPipeline, TracingNotificationSink};
use crate::routes::with_pipeline_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use pipeline_ebes::config::AppConfig;
use pipeline_ebes::error::AppError;
use pipeline_ebes::telemetry;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = Arc::new(InMemoryPipeline::new(&config.workflow));
    let notifications = Arc::new(TracingNotificationSink::default());

    let app = with_pipeline_routes(store, notifications, config.workflow.clone())
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        max_active_roles = config.workflow.max_active_roles,
        "pipeline scoring service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
