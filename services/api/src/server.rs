use crate::cli::ServeArgs;
use crate::infra::AppState;
use crate::routes::with_pipeline_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use hiring_pipeline::config::{validate_backend_url, AppConfig};
use hiring_pipeline::error::AppError;
use hiring_pipeline::telemetry;
use hiring_pipeline::workflows::pipeline::{
    spawn_periodic_refresh, HttpPipelineBackend, PipelineError, PipelineService,
};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }
    if let Some(backend_url) = args.backend_url.take() {
        validate_backend_url(&backend_url)?;
        config.backend.base_url = backend_url;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let backend = HttpPipelineBackend::new(&config.backend).map_err(PipelineError::from)?;
    info!(backend = %backend.base_url(), "using recruiting backend");
    let pipeline_service = Arc::new(PipelineService::new(
        Arc::new(backend),
        config.pipeline.clone(),
    ));

    let app = with_pipeline_routes(Arc::clone(&pipeline_service))
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    match pipeline_service.refresh().await {
        Ok(summary) => info!(
            applications = summary.applications,
            jobs = summary.jobs,
            "initial board load complete"
        ),
        Err(error) => warn!(%error, "initial board load failed; serving an empty board"),
    }
    readiness_flag.store(true, Ordering::Release);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let refresher = config
        .pipeline
        .refresh_interval
        .map(|every| spawn_periodic_refresh(Arc::clone(&pipeline_service), every, shutdown_rx));

    info!(?config.environment, %addr, "hiring pipeline service ready");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    readiness_flag.store(false, Ordering::Release);
    let _ = shutdown_tx.send(true);
    if let Some(handle) = refresher {
        if let Err(error) = handle.await {
            warn!(%error, "periodic refresh task ended abnormally");
        }
    }
    info!("hiring pipeline service stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        warn!(%error, "could not listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
