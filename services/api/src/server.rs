use crate::cli::ServeArgs;
use crate::infra::AppState;
use crate::routes::with_kpi_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use kpi_commission::config::AppConfig;
use kpi_commission::error::AppError;
use kpi_commission::kpi::KpiProcessor;
use kpi_commission::telemetry;
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

    let processor = Arc::new(KpiProcessor::from_config(&config.kpi));

    let app = with_kpi_routes(processor)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        defaulting = config.kpi.defaulting.label(),
        stored_base_rate = config.kpi.stored_base_rate,
        "kpi commission service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
