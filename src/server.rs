use crate::cli::ServeArgs;
use crate::infra::{resolve_source, AppState};
use crate::routes::with_enrollment_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use enrollment_core::config::AppConfig;
use enrollment_core::enrollments::{EnrollmentStore, LoadOutcome};
use enrollment_core::error::AppError;
use enrollment_core::telemetry;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }
    if let Some(path) = args.source.take() {
        config.source.path = Some(path);
    }

    telemetry::init(&config.telemetry)?;

    let source = resolve_source(&config.source)?;
    let source_label = source.describe();
    let store = Arc::new(EnrollmentStore::new(Arc::new(source)));

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let initial_load = {
        let store = store.clone();
        let readiness = readiness_flag.clone();
        async move {
            match store.load().await {
                LoadOutcome::Loaded { count } => {
                    info!(count, source = %source_label, "initial enrollment load finished");
                }
                LoadOutcome::Failed(failure) => {
                    warn!(source = %source_label, error = %failure, "initial enrollment load failed");
                }
                LoadOutcome::AlreadyInFlight => {}
            }
            readiness.store(true, Ordering::Release);
        }
    };

    let app = with_enrollment_routes(store)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tokio::spawn(initial_load);

    info!(?config.environment, %addr, "enrollment desk listening");

    axum::serve(listener, app).await?;
    Ok(())
}
