use crate::cli::ServeArgs;
use crate::infra::AppState;
use crate::routes::with_utility_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;
use utility_providers::config::AppConfig;
use utility_providers::error::AppError;
use utility_providers::telemetry;
use utility_providers::workflows::utilities::ProviderSuggestionService;

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
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let suggestion_service = Arc::new(ProviderSuggestionService::from_config(&config.suggestions)?);
    let eviction = suggestion_service.spawn_cache_eviction();

    let app = with_utility_routes(suggestion_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "utility provider suggestion service ready");

    let served = axum::serve(listener, app).await;
    eviction.abort();
    served?;
    Ok(())
}
