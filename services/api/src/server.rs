use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemorySubscriptions, TracingMailSender};
use crate::routes::{subscription_router, with_ops_routes};
use axum::{middleware, Extension, Router};
use axum_prometheus::PrometheusMetricLayer;
use flat_registry::auth::{token_router, TokenService};
use flat_registry::config::AppConfig;
use flat_registry::error::AppError;
use flat_registry::listings::{listing_router, InMemoryListingStore, ListingService};
use flat_registry::notifications::notification_channel;
use flat_registry::request_id::assign_request_id;
use flat_registry::telemetry;
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

    let tokens = Arc::new(TokenService::from_config(&config.auth)?);

    let subscriptions = Arc::new(InMemorySubscriptions::default());
    let (dispatcher, queue) = notification_channel(config.notifications.queue_capacity);
    let workers = queue.start(
        config.notifications.workers,
        subscriptions.clone(),
        Arc::new(TracingMailSender),
    );

    let listings = Arc::new(ListingService::new(
        Arc::new(InMemoryListingStore::default()),
        dispatcher,
    ));

    let app = with_ops_routes(
        Router::new()
            .merge(token_router(tokens.clone()))
            .merge(listing_router(listings, tokens.clone()))
            .merge(subscription_router(subscriptions, tokens)),
    )
    .layer(Extension(app_state))
    .layer(prometheus_layer)
    .layer(middleware::from_fn(assign_request_id));

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        notify_workers = workers.len(),
        "flat registry ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
