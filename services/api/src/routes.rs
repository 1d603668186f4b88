use crate::infra::{AppState, InMemorySubscriptions};
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{middleware, Extension, Json, Router};
use flat_registry::auth::{authenticate, Identity, TokenService};
use flat_registry::error::ApiError;
use flat_registry::listings::HouseId;
use flat_registry::notifications::ContactAddress;
use flat_registry::request_id::RequestId;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct SubscribeRequest {
    pub(crate) email: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct SubscribeResponse {
    pub(crate) message: &'static str,
}

/// Liveness, readiness and Prometheus endpoints. They read [`AppState`] from
/// an `Extension` layer added by the caller.
pub(crate) fn with_ops_routes(router: Router) -> Router {
    router
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

pub(crate) fn subscription_router(
    subscriptions: Arc<InMemorySubscriptions>,
    tokens: Arc<TokenService>,
) -> Router {
    Router::new()
        .route("/house/:id/subscribe", post(subscribe_endpoint))
        .route_layer(middleware::from_fn_with_state(tokens, authenticate))
        .with_state(subscriptions)
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn subscribe_endpoint(
    State(subscriptions): State<Arc<InMemorySubscriptions>>,
    identity: Identity,
    request_id: Option<Extension<RequestId>>,
    house_id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<SubscribeRequest>, JsonRejection>,
) -> Result<Json<SubscribeResponse>, ApiError> {
    let request_id = request_id.map(|Extension(id)| id);
    let reject = |message: String| ApiError::validation(message).with_request_id(request_id.as_ref());

    let Path(house_id) = house_id.map_err(|rejection| reject(rejection.body_text()))?;
    if house_id < 1 {
        return Err(reject("house_id must be a positive integer".to_string()));
    }
    let Json(request) = payload.map_err(|rejection| reject(rejection.body_text()))?;
    let contact = ContactAddress::parse(&request.email).map_err(|err| reject(err.to_string()))?;

    let added = subscriptions
        .subscribe(HouseId(house_id), contact.clone())
        .map_err(|err| {
            error!(error = %err, house_id, "failed to store subscription");
            ApiError::internal("failed to subscribe").with_request_id(request_id.as_ref())
        })?;

    info!(
        user_id = %identity.user_id,
        house_id,
        %contact,
        added,
        "house subscription recorded"
    );

    Ok(Json(SubscribeResponse {
        message: "subscribed",
    }))
}
