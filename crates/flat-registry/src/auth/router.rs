use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Extension, Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use super::domain::{Role, UserId};
use super::token::TokenService;
use crate::error::ApiError;
use crate::request_id::RequestId;

/// Router issuing throwaway identities for development and smoke testing.
pub fn token_router(tokens: Arc<TokenService>) -> Router {
    Router::new()
        .route("/dummyLogin", get(dummy_login_handler))
        .with_state(tokens)
}

#[derive(Debug, Deserialize)]
pub(crate) struct DummyLoginQuery {
    #[serde(default)]
    pub(crate) user_type: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DummyLoginResponse {
    pub user_id: UserId,
    pub role: Role,
    pub token: String,
}

pub(crate) async fn dummy_login_handler(
    State(tokens): State<Arc<TokenService>>,
    request_id: Option<Extension<RequestId>>,
    Query(query): Query<DummyLoginQuery>,
) -> Result<Json<DummyLoginResponse>, ApiError> {
    let request_id = request_id.map(|Extension(id)| id);

    let role = query
        .user_type
        .as_deref()
        .ok_or_else(|| ApiError::validation("user_type parameter is required"))
        .and_then(|raw| {
            raw.parse::<Role>()
                .map_err(|err| ApiError::validation(err.to_string()))
        })
        .map_err(|err| err.with_request_id(request_id.as_ref()))?;

    let user_id = UserId::generate();
    let token = tokens
        .issue(user_id, role, tokens.default_ttl())
        .map_err(|err| {
            error!(error = %err, "failed to sign token");
            ApiError::internal("failed to sign token").with_request_id(request_id.as_ref())
        })?;

    info!(%user_id, role = role.label(), "issued dummy token");

    Ok(Json(DummyLoginResponse {
        user_id,
        role,
        token,
    }))
}
