//! Request gate: `authenticate` resolves the caller from a bearer token,
//! `authorize` enforces a route's role requirement. Authenticate must wrap
//! authorize; identity reaches handlers only through the [`Identity`] extractor.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::http::{header, HeaderMap};
use axum::middleware::Next;
use axum::response::Response;
use tracing::{debug, error, warn};

use super::domain::{Identity, Role};
use super::token::{TokenError, TokenService};
use crate::error::ApiError;
use crate::request_id::RequestId;

const BEARER_PREFIX: &str = "Bearer ";

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("authorization header is missing")]
    Unauthenticated,
    #[error("invalid token: {0}")]
    Invalid(#[source] TokenError),
    #[error("{required} role required")]
    Forbidden { required: Role },
    #[error("caller identity was not resolved before authorization")]
    IdentityMissing,
}

/// Resolve the caller from the `Authorization` header.
pub fn identify(headers: &HeaderMap, tokens: &TokenService) -> Result<Identity, AuthError> {
    let raw = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::Unauthenticated)?;

    let token = raw
        .to_str()
        .ok()
        .and_then(|value| value.strip_prefix(BEARER_PREFIX))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::Invalid(TokenError::Malformed))?;

    tokens.verify(token).map_err(AuthError::Invalid)
}

/// Check an already-resolved identity against a role requirement.
pub fn require_role(identity: Option<&Identity>, required: Role) -> Result<Identity, AuthError> {
    let identity = identity.ok_or(AuthError::IdentityMissing)?;
    if identity.role != required {
        return Err(AuthError::Forbidden { required });
    }
    Ok(*identity)
}

pub async fn authenticate(
    State(tokens): State<Arc<TokenService>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let request_id = request.extensions().get::<RequestId>().cloned();

    let identity = identify(request.headers(), &tokens).map_err(|err| {
        warn!(
            request_id = request_id.as_ref().map(RequestId::as_str),
            error = %err,
            "request rejected by authentication"
        );
        ApiError::from(err).with_request_id(request_id.as_ref())
    })?;

    debug!(
        request_id = request_id.as_ref().map(RequestId::as_str),
        user_id = %identity.user_id,
        role = identity.role.label(),
        "request authenticated"
    );

    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

pub async fn authorize(
    State(required): State<Role>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let request_id = request.extensions().get::<RequestId>().cloned();

    if let Err(err) = require_role(request.extensions().get::<Identity>(), required) {
        match &err {
            AuthError::IdentityMissing => error!(
                request_id = request_id.as_ref().map(RequestId::as_str),
                "authorize ran without a resolved identity"
            ),
            _ => warn!(
                request_id = request_id.as_ref().map(RequestId::as_str),
                error = %err,
                "request rejected by authorization"
            ),
        }
        return Err(ApiError::from(err).with_request_id(request_id.as_ref()));
    }

    Ok(next.run(request).await)
}

#[async_trait]
impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<Identity>().copied().ok_or_else(|| {
            ApiError::from(AuthError::IdentityMissing)
                .with_request_id(parts.extensions.get::<RequestId>())
        })
    }
}
