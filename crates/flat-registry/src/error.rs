use crate::auth::{AuthError, TokenError};
use crate::config::ConfigError;
use crate::listings::ListingError;
use crate::request_id::RequestId;
use crate::telemetry::TelemetryError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use std::fmt;
use tracing::error;

/// Process-level failures surfaced by the binary entry point.
#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Token(TokenError),
    Io(std::io::Error),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Token(err) => write!(f, "token error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Token(err) => Some(err),
            AppError::Io(err) => Some(err),
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<TokenError> for AppError {
    fn from(value: TokenError) -> Self {
        Self::Token(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

/// Error envelope returned to HTTP callers.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    request_id: Option<String>,
}

#[derive(Serialize)]
struct ErrorEnvelope<'a> {
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_id: Option<&'a str>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            request_id: None,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn with_request_id(mut self, request_id: Option<&RequestId>) -> Self {
        if let Some(id) = request_id {
            self.request_id = Some(id.0.clone());
        }
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorEnvelope {
            message: &self.message,
            request_id: self.request_id.as_deref(),
        });
        (self.status, body).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(value: AuthError) -> Self {
        match value {
            AuthError::Unauthenticated => Self::new(StatusCode::UNAUTHORIZED, "unauthorized"),
            AuthError::Invalid(err) => Self::new(StatusCode::FORBIDDEN, err.to_string()),
            AuthError::Forbidden { .. } => Self::new(StatusCode::FORBIDDEN, value.to_string()),
            AuthError::IdentityMissing => Self::internal("failed to resolve caller identity"),
        }
    }
}

impl From<ListingError> for ApiError {
    fn from(value: ListingError) -> Self {
        match value {
            ListingError::Validation(err) => Self::validation(err.to_string()),
            ListingError::Conflict => Self::new(StatusCode::CONFLICT, value.to_string()),
            ListingError::Repository(err) => {
                error!(error = %err, "listing storage failure");
                Self::internal("listing storage unavailable")
            }
        }
    }
}
