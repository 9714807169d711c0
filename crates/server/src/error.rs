use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use storefront_core::errors::{ApplicationError, InterfaceError};
use tracing::{error, warn};
use uuid::Uuid;

pub const CORRELATION_HEADER: &str = "x-correlation-id";

/// Request correlation id: the caller's `x-correlation-id` when present,
/// otherwise a fresh uuid.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CorrelationId(pub String);

impl CorrelationId {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        headers
            .get(CORRELATION_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(|value| Self(value.to_string()))
            .unwrap_or_else(|| Self(Uuid::new_v4().to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<S: Send + Sync> FromRequestParts<S> for CorrelationId {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
    pub user_message: &'static str,
    pub correlation_id: String,
}

#[derive(Debug)]
pub struct ApiError(pub InterfaceError);

impl ApiError {
    pub fn from_application(error: ApplicationError, correlation_id: &CorrelationId) -> Self {
        Self(error.into_interface(correlation_id.as_str()))
    }

    pub fn status(&self) -> StatusCode {
        match &self.0 {
            InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            InterfaceError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            InterfaceError::Forbidden { .. } => StatusCode::FORBIDDEN,
            InterfaceError::NotFound { .. } => StatusCode::NOT_FOUND,
            InterfaceError::Conflict { .. } => StatusCode::CONFLICT,
            InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match &self.0 {
            InterfaceError::BadRequest { .. } => "bad_request",
            InterfaceError::Unauthorized { .. } => "unauthorized",
            InterfaceError::Forbidden { .. } => "forbidden",
            InterfaceError::NotFound { .. } => "not_found",
            InterfaceError::Conflict { .. } => "conflict",
            InterfaceError::ServiceUnavailable { .. } => "service_unavailable",
            InterfaceError::Internal { .. } => "internal",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(
                event_name = "api.request.failed",
                correlation_id = %self.0.correlation_id(),
                status = status.as_u16(),
                error = %self.0,
                "request failed"
            );
        } else {
            warn!(
                event_name = "api.request.rejected",
                correlation_id = %self.0.correlation_id(),
                status = status.as_u16(),
                error = %self.0,
                "request rejected"
            );
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code(),
                message: self.0.message().to_string(),
                user_message: self.0.user_message(),
                correlation_id: self.0.correlation_id().to_string(),
            },
        };
        (status, Json(body)).into_response()
    }
}

/// Lifts fallible service results into handler results stamped with the
/// request's correlation id.
pub trait ResultExt<T> {
    fn or_api(self, correlation_id: &CorrelationId) -> Result<T, ApiError>;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
    E: Into<ApplicationError>,
{
    fn or_api(self, correlation_id: &CorrelationId) -> Result<T, ApiError> {
        self.map_err(|error| ApiError::from_application(error.into(), correlation_id))
    }
}
