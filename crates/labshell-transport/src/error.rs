//! HTTP error mapping.

use std::any::Any;

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use labshell_core::SessionError;

use crate::protocol::ErrorBody;

const INTERNAL_MESSAGE: &str = "An unexpected error occurred";

/// API error.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("Route {method} {path} does not exist")]
    RouteNotFound { method: String, path: String },
    #[error("Too many requests, retry in {retry_after}s")]
    RateLimited { retry_after: u64 },
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Session(SessionError::Validation(vec![rejection.body_text()]))
    }
}

impl ApiError {
    fn parts(&self) -> (StatusCode, ErrorBody) {
        let body = |error: &str, message: String| ErrorBody {
            error: error.to_string(),
            message,
            details: Vec::new(),
        };

        match self {
            Self::Session(SessionError::Validation(details)) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error: "Validation failed".to_string(),
                    message: "The request payload is invalid".to_string(),
                    details: details.clone(),
                },
            ),
            Self::Session(SessionError::NotFound(id)) => (
                StatusCode::NOT_FOUND,
                body("Session not found", format!("No session found with ID: {id}")),
            ),
            Self::Session(SessionError::Conflict { machine_name }) => (
                StatusCode::CONFLICT,
                body(
                    "Duplicate session",
                    format!("A session with machine name {machine_name} already exists"),
                ),
            ),
            Self::Session(SessionError::InvalidState { status }) => (
                StatusCode::BAD_REQUEST,
                body(
                    "Session inactive",
                    format!("The session must be active to run commands (current status: {status})"),
                ),
            ),
            Self::Session(SessionError::Internal(_)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                body("Internal server error", INTERNAL_MESSAGE.to_string()),
            ),
            Self::RouteNotFound { .. } => {
                (StatusCode::NOT_FOUND, body("Route not found", self.to_string()))
            }
            Self::RateLimited { .. } => (
                StatusCode::TOO_MANY_REQUESTS,
                body(
                    "Too many requests from this IP, please try again later",
                    self.to_string(),
                ),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Session(SessionError::Internal(ref detail)) = self {
            tracing::error!("Internal error: {detail}");
        }

        let (status, body) = self.parts();
        let mut response = (status, Json(body)).into_response();

        if let Self::RateLimited { retry_after } = self {
            if let Ok(value) = HeaderValue::from_str(&retry_after.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }

        response
    }
}

/// Turn a handler panic into the generic 500 body.
#[allow(clippy::needless_pass_by_value)]
pub fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");

    ApiError::Session(SessionError::Internal(format!("handler panicked: {detail}")))
        .into_response()
}
