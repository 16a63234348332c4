use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::warn;

use super::dto::ErrorResponse;
use crate::registry::RegistryError;

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    ServiceUnavailable(String),
    InternalError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, details) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "Not Found", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "Bad Request", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "Conflict", msg),
            ApiError::ServiceUnavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, "Service Unavailable", msg)
            }
            ApiError::InternalError(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal Server Error",
                msg,
            ),
        };

        let body = Json(ErrorResponse {
            error: error.to_string(),
            details: Some(details),
        });

        (status, body).into_response()
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        let msg = err.to_string();
        match err {
            RegistryError::InvalidIdentity(_) | RegistryError::InvalidResourceVersion(_) => {
                ApiError::BadRequest(msg)
            }
            RegistryError::NotFound { .. } => ApiError::NotFound(msg),
            RegistryError::AlreadyExists { .. } | RegistryError::Conflict { .. } => {
                ApiError::Conflict(msg)
            }
            RegistryError::StorageUnavailable(_) => ApiError::ServiceUnavailable(msg),
            RegistryError::Codec(_) => {
                warn!(error = %msg, "stored object could not be processed");
                ApiError::InternalError(msg)
            }
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
