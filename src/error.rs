use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

#[derive(Serialize)]
pub(crate) struct ErrorResponse {
    pub(crate) error: String,
}

pub(crate) fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("storage rejected the write: {0}")]
    Rejected(String),
    #[error("storage i/o error: {0}")]
    Io(String),
    #[error("storage data is corrupt: {0}")]
    Corrupt(String),
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Io(err.to_string())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LocationError {
    #[error("location services are not available")]
    Unsupported,
    #[error("failed to get location: {0}")]
    Failed(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RelayError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{message}")]
    Transport { message: String, endpoint_gone: bool },
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = match &self {
            RelayError::BadRequest(_) => StatusCode::BAD_REQUEST,
            RelayError::Transport { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        error_response(status, self.to_string())
    }
}

/// Failure of a single recipient's push. Never aborts the rest of a fan-out.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("push relay failed: {0}")]
    Relay(#[from] RelayError),
    #[error("push delivery timed out after {0:?}")]
    TimedOut(std::time::Duration),
    #[error("push delivery task failed: {0}")]
    Panicked(String),
}

impl DeliveryError {
    pub fn is_endpoint_gone(&self) -> bool {
        matches!(
            self,
            DeliveryError::Relay(RelayError::Transport {
                endpoint_gone: true,
                ..
            })
        )
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("Failed to get your location: {0}")]
    LocationUnavailable(#[from] LocationError),
    #[error("Could not determine your user id.")]
    IdentityUnavailable,
    #[error("Failed to send: {0}")]
    Storage(#[from] StorageError),
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        let status = match &self {
            DispatchError::LocationUnavailable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            DispatchError::IdentityUnavailable => StatusCode::UNAUTHORIZED,
            DispatchError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        error_response(status, self.to_string())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("Could not determine your user id.")]
    IdentityUnavailable,
    #[error("Failed to save push subscription: {0}")]
    Storage(#[from] StorageError),
}

impl IntoResponse for RegistrationError {
    fn into_response(self) -> Response {
        let status = match &self {
            RegistrationError::IdentityUnavailable => StatusCode::UNAUTHORIZED,
            RegistrationError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        error_response(status, self.to_string())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("push subscription failed: {0}")]
pub struct PlatformError(pub String);
