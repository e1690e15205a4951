//! api error handling for http handlers

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

/// json body for error replies.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    /// human-readable description of what went wrong.
    pub error: String,
}

/// api error type for handler responses
#[derive(Debug)]
pub enum ApiError {
    /// malformed request (400)
    BadRequest(String),
    /// internal server error (500)
    Internal(String),
    /// an external collaborator is unavailable (502)
    Upstream(String),
}

impl ApiError {
    /// create a bad request error
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    /// create internal server error from any error type
    pub fn internal(e: impl std::fmt::Display) -> Self {
        Self::Internal(e.to_string())
    }

    /// create an upstream error from any error type
    pub fn upstream(e: impl std::fmt::Display) -> Self {
        Self::Upstream(e.to_string())
    }
}

impl From<respite_gate::Error> for ApiError {
    fn from(e: respite_gate::Error) -> Self {
        match e {
            respite_gate::Error::Store(_) => ApiError::internal(e),
            // the gate may have committed state before the collaborator
            // failed; the caller retries or re-queries, the state stands
            respite_gate::Error::Gateway(_) | respite_gate::Error::Ledger(_) => {
                ApiError::upstream(e)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            ApiError::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg),
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

/// extension trait for converting results to apierror
pub trait ResultExt<T> {
    /// convert error to internal server error
    fn map_internal(self) -> Result<T, ApiError>;
}

impl<T, E: std::fmt::Display> ResultExt<T> for Result<T, E> {
    fn map_internal(self) -> Result<T, ApiError> {
        self.map_err(ApiError::internal)
    }
}
