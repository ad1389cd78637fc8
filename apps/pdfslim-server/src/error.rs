//! Error types for the pdfslim server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Server error types
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Compression failed: {0}")]
    CompressionFailed(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body; clients read the `error` field.
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ServerError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ServerError::CompressionFailed(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
            ServerError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = ErrorResponse { error: message };

        (status, Json(body)).into_response()
    }
}
