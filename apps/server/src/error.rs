//! API error type and its HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use catalog::services::IngestError;
use serde_json::json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error("image conversion failed: {0}")]
    Imaging(#[from] imaging::ImagingError),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            ApiError::Ingest(err) => match err {
                IngestError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
                IngestError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
                IngestError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR"),
                IngestError::Thumbnail(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "THUMBNAIL_ERROR")
                }
                IngestError::Persist(_) => (StatusCode::INTERNAL_SERVER_ERROR, "PERSIST_ERROR"),
            },
            ApiError::Imaging(_) => (StatusCode::INTERNAL_SERVER_ERROR, "IMAGING_ERROR"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        tracing::error!(error = %self, code, "request failed");

        let body = Json(json!({
            "code": code,
            "message": self.to_string(),
        }));
        (status, body).into_response()
    }
}
