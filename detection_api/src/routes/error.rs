use crate::{codec::CodecError, model_service::DetectorError};
use axum::{
    extract::multipart::{MultipartError, MultipartRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

const MODEL_NOT_LOADED: &str = "Model is not loaded";
const INTERNAL_ERROR: &str = "Internal server error";

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),
    #[error("Invalid upload: {0}")]
    InvalidUpload(String),
    #[error("Multipart body error: {0}")]
    Multipart(#[from] MultipartError),
    #[error("Multipart request rejected: {0}")]
    MultipartRejection(#[from] MultipartRejection),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<CodecError> for ApiError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::EmptyUpload | CodecError::Decode(_) => {
                ApiError::InvalidUpload(err.to_string())
            }
            CodecError::Encode(_) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<DetectorError> for ApiError {
    fn from(err: DetectorError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::ModelUnavailable(error) => {
                let detail = if error.is_empty() {
                    MODEL_NOT_LOADED.to_string()
                } else {
                    error
                };
                (StatusCode::SERVICE_UNAVAILABLE, detail)
            }
            ApiError::InvalidUpload(detail) => (StatusCode::BAD_REQUEST, detail),
            ApiError::Multipart(err) => (err.status(), err.body_text()),
            ApiError::MultipartRejection(err) => (err.status(), err.body_text()),
            ApiError::Internal(cause) => {
                tracing::error!("Request failed: {}", cause);
                (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR.to_string())
            }
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let cases = [
            (
                ApiError::ModelUnavailable("boom".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                ApiError::InvalidUpload("bad".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::from(CodecError::EmptyUpload),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::from(DetectorError::Inference("oops".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }
}
