use crate::digit::PredictionResponse;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DigitError {
    #[error("Malformed upload: {0}")]
    MalformedUpload(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Image decode error: {0}")]
    Decode(#[from] image::ImageError),

    #[error("Invalid input shape: {0}")]
    InputShape(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("ORT error: {0}")]
    Ort(#[from] ort::Error),

    #[error("Model loading failed: {0}")]
    ModelLoad(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl DigitError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            DigitError::MalformedUpload(_) => StatusCode::BAD_REQUEST,
            DigitError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            DigitError::ModelLoad(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 客户端错误记为 warn，服务端错误记为 error
    pub fn log_level(&self) -> tracing::Level {
        if self.status_code().is_client_error() {
            tracing::Level::WARN
        } else {
            tracing::Level::ERROR
        }
    }
}

impl IntoResponse for DigitError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = PredictionResponse::error(self.to_string());

        if self.log_level() == tracing::Level::WARN {
            tracing::warn!("Request rejected: {} ({})", self, status);
        } else {
            tracing::error!("Request failed: {} ({})", self, status);
        }

        (status, axum::Json(body)).into_response()
    }
}
