use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use sentibox_core::PredictResponse;
use thiserror::Error;

/// Failures surfaced by the HTTP layer.
///
/// Every variant renders as a non-200 response carrying the fixed
/// `{"label": "Error", "probability": 0.0, "error": ...}` body.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid request body: {0}")]
    BadRequest(String),

    #[error("model not loaded")]
    NotLoaded,

    #[error("prediction failed: {0:#}")]
    Inference(#[from] anyhow::Error),

    #[error("prediction worker failed: {0}")]
    Blocking(#[from] actix_web::error::BlockingError),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotLoaded => StatusCode::SERVICE_UNAVAILABLE,
            Self::Inference(_) | Self::Blocking(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(PredictResponse::error(self.to_string()))
    }
}
