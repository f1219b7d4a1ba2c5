use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use voyra_booking::BookingError;
use voyra_schedule::TemplateError;

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Unavailable(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            ApiError::Internal(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<BookingError> for ApiError {
    fn from(err: BookingError) -> Self {
        match &err {
            BookingError::Validation(_) => ApiError::BadRequest(err.to_string()),
            BookingError::SeatUnavailable { .. } => ApiError::Conflict(err.to_string()),
            BookingError::InvalidTransition { .. } => ApiError::Conflict(err.to_string()),
            BookingError::ConcurrencyConflict(_) => ApiError::Conflict(err.to_string()),
            BookingError::NotFound(_) => ApiError::NotFound(err.to_string()),
            BookingError::StorageUnavailable(_) => ApiError::Unavailable(err.to_string()),
            BookingError::CodeGenerationFailed { .. } | BookingError::Internal(_) => {
                ApiError::Internal(err.to_string())
            }
        }
    }
}

impl From<TemplateError> for ApiError {
    fn from(err: TemplateError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}
